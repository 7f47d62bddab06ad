use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use rand::Rng;
use url::Url;

use crate::config::HttpConfig;

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
];

pub fn build_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9,de;q=0.8"));

    let mut builder = Client::builder()
        .timeout(config.timeout)
        .default_headers(headers)
        .cookie_store(true);
    if !config.system_proxy {
        builder = builder.no_proxy();
    }
    builder.build()
}

/// A GET carrying either the configured user agent or a random one from the pool.
pub fn get(client: &Client, config: &HttpConfig, url: Url) -> RequestBuilder {
    let ua = match &config.user_agent {
        Some(ua) => ua.clone(),
        None => {
            let mut rng = rand::thread_rng();
            USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())].to_string()
        }
    };
    client.get(url).header(USER_AGENT, ua)
}

/// Parses `raw` as an absolute http(s) URL with a host. Anything else is malformed.
pub fn parse_http_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Some(url),
        _ => None,
    }
}
