use std::collections::HashSet;
use reqwest::blocking::Client;
use scraper::{Html, Selector};
use log::{debug, info, warn};
use url::Url;

use crate::config::HttpConfig;
use crate::error::{FetchError, ProcessError};
use crate::http;

/// A link found on a page, before any scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    pub anchor_text: String,
    /// `href` exactly as written in the document.
    pub href: String,
    pub resolved_url: Url,
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects; relative links were resolved against it.
    pub final_url: Url,
    pub html: String,
    pub candidates: Vec<CandidateLink>,
}

/// Retrieves a page and lists its links.
pub trait PageSource {
    fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

pub struct ContentFetcher {
    client: Client,
    config: HttpConfig,
}

impl ContentFetcher {
    pub fn new(config: HttpConfig) -> Result<Self, ProcessError> {
        let client = http::build_client(&config)?;
        Ok(ContentFetcher { client, config })
    }
}

impl PageSource for ContentFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = http::parse_http_url(url).ok_or_else(|| FetchError::InvalidUrl(url.trim().to_string()))?;

        info!("Fetching: {}", parsed);
        let resp = http::get(&self.client, &self.config, parsed).send().map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Unreachable(e.to_string())
            }
        })?;

        let status = resp.status();
        if status.as_u16() != 200 {
            warn!("Fetching {} returned HTTP {}", url, status);
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = resp.url().clone();
        let html = resp.text().map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Body(e.to_string())
            }
        })?;

        let candidates = extract_candidates(&html, &final_url);
        debug!("{} chars, {} candidate links on {}", html.len(), candidates.len(), final_url);
        Ok(FetchedPage { final_url, html, candidates })
    }
}

/// Every `<a href>` that resolves to an http(s) URL, deduplicated by resolved
/// URL in document order. Parsing is lenient; broken markup yields whatever
/// anchors html5ever recovers.
pub fn extract_candidates(html: &str, base_url: &Url) -> Vec<CandidateLink> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let href = match element.value().attr("href") {
            Some(h) => h.trim(),
            None => continue,
        };
        if href.is_empty() || href.starts_with('#') {
            continue;
        }

        let mut resolved = match base_url.join(href) {
            Ok(u) => u,
            Err(_) => continue,
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        resolved.set_fragment(None);

        if !seen.insert(resolved.as_str().to_string()) {
            continue;
        }

        let mut anchor_text = element
            .text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ");
        if anchor_text.is_empty() {
            anchor_text = element
                .value()
                .attr("title")
                .or_else(|| element.value().attr("aria-label"))
                .unwrap_or_default()
                .trim()
                .to_string();
        }

        links.push(CandidateLink {
            anchor_text,
            href: href.to_string(),
            resolved_url: resolved,
        });
    }
    links
}
