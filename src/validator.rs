use std::fmt;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use log::{debug, warn};

use crate::config::HttpConfig;
use crate::error::ProcessError;
use crate::http;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStatus {
    Valid,
    Broken,
    Unreachable,
    Timeout,
    SkippedEmpty,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkStatus::Valid => "valid",
            LinkStatus::Broken => "broken",
            LinkStatus::Unreachable => "unreachable",
            LinkStatus::Timeout => "timeout",
            LinkStatus::SkippedEmpty => "skipped-empty",
        };
        f.write_str(s)
    }
}

/// Outcome of one validation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCheckResult {
    pub url: String,
    pub status: LinkStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl LinkCheckResult {
    pub fn new(url: &str, status: LinkStatus) -> Self {
        LinkCheckResult {
            url: url.to_string(),
            status,
            http_code: None,
            detail: None,
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.http_code = Some(code);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_valid(&self) -> bool {
        self.status == LinkStatus::Valid
    }

    /// Short human-readable verdict, e.g. "Not found (HTTP 404)".
    pub fn describe(&self) -> String {
        match (self.status, self.http_code) {
            (LinkStatus::Valid, Some(code)) => format!("Valid (HTTP {})", code),
            (LinkStatus::Valid, None) => "Valid".to_string(),
            (LinkStatus::Broken, Some(404)) => "Not found (HTTP 404)".to_string(),
            (LinkStatus::Broken, Some(410)) => "Gone (HTTP 410)".to_string(),
            (LinkStatus::Broken, Some(code)) if code >= 500 => format!("Server error (HTTP {})", code),
            (LinkStatus::Broken, Some(code)) => format!("Error (HTTP {})", code),
            (LinkStatus::Broken, None) => "Malformed URL".to_string(),
            (LinkStatus::Unreachable, _) => "No connection".to_string(),
            (LinkStatus::Timeout, _) => "Timeout".to_string(),
            (LinkStatus::SkippedEmpty, _) => "No URL".to_string(),
        }
    }
}

/// Whether checking `url` goes out to the network (empty and malformed input does not).
pub fn issues_request(url: &str) -> bool {
    http::parse_http_url(url).is_some()
}

/// Anything that can classify a URL with a single attempt.
pub trait LinkProbe {
    fn check(&self, url: &str) -> LinkCheckResult;
}

pub struct UrlValidator {
    client: Client,
    config: HttpConfig,
}

impl UrlValidator {
    pub fn new(config: HttpConfig) -> Result<Self, ProcessError> {
        let client = http::build_client(&config)?;
        Ok(UrlValidator { client, config })
    }
}

impl LinkProbe for UrlValidator {
    fn check(&self, url: &str) -> LinkCheckResult {
        let raw = url.trim();
        if raw.is_empty() {
            return LinkCheckResult::new(raw, LinkStatus::SkippedEmpty);
        }
        let parsed = match http::parse_http_url(raw) {
            Some(u) => u,
            None => {
                debug!("Malformed URL, not requesting: {}", raw);
                return LinkCheckResult::new(raw, LinkStatus::Broken).with_detail("malformed URL");
            }
        };

        match http::get(&self.client, &self.config, parsed).send() {
            Ok(resp) => {
                let code = resp.status().as_u16();
                let status = if code == 200 { LinkStatus::Valid } else { LinkStatus::Broken };
                debug!("{} -> HTTP {}", raw, code);
                LinkCheckResult::new(raw, status).with_code(code)
            }
            Err(e) => {
                let result = classify_error(raw, &e);
                warn!("Request to {} failed ({}): {}", raw, result.status, e);
                result
            }
        }
    }
}

fn classify_error(url: &str, e: &reqwest::Error) -> LinkCheckResult {
    if e.is_timeout() {
        return LinkCheckResult::new(url, LinkStatus::Timeout);
    }
    if e.is_builder() {
        return LinkCheckResult::new(url, LinkStatus::Broken).with_detail(e.to_string());
    }
    // connect, DNS, TLS, redirect loops and dropped connections
    LinkCheckResult::new(url, LinkStatus::Unreachable).with_detail(e.to_string())
}
