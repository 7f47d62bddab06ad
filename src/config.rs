use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DELAY_MS: u64 = 1000;

/// Shared settings for every component that talks to the network.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Budget for a single request, connect through body.
    pub timeout: Duration,
    /// Pause between consecutive network-issuing steps.
    pub delay: Duration,
    /// Fixed user agent. When `None` one is picked per request from a small pool.
    pub user_agent: Option<String>,
    /// Honour `HTTP_PROXY`-style settings from the environment.
    pub system_proxy: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            user_agent: None,
            system_proxy: true,
        }
    }
}

impl HttpConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn without_system_proxy(mut self) -> Self {
        self.system_proxy = false;
        self
    }
}
