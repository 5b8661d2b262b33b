pub mod client;

pub use client::HttpClient;

use std::time::Duration;

use reqwest::header::HeaderMap;

/// Default cap on how much of a response body is kept.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Status, headers and a body sample from a single GET.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub url: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
    pub location: Option<String>,
}

impl ProbeResponse {
    /// Returns a header value as a trimmed string, if present and valid.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// Per-call overrides for [`HttpClient::probe_with`].
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Fixed user agent. `None` picks one from the rotation pool.
    pub user_agent: Option<String>,
    /// Per-request timeout. `None` uses the client default.
    pub timeout: Option<Duration>,
    pub body_limit: usize,
    pub follow_redirects: bool,
    pub extra_headers: Vec<(String, String)>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout: None,
            body_limit: DEFAULT_BODY_LIMIT,
            follow_redirects: true,
            extra_headers: Vec::new(),
        }
    }
}

impl ProbeOptions {
    pub fn user_agent(mut self, ua: &str) -> Self {
        self.user_agent = Some(ua.to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn no_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.extra_headers.push((name.to_string(), value.to_string()));
        self
    }
}
