use std::fmt;

use serde::Serialize;
use url::Url;

use crate::core::mutator::query_param_names;
use crate::core::EndpointParam;

/// Vulnerability classes that get their own parameter bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VulnClass {
    Sqli,
    Xss,
    Lfi,
    OpenRedirect,
    Ssrf,
}

impl VulnClass {
    pub const ALL: [VulnClass; 5] = [
        VulnClass::Sqli,
        VulnClass::Xss,
        VulnClass::Lfi,
        VulnClass::OpenRedirect,
        VulnClass::Ssrf,
    ];

    /// Substrings matched against the lower-cased parameter name.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            VulnClass::Sqli => &["id", "uid", "user", "pid", "prod", "item", "cat", "order"],
            VulnClass::Xss => &["q", "query", "search", "message", "comment", "s"],
            VulnClass::Lfi => &["file", "path", "page", "include", "template", "view"],
            VulnClass::OpenRedirect => &["redirect", "url", "next", "return", "goto", "dest"],
            VulnClass::Ssrf => &["url", "dest", "endpoint", "webhook", "callback"],
        }
    }

    pub fn matches(&self, param: &str) -> bool {
        let lower = param.to_lowercase();
        self.keywords().iter().any(|k| lower.contains(k))
    }
}

impl fmt::Display for VulnClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VulnClass::Sqli => "sqli",
            VulnClass::Xss => "xss",
            VulnClass::Lfi => "lfi",
            VulnClass::OpenRedirect => "open_redirect",
            VulnClass::Ssrf => "ssrf",
        };
        write!(f, "{}", label)
    }
}

/// Endpoint-parameter pairs grouped per vulnerability class. A pair may sit in several buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassifiedBuckets {
    pub sqli: Vec<EndpointParam>,
    pub xss: Vec<EndpointParam>,
    pub lfi: Vec<EndpointParam>,
    pub open_redirect: Vec<EndpointParam>,
    pub ssrf: Vec<EndpointParam>,
}

impl ClassifiedBuckets {
    pub fn get(&self, class: VulnClass) -> &[EndpointParam] {
        match class {
            VulnClass::Sqli => &self.sqli,
            VulnClass::Xss => &self.xss,
            VulnClass::Lfi => &self.lfi,
            VulnClass::OpenRedirect => &self.open_redirect,
            VulnClass::Ssrf => &self.ssrf,
        }
    }

    fn get_mut(&mut self, class: VulnClass) -> &mut Vec<EndpointParam> {
        match class {
            VulnClass::Sqli => &mut self.sqli,
            VulnClass::Xss => &mut self.xss,
            VulnClass::Lfi => &mut self.lfi,
            VulnClass::OpenRedirect => &mut self.open_redirect,
            VulnClass::Ssrf => &mut self.ssrf,
        }
    }

    pub fn total(&self) -> usize {
        VulnClass::ALL.iter().map(|c| self.get(*c).len()).sum()
    }
}

/// Partitions the query parameters of live URLs into class buckets.
///
/// Pure and deterministic: bucket order follows input order, and a
/// repeated parameter on the same URL is only recorded once.
pub fn classify(live_urls: &[String]) -> ClassifiedBuckets {
    let mut buckets = ClassifiedBuckets::default();

    for raw in live_urls {
        let Ok(url) = Url::parse(raw) else {
            continue;
        };
        for param in query_param_names(&url) {
            for class in VulnClass::ALL {
                if class.matches(&param) {
                    let pair = EndpointParam::new(raw.clone(), param.clone());
                    let bucket = buckets.get_mut(class);
                    if !bucket.contains(&pair) {
                        bucket.push(pair);
                    }
                }
            }
        }
    }

    buckets
}
