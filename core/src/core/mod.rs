pub mod classifier;
pub mod context;
pub mod deadline;
pub mod engine;
pub mod live_filter;
pub mod mutator;
pub mod recon;
pub mod result_aggregator;
pub mod target_manager;
pub mod url_pool;

use std::collections::HashSet;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// A normalized base URL (scheme + host + path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub url: String,
}

impl Target {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Severity scale used by every finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "Info"),
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

/// One evidence-backed observation emitted by a scanning module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub target: String,
    pub endpoint: String,
    pub module: String,
    #[serde(rename = "type")]
    pub vuln_type: String,
    pub severity: Severity,
    pub confidence: f64,
    pub evidence: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Finding {
    /// Key used to drop exact duplicates when findings are aggregated.
    pub fn dedup_key(&self) -> String {
        format!("{}|{}|{}", self.endpoint, self.module, self.vuln_type)
    }
}

/// The atomic (URL, query parameter) unit a scanning module tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointParam {
    pub url: String,
    pub param: String,
}

impl EndpointParam {
    pub fn new(url: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            param: param.into(),
        }
    }

    pub fn key(&self) -> String {
        format!("{}|{}", self.url, self.param)
    }
}

/// String-keyed set shared by the workers of one pool.
///
/// Crawler visited-set, live-filter dedup and per-module work-item dedup all
/// go through this; one coarse lock per instance.
#[derive(Debug, Default)]
pub struct SeenSet {
    inner: Mutex<HashSet<String>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the key was not present before.
    pub fn insert(&self, key: impl Into<String>) -> bool {
        match self.inner.lock() {
            Ok(mut set) => set.insert(key.into()),
            Err(poisoned) => poisoned.into_inner().insert(key.into()),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        match self.inner.lock() {
            Ok(set) => set.contains(key),
            Err(poisoned) => poisoned.into_inner().contains(key),
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(set) => set.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Low > Severity::Info);
        assert_eq!(Severity::Medium.to_string(), "Medium");
    }

    #[test]
    fn test_finding_serializes_type_key() {
        let finding = Finding {
            target: "https://a.test/".to_string(),
            endpoint: "https://a.test/?id=1".to_string(),
            module: "SQLiError".to_string(),
            vuln_type: "Possible SQL Injection (Error-based)".to_string(),
            severity: Severity::High,
            confidence: 0.86,
            evidence: "x".to_string(),
            tags: vec!["sqli".to_string()],
        };
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["type"], "Possible SQL Injection (Error-based)");
        assert_eq!(json["severity"], "High");
        assert!(json.get("vuln_type").is_none());
    }

    #[test]
    fn test_seen_set_concurrent_inserts() {
        let seen = Arc::new(SeenSet::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seen = Arc::clone(&seen);
                std::thread::spawn(move || (0..100).filter(|i| seen.insert(i.to_string())).count())
            })
            .collect();
        let inserted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(inserted, 100);
        assert_eq!(seen.len(), 100);
        assert!(seen.contains("42"));
    }
}
