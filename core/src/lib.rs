pub mod core;
pub mod error;
pub mod http;
pub mod modules;
pub mod scanners;
pub mod utils;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use crate::core::context::ScanContext;
pub use crate::core::deadline::Deadline;
pub use crate::core::engine::ScanEngine;
pub use crate::core::result_aggregator::ResultAggregator;
pub use crate::core::target_manager::{load_targets, TargetManager};
pub use crate::core::{Finding, Severity, Target};
pub use crate::error::PipelineError;
pub use crate::http::HttpClient;
pub use crate::utils::{init_logger, read_lines};

/// Scan configuration shared by the CLI and embedders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanConfig {
    pub target: String,
    pub list_file: String,
    /// Worker pool size per phase; non-positive values fall back to the default.
    pub concurrency: i64,
    /// Per-request timeout in seconds.
    pub timeout: u64,
    /// Global budget in seconds, checked between units of work.
    pub max_runtime: u64,
    pub aggressive: bool,
    pub external: bool,
    pub wordlist_dir: String,
    pub output: String,
    pub proxy: String,
    /// One `Name: value` entry per header; values may contain `;`.
    pub headers: Vec<String>,
    pub verbose: bool,
    pub dry_run: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            list_file: String::new(),
            concurrency: crate::core::context::DEFAULT_CONCURRENCY as i64,
            timeout: 8,
            max_runtime: 1800,
            aggressive: false,
            external: false,
            wordlist_dir: "wordlists".to_string(),
            output: "reconhunt_result.json".to_string(),
            proxy: String::new(),
            headers: Vec::new(),
            verbose: false,
            dry_run: false,
        }
    }
}

impl ScanConfig {
    pub fn header_list(&self) -> Vec<String> {
        self.headers
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn parsed_headers(&self) -> Vec<(String, String)> {
        parse_custom_headers(&self.header_list())
    }

    pub fn proxy_ref(&self) -> Option<&str> {
        if self.proxy.is_empty() { None } else { Some(&self.proxy) }
    }

    pub fn single_target(&self) -> Option<&str> {
        if self.target.is_empty() { None } else { Some(&self.target) }
    }

    pub fn list_file_ref(&self) -> Option<&str> {
        if self.list_file.is_empty() { None } else { Some(&self.list_file) }
    }
}

pub fn parse_custom_headers(raw: &[String]) -> Vec<(String, String)> {
    raw.iter().filter_map(|h| {
        let mut parts = h.splitn(2, ':');
        let key = parts.next()?.trim().to_string();
        let val = parts.next().unwrap_or("").trim().to_string();
        if key.is_empty() { return None; }
        Some((key, val))
    }).collect()
}

/// Output abstraction for the scan pipeline.
pub trait ScanEventSink: Send + Sync {
    fn on_log(&self, level: &str, message: &str);
    fn on_finding(&self, finding: &Finding);
    fn on_progress(&self, phase: &str, current: usize, total: usize);
}

pub type SinkRef = Arc<dyn ScanEventSink>;

/// Terminal output sink for CLI usage.
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new_ref() -> SinkRef {
        Arc::new(Self)
    }
}

impl ScanEventSink for ConsoleSink {
    fn on_log(&self, level: &str, message: &str) {
        use colored::*;
        use std::io::Write;
        let colored = match level {
            "success" => message.green().to_string(),
            "error"   => message.red().to_string(),
            "warn"    => message.yellow().to_string(),
            "phase"   => message.bright_cyan().bold().to_string(),
            _         => message.to_string(),
        };
        print!("{}\r\n", colored);
        std::io::stdout().flush().ok();
    }

    fn on_finding(&self, finding: &Finding) {
        use colored::*;
        use std::io::Write;
        let out = |text: &str| {
            print!("{}\r\n", text);
            std::io::stdout().flush().ok();
        };
        let label = match finding.severity {
            Severity::Critical | Severity::High => finding.severity.to_string().red().bold(),
            Severity::Medium => finding.severity.to_string().yellow().bold(),
            _ => finding.severity.to_string().blue(),
        };
        out(&format!(
            "\n{} [{}] {}",
            "[+]".green().bold(),
            label,
            finding.vuln_type.bold()
        ));
        out(&format!("    Endpoint: {}", finding.endpoint.white()));
        out(&format!(
            "    Module:   {} | Confidence [{:.2}]",
            finding.module.cyan(),
            finding.confidence
        ));
        out(&format!("    Evidence: {}", finding.evidence.dimmed()));
        out(&"──────────────────────────────────────────".dimmed().to_string());
    }

    fn on_progress(&self, phase: &str, current: usize, total: usize) {
        use colored::*;
        use std::io::Write;
        if total > 0 {
            print!("{}\r\n", format!("[*] {} ({}/{})", phase, current, total).bright_cyan());
        } else {
            print!("{}\r\n", format!("[*] {}", phase).bright_cyan());
        }
        std::io::stdout().flush().ok();
    }
}

/// Discards every event.
pub struct NullSink;

impl NullSink {
    pub fn new_ref() -> SinkRef {
        Arc::new(Self)
    }
}

impl ScanEventSink for NullSink {
    fn on_log(&self, _level: &str, _message: &str) {}
    fn on_finding(&self, _finding: &Finding) {}
    fn on_progress(&self, _phase: &str, _current: usize, _total: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.timeout, 8);
        assert_eq!(config.max_runtime, 1800);
        assert_eq!(config.output, "reconhunt_result.json");
        assert!(config.proxy_ref().is_none());
        assert!(config.single_target().is_none());
    }

    #[test]
    fn test_header_parsing() {
        let config = ScanConfig {
            headers: vec![
                "Cookie: a=1; b=2".to_string(),
                " X-Test:1 ".to_string(),
                String::new(),
                "Broken".to_string(),
            ],
            ..ScanConfig::default()
        };
        assert_eq!(
            config.parsed_headers(),
            vec![
                ("Cookie".to_string(), "a=1; b=2".to_string()),
                ("X-Test".to_string(), "1".to_string()),
                ("Broken".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_config_deserializes_partial_camel_case() {
        let config: ScanConfig = serde_json::from_str(r#"{"maxRuntime": 60, "wordlistDir": "lists"}"#).unwrap();
        assert_eq!(config.max_runtime, 60);
        assert_eq!(config.wordlist_dir, "lists");
        assert_eq!(config.concurrency, 10);
    }
}
