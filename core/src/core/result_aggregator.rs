use std::collections::HashSet;
use std::fs;

use anyhow::Context;
use log::info;
use tokio::sync::mpsc;

use crate::core::{Finding, Severity};
use crate::SinkRef;

/// Collects, deduplicates, and reports findings.
pub struct ResultAggregator;

impl ResultAggregator {
    /// Drains the channel until every sender is dropped.
    ///
    /// Exact duplicates on (endpoint, module, type) are dropped; everything
    /// else is forwarded to the sink and kept.
    pub async fn run(mut receiver: mpsc::Receiver<Finding>, sink: SinkRef) -> Vec<Finding> {
        let mut results = Vec::new();
        let mut seen = HashSet::new();

        while let Some(finding) = receiver.recv().await {
            if !seen.insert(finding.dedup_key()) {
                continue;
            }
            sink.on_finding(&finding);
            results.push(finding);
        }
        results
    }

    pub fn report_summary(results: &[Finding], sink: &SinkRef) {
        if results.is_empty() {
            sink.on_log("success", "[+] No findings.");
            return;
        }

        sink.on_log("warn", &format!("[+] {} finding(s) discovered:", results.len()));
        let mut sorted: Vec<&Finding> = results.iter().collect();
        sorted.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.endpoint.cmp(&b.endpoint)));
        for (i, f) in sorted.iter().enumerate() {
            let level = if f.severity >= Severity::High { "error" } else { "info" };
            sink.on_log(
                level,
                &format!("  #{} [{}] {} → {} ({})", i + 1, f.severity, f.vuln_type, f.endpoint, f.module),
            );
        }
    }

    /// Writes the findings as a pretty JSON array, replacing any previous report.
    pub fn write_report(path: &str, results: &[Finding]) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(results).context("failed to serialize findings")?;
        fs::write(path, json).with_context(|| format!("failed to write report '{}'", path))?;
        info!("Report written to {} ({} finding(s))", path, results.len());
        Ok(())
    }
}
