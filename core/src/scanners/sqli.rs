use async_trait::async_trait;
use log::debug;

use crate::core::classifier::VulnClass;
use crate::core::context::ScanContext;
use crate::core::mutator::inject_param;
use crate::core::{EndpointParam, Finding, Severity};
use crate::http::HttpClient;
use crate::scanners::{payload_plan, run_pool, ScanModule, WorkSource};
use crate::utils::detector::find_sql_error;
use crate::utils::payload_loader::{Wordlist, SQLI_ERROR_PAYLOADS};

const FALLBACK_PARAMS: &[&str] = &["id", "uid", "user", "item"];

/// Error-based SQL injection: quote-breaking payloads, DBMS error strings in the body.
pub struct SqliErrorModule;

#[async_trait]
impl ScanModule for SqliErrorModule {
    fn name(&self) -> &'static str {
        "SQLiError"
    }

    async fn run(&self, ctx: &ScanContext, client: &HttpClient) -> Vec<Finding> {
        let source = WorkSource::select(ctx, VulnClass::Sqli, FALLBACK_PARAMS);
        let payloads = payload_plan(ctx, SQLI_ERROR_PAYLOADS, Wordlist::SqliPayloads);
        debug!("{}: {} work item(s), fallback={}", self.name(), source.len(), source.is_fallback());

        run_pool(source.into_items(), ctx.concurrency(), EndpointParam::key, |ep| {
            let payloads = &payloads;
            async move { self.test_param(ctx, client, &ep, payloads).await.into_iter().collect() }
        })
        .await
    }
}

impl SqliErrorModule {
    async fn test_param(
        &self,
        ctx: &ScanContext,
        client: &HttpClient,
        ep: &EndpointParam,
        payloads: &[String],
    ) -> Option<Finding> {
        for payload in payloads {
            let Some(test_url) = inject_param(&ep.url, &ep.param, payload) else {
                continue;
            };
            let Ok(resp) = client.probe(&test_url).await else {
                continue;
            };
            let Some(pattern) = find_sql_error(&resp.body) else {
                continue;
            };

            let confidence = if payload.to_lowercase().contains("or 1=1") { 0.86 } else { 0.80 };
            return Some(Finding {
                target: ctx.target_for(&ep.url),
                endpoint: test_url,
                module: self.name().to_string(),
                vuln_type: "Possible SQL Injection (Error-based)".to_string(),
                severity: Severity::High,
                confidence,
                evidence: format!(
                    "DB error pattern '{}' via param '{}' (HTTP {})",
                    pattern, ep.param, resp.status
                ),
                tags: vec![
                    "sqli".to_string(),
                    "error-based".to_string(),
                    format!("param:{}", ep.param),
                ],
            });
        }
        None
    }
}
