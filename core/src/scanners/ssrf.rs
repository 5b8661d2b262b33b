use async_trait::async_trait;
use log::debug;

use crate::core::classifier::VulnClass;
use crate::core::context::ScanContext;
use crate::core::mutator::inject_param;
use crate::core::{EndpointParam, Finding, Severity};
use crate::http::{HttpClient, ProbeOptions};
use crate::scanners::{payload_plan, run_pool, ScanModule, WorkSource};
use crate::utils::detector::ssrf_signal;
use crate::utils::payload_loader::{Wordlist, SSRF_TARGETS};

const FALLBACK_PARAMS: &[&str] = &["url", "dest", "callback"];
const SSRF_USER_AGENT: &str = "reconhunt-ssrf/1.0";
const SNIPPET_BYTES: usize = 512;

/// Weak SSRF heuristic: a healthy baseline that turns into a network-error 5xx.
pub struct SsrfModule;

#[async_trait]
impl ScanModule for SsrfModule {
    fn name(&self) -> &'static str {
        "SSRFHeuristics"
    }

    async fn run(&self, ctx: &ScanContext, client: &HttpClient) -> Vec<Finding> {
        let source = WorkSource::select(ctx, VulnClass::Ssrf, FALLBACK_PARAMS);
        let tag = if source.is_fallback() { "fallback" } else { "bucket:ssrf" };
        let payloads = payload_plan(ctx, SSRF_TARGETS, Wordlist::SsrfTargets);
        let opts = ProbeOptions::default()
            .user_agent(SSRF_USER_AGENT)
            .body_limit(SNIPPET_BYTES);
        debug!("{}: {} work item(s)", self.name(), source.len());

        run_pool(source.into_items(), ctx.concurrency(), EndpointParam::key, |ep| {
            let (payloads, opts) = (&payloads, &opts);
            async move {
                let baseline = match client.probe_with(&ep.url, opts).await {
                    Ok(resp) => resp.status,
                    Err(e) => {
                        debug!("SSRF baseline failed for {}: {}", ep.url, e);
                        return Vec::new();
                    }
                };

                for payload in payloads {
                    let Some(test_url) = inject_param(&ep.url, &ep.param, payload) else {
                        continue;
                    };
                    let Ok(resp) = client.probe_with(&test_url, opts).await else {
                        continue;
                    };
                    let Some(phrase) = ssrf_signal(baseline, resp.status, &resp.body) else {
                        continue;
                    };

                    return vec![Finding {
                        target: ctx.target_for(&ep.url),
                        endpoint: test_url,
                        module: self.name().to_string(),
                        vuln_type: "Possible SSRF parameter (heuristic)".to_string(),
                        severity: Severity::Medium,
                        confidence: 0.6,
                        evidence: format!(
                            "Param '{}' shows SSRF-like behavior with payload '{}' (HTTP {} -> {}, '{}')",
                            ep.param, payload, baseline, resp.status, phrase
                        ),
                        tags: vec!["ssrf".to_string(), "heuristic".to_string(), tag.to_string()],
                    }];
                }
                Vec::new()
            }
        })
        .await
    }
}
