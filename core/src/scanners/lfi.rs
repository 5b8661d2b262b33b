use async_trait::async_trait;
use log::debug;

use crate::core::classifier::VulnClass;
use crate::core::context::ScanContext;
use crate::core::mutator::inject_param;
use crate::core::{EndpointParam, Finding, Severity};
use crate::http::HttpClient;
use crate::scanners::{payload_plan, run_pool, ScanModule, WorkSource};
use crate::utils::detector::is_passwd_leak;
use crate::utils::payload_loader::{Wordlist, LFI_TRAVERSALS};

const FALLBACK_PARAMS: &[&str] = &["file", "path", "page", "include", "template", "view"];

/// Path traversal towards `/etc/passwd`, deepest first.
pub struct LfiModule;

#[async_trait]
impl ScanModule for LfiModule {
    fn name(&self) -> &'static str {
        "LFIBasic"
    }

    async fn run(&self, ctx: &ScanContext, client: &HttpClient) -> Vec<Finding> {
        let source = WorkSource::select(ctx, VulnClass::Lfi, FALLBACK_PARAMS);
        let tag = if source.is_fallback() { "fallback" } else { "bucket:lfi" };
        let payloads = payload_plan(ctx, LFI_TRAVERSALS, Wordlist::LfiPayloads);
        debug!("{}: {} work item(s)", self.name(), source.len());

        run_pool(source.into_items(), ctx.concurrency(), EndpointParam::key, |ep| {
            let payloads = &payloads;
            async move {
                for payload in payloads {
                    let Some(test_url) = inject_param(&ep.url, &ep.param, payload) else {
                        continue;
                    };
                    let Ok(resp) = client.probe(&test_url).await else {
                        continue;
                    };
                    if is_passwd_leak(&resp.body) {
                        return vec![Finding {
                            target: ctx.target_for(&ep.url),
                            endpoint: test_url,
                            module: self.name().to_string(),
                            vuln_type: "Local File Inclusion (/etc/passwd)".to_string(),
                            severity: Severity::Critical,
                            confidence: 0.98,
                            evidence: format!(
                                "Found /etc/passwd pattern in response body via param '{}'",
                                ep.param
                            ),
                            tags: vec!["lfi".to_string(), "file-disclosure".to_string(), tag.to_string()],
                        }];
                    }
                }
                Vec::new()
            }
        })
        .await
    }
}
