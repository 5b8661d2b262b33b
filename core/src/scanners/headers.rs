use async_trait::async_trait;

use crate::core::context::ScanContext;
use crate::core::{Finding, Severity, Target};
use crate::http::{HttpClient, ProbeOptions, ProbeResponse};
use crate::scanners::{run_pool, ScanModule};

const REQUIRED_HEADERS: &[&str] = &[
    "Content-Security-Policy",
    "X-Frame-Options",
    "X-Content-Type-Options",
    "Strict-Transport-Security",
    "Referrer-Policy",
];

const EVIL_ORIGIN: &str = "https://evil.example.com";

/// One finding per missing hardening header on each target's root.
pub struct SecurityHeadersModule;

#[async_trait]
impl ScanModule for SecurityHeadersModule {
    fn name(&self) -> &'static str {
        "SecurityHeaders"
    }

    async fn run(&self, ctx: &ScanContext, client: &HttpClient) -> Vec<Finding> {
        let opts = ProbeOptions::default().body_limit(0);
        run_pool(ctx.targets.clone(), ctx.concurrency(), |t: &Target| t.url.clone(), |target| {
            let opts = &opts;
            async move {
                match client.probe_with(&target.url, opts).await {
                    Ok(resp) => self.missing_headers(&target, &resp),
                    Err(_) => Vec::new(),
                }
            }
        })
        .await
    }
}

impl SecurityHeadersModule {
    fn missing_headers(&self, target: &Target, resp: &ProbeResponse) -> Vec<Finding> {
        REQUIRED_HEADERS
            .iter()
            .filter(|h| resp.header(h).is_none())
            .map(|h| Finding {
                target: target.url.clone(),
                endpoint: target.url.clone(),
                module: self.name().to_string(),
                vuln_type: format!("Missing Security Header: {}", h),
                severity: if *h == "Content-Security-Policy" { Severity::Medium } else { Severity::Low },
                confidence: 0.95,
                evidence: "Header not present".to_string(),
                tags: vec!["hardening".to_string()],
            })
            .collect()
    }
}

/// Cross-origin policy check with a foreign `Origin` header.
pub struct CorsModule;

#[async_trait]
impl ScanModule for CorsModule {
    fn name(&self) -> &'static str {
        "CORS"
    }

    async fn run(&self, ctx: &ScanContext, client: &HttpClient) -> Vec<Finding> {
        let opts = ProbeOptions::default().body_limit(0).header("Origin", EVIL_ORIGIN);
        run_pool(ctx.targets.clone(), ctx.concurrency(), |t: &Target| t.url.clone(), |target| {
            let opts = &opts;
            async move {
                let Ok(resp) = client.probe_with(&target.url, opts).await else {
                    return Vec::new();
                };
                self.evaluate(&target, &resp).into_iter().collect()
            }
        })
        .await
    }
}

impl CorsModule {
    fn evaluate(&self, target: &Target, resp: &ProbeResponse) -> Option<Finding> {
        let acao = resp.header("access-control-allow-origin")?;
        let credentials = resp
            .header("access-control-allow-credentials")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let (vuln_type, severity, confidence, evidence) = if acao == "*" && credentials {
            (
                "CORS Misconfiguration (* with credentials)",
                Severity::High,
                0.95,
                "ACAOrigin:* with ACAC:true".to_string(),
            )
        } else if acao == "*" {
            (
                "CORS: Wildcard Allow-Origin",
                Severity::Medium,
                0.8,
                "Access-Control-Allow-Origin:*".to_string(),
            )
        } else if acao.eq_ignore_ascii_case(EVIL_ORIGIN) {
            (
                "CORS: Arbitrary Origin Reflected",
                Severity::High,
                0.9,
                format!("Origin {} reflected (credentials: {})", EVIL_ORIGIN, credentials),
            )
        } else {
            return None;
        };

        Some(Finding {
            target: target.url.clone(),
            endpoint: target.url.clone(),
            module: self.name().to_string(),
            vuln_type: vuln_type.to_string(),
            severity,
            confidence,
            evidence,
            tags: vec!["cors".to_string(), "misconfig".to_string()],
        })
    }
}
