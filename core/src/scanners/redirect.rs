use async_trait::async_trait;
use log::debug;
use url::Url;

use crate::core::classifier::VulnClass;
use crate::core::context::ScanContext;
use crate::core::mutator::inject_param;
use crate::core::{EndpointParam, Finding, Severity};
use crate::http::{HttpClient, ProbeOptions};
use crate::scanners::{payload_plan, run_pool, ScanModule, WorkSource};
use crate::utils::detector::is_open_redirect;
use crate::utils::payload_loader::{Wordlist, REDIRECT_TARGETS};

const FALLBACK_PARAMS: &[&str] = &["redirect", "url", "next"];
const REDIRECT_USER_AGENT: &str = "reconhunt-openredirect/1.0";

/// Points redirect-looking parameters at an external domain and inspects one hop.
pub struct OpenRedirectModule;

#[async_trait]
impl ScanModule for OpenRedirectModule {
    fn name(&self) -> &'static str {
        "OpenRedirect"
    }

    async fn run(&self, ctx: &ScanContext, client: &HttpClient) -> Vec<Finding> {
        let source = WorkSource::select(ctx, VulnClass::OpenRedirect, FALLBACK_PARAMS);
        let tag = if source.is_fallback() { "fallback" } else { "bucket:open_redirect" };
        let targets = payload_plan(ctx, REDIRECT_TARGETS, Wordlist::RedirectTargets);
        let opts = ProbeOptions::default()
            .user_agent(REDIRECT_USER_AGENT)
            .body_limit(4096)
            .no_redirects();
        debug!("{}: {} work item(s)", self.name(), source.len());

        run_pool(source.into_items(), ctx.concurrency(), EndpointParam::key, |ep| {
            let (targets, opts) = (&targets, &opts);
            async move {
                for external in targets {
                    let Some(test_url) = inject_param(&ep.url, &ep.param, external) else {
                        continue;
                    };
                    let Ok(resp) = client.probe_with(&test_url, opts).await else {
                        continue;
                    };
                    if !is_open_redirect(resp.status, resp.location.as_deref(), &test_url, external) {
                        continue;
                    }

                    let destination = resp
                        .location
                        .as_deref()
                        .map(|loc| resolve_location(&test_url, loc))
                        .unwrap_or_default();
                    return vec![Finding {
                        target: ctx.target_for(&ep.url),
                        endpoint: test_url,
                        module: self.name().to_string(),
                        vuln_type: "Possible Open Redirect".to_string(),
                        severity: Severity::Medium,
                        confidence: 0.82,
                        evidence: format!(
                            "Parameter '{}' appears to redirect to external domain: {}",
                            ep.param, destination
                        ),
                        tags: vec!["open-redirect".to_string(), "redirect".to_string(), tag.to_string()],
                    }];
                }
                Vec::new()
            }
        })
        .await
    }
}

fn resolve_location(base: &str, location: &str) -> String {
    Url::parse(base)
        .and_then(|b| b.join(location.trim()))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| location.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanners::test_support::context_for;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    #[test]
    fn test_resolve_location() {
        assert_eq!(resolve_location("https://a.test/x?y=1", "//example.org/p"), "https://example.org/p");
        assert_eq!(resolve_location("https://a.test/x", "/home"), "https://a.test/home");
    }

    #[tokio::test]
    async fn test_unvalidated_redirect_detected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(|req: &Request| {
                let next = req
                    .url
                    .query_pairs()
                    .find(|(k, _)| k == "next")
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_else(|| "/".to_string());
                ResponseTemplate::new(302).insert_header("Location", next.as_str())
            })
            .mount(&server)
            .await;

        let ctx = context_for(
            &format!("{}/", server.uri()),
            vec![format!("{}/login?next=/account", server.uri())],
        );
        let client = HttpClient::new(5, None, &[]).unwrap();

        let findings = OpenRedirectModule.run(&ctx, &client).await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].vuln_type, "Possible Open Redirect");
        assert!(findings[0].evidence.contains("example.org"));
    }

    #[tokio::test]
    async fn test_local_redirect_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/dashboard"))
            .mount(&server)
            .await;

        let ctx = context_for(
            &format!("{}/", server.uri()),
            vec![format!("{}/login?next=/account", server.uri())],
        );
        let client = HttpClient::new(5, None, &[]).unwrap();
        assert!(OpenRedirectModule.run(&ctx, &client).await.is_empty());
    }
}
