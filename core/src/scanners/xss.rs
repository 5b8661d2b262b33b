use async_trait::async_trait;
use log::debug;
use rand::distr::Alphanumeric;
use rand::Rng;

use crate::core::classifier::VulnClass;
use crate::core::context::ScanContext;
use crate::core::mutator::inject_param;
use crate::core::{EndpointParam, Finding, Severity};
use crate::http::HttpClient;
use crate::scanners::{payload_plan, run_pool, ScanModule, WorkSource};
use crate::utils::detector::is_reflected;
use crate::utils::payload_loader::Wordlist;

const FALLBACK_PARAMS: &[&str] = &["q"];

/// Reflected XSS via a unique marker carrying angle brackets and quotes.
pub struct XssReflectModule {
    marker: String,
}

impl XssReflectModule {
    pub fn new() -> Self {
        let token: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        Self::with_marker(format!("reconhunt_{}_<>\"'</script>", token.to_lowercase()))
    }

    pub fn with_marker(marker: impl Into<String>) -> Self {
        Self { marker: marker.into() }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl Default for XssReflectModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScanModule for XssReflectModule {
    fn name(&self) -> &'static str {
        "XSSReflect"
    }

    async fn run(&self, ctx: &ScanContext, client: &HttpClient) -> Vec<Finding> {
        let source = WorkSource::select(ctx, VulnClass::Xss, FALLBACK_PARAMS);
        let fallback = source.is_fallback();
        let payloads = payload_plan(ctx, &[self.marker.as_str()], Wordlist::XssPayloads);
        debug!("{}: {} work item(s), fallback={}", self.name(), source.len(), fallback);

        run_pool(source.into_items(), ctx.concurrency(), EndpointParam::key, |ep| {
            let payloads = &payloads;
            async move {
                self.test_param(ctx, client, &ep, payloads, fallback)
                    .await
                    .into_iter()
                    .collect()
            }
        })
        .await
    }
}

impl XssReflectModule {
    async fn test_param(
        &self,
        ctx: &ScanContext,
        client: &HttpClient,
        ep: &EndpointParam,
        payloads: &[String],
        fallback: bool,
    ) -> Option<Finding> {
        for payload in payloads {
            let Some(test_url) = inject_param(&ep.url, &ep.param, payload) else {
                continue;
            };
            let Ok(resp) = client.probe(&test_url).await else {
                continue;
            };
            if !is_reflected(&resp.body, payload) {
                continue;
            }

            let (confidence, origin, tag) = if fallback {
                (0.72, "fallback", "fallback")
            } else {
                (0.85, "bucketed", "bucket:xss")
            };
            return Some(Finding {
                target: ctx.target_for(&ep.url),
                endpoint: test_url,
                module: self.name().to_string(),
                vuln_type: "Possible Reflected XSS".to_string(),
                severity: Severity::Medium,
                confidence,
                evidence: format!("Payload reflected via param '{}' ({})", ep.param, origin),
                tags: vec!["xss".to_string(), "reflected".to_string(), tag.to_string()],
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanners::test_support::context_for;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn echo_param(req: &Request, name: &str) -> String {
        req.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default()
    }

    #[test]
    fn test_random_marker_shape() {
        let a = XssReflectModule::new();
        let b = XssReflectModule::new();
        assert!(a.marker().starts_with("reconhunt_"));
        assert!(a.marker().ends_with("_<>\"'</script>"));
        assert_ne!(a.marker(), b.marker());
    }

    #[tokio::test]
    async fn test_entity_encoded_reflection_detected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(|req: &Request| {
                let encoded = echo_param(req, "q").replace('<', "&lt;");
                ResponseTemplate::new(200).set_body_string(format!("<p>Results for {}</p>", encoded))
            })
            .mount(&server)
            .await;

        let ctx = context_for(
            &format!("{}/", server.uri()),
            vec![format!("{}/search?q=shoes", server.uri())],
        );
        let client = HttpClient::new(5, None, &[]).unwrap();
        let module = XssReflectModule::new();

        let findings = module.run(&ctx, &client).await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].vuln_type, "Possible Reflected XSS");
        assert_eq!(findings[0].severity, Severity::Medium);
        assert!((findings[0].confidence - 0.85).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_fallback_param_on_plain_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(|req: &Request| {
                ResponseTemplate::new(200).set_body_string(echo_param(req, "q"))
            })
            .mount(&server)
            .await;

        let ctx = context_for(&format!("{}/", server.uri()), vec![format!("{}/", server.uri())]);
        let client = HttpClient::new(5, None, &[]).unwrap();
        let findings = XssReflectModule::with_marker("rh_fixed_<>\"'").run(&ctx, &client).await;

        assert_eq!(findings.len(), 1);
        assert!((findings[0].confidence - 0.72).abs() < f64::EPSILON);
        assert!(findings[0].tags.contains(&"fallback".to_string()));
    }

    #[tokio::test]
    async fn test_stripped_marker_not_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(|req: &Request| {
                let stripped: String = echo_param(req, "q")
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect();
                ResponseTemplate::new(200).set_body_string(stripped)
            })
            .mount(&server)
            .await;

        let ctx = context_for(
            &format!("{}/", server.uri()),
            vec![format!("{}/search?q=1", server.uri())],
        );
        let client = HttpClient::new(5, None, &[]).unwrap();
        assert!(XssReflectModule::new().run(&ctx, &client).await.is_empty());
    }
}
