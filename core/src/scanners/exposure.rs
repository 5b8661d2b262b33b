use std::collections::HashMap;

use async_trait::async_trait;
use log::debug;

use crate::core::context::ScanContext;
use crate::core::{Finding, Severity, Target};
use crate::http::{HttpClient, ProbeOptions};
use crate::scanners::{run_pool, ScanModule};
use crate::utils::detector::is_directory_listing;
use crate::utils::payload_loader::{unique_append, Wordlist, LISTING_PATHS, SENSITIVE_PATHS};

const SAMPLE_BYTES: usize = 64 * 1024;

/// A concrete URL under one target.
#[derive(Debug, Clone)]
struct PathProbe {
    target: String,
    url: String,
}

fn expand_paths(targets: &[Target], paths: &[String]) -> Vec<PathProbe> {
    targets
        .iter()
        .flat_map(|t| {
            let base = t.url.trim_end_matches('/').to_string();
            paths.iter().map(move |p| {
                let path = if p.starts_with('/') { p.clone() } else { format!("/{}", p) };
                PathProbe {
                    target: t.url.clone(),
                    url: format!("{}{}", base, path),
                }
            })
        })
        .collect()
}

/// Well-known secrets and backups served with HTTP 200.
///
/// A body identical to the target's root page is treated as a catch-all route.
pub struct SensitiveFilesModule;

#[async_trait]
impl ScanModule for SensitiveFilesModule {
    fn name(&self) -> &'static str {
        "SensitiveFiles"
    }

    async fn run(&self, ctx: &ScanContext, client: &HttpClient) -> Vec<Finding> {
        let mut paths: Vec<String> = SENSITIVE_PATHS.iter().map(|p| p.to_string()).collect();
        if ctx.is_aggressive() {
            paths = unique_append(paths, ctx.wordlists.load(Wordlist::DirsCommon));
        }
        let opts = ProbeOptions::default().body_limit(SAMPLE_BYTES).no_redirects();

        let mut roots: HashMap<String, String> = HashMap::new();
        for target in &ctx.targets {
            let body = client.probe_with(&target.url, &opts).await.map(|r| r.body).unwrap_or_default();
            roots.insert(target.url.clone(), body);
        }

        let probes = expand_paths(&ctx.targets, &paths);
        debug!("{}: {} path probe(s)", self.name(), probes.len());

        run_pool(probes, ctx.concurrency(), |p: &PathProbe| p.url.clone(), |probe| {
            let (opts, roots) = (&opts, &roots);
            async move {
                let Ok(resp) = client.probe_with(&probe.url, opts).await else {
                    return Vec::new();
                };
                if resp.status != 200 || resp.body.trim().is_empty() {
                    return Vec::new();
                }
                if roots.get(&probe.target).is_some_and(|root| *root == resp.body) {
                    return Vec::new();
                }
                vec![Finding {
                    target: probe.target,
                    endpoint: probe.url.clone(),
                    module: self.name().to_string(),
                    vuln_type: "Sensitive File or Path Exposure".to_string(),
                    severity: Severity::High,
                    confidence: 0.9,
                    evidence: format!("HTTP {} on {}", resp.status, probe.url),
                    tags: vec!["sensitive".to_string(), "exposed".to_string()],
                }]
            }
        })
        .await
    }
}

/// Autoindex pages on common directories.
pub struct DirListingModule;

#[async_trait]
impl ScanModule for DirListingModule {
    fn name(&self) -> &'static str {
        "DirListing"
    }

    async fn run(&self, ctx: &ScanContext, client: &HttpClient) -> Vec<Finding> {
        let paths: Vec<String> = LISTING_PATHS.iter().map(|p| p.to_string()).collect();
        let opts = ProbeOptions::default().body_limit(SAMPLE_BYTES);

        run_pool(expand_paths(&ctx.targets, &paths), ctx.concurrency(), |p: &PathProbe| p.url.clone(), |probe| {
            let opts = &opts;
            async move {
                let Ok(resp) = client.probe_with(&probe.url, opts).await else {
                    return Vec::new();
                };
                if !is_directory_listing(resp.status, &resp.body) {
                    return Vec::new();
                }
                vec![Finding {
                    target: probe.target,
                    endpoint: probe.url,
                    module: self.name().to_string(),
                    vuln_type: "Directory Listing Enabled".to_string(),
                    severity: Severity::Medium,
                    confidence: 0.9,
                    evidence: "Page contains 'Index of /'".to_string(),
                    tags: vec!["info-leak".to_string()],
                }]
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanners::test_support::context_for;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_expand_paths() {
        let probes = expand_paths(
            &[Target::new("https://a.test/app/")],
            &["/.env".to_string(), "backup".to_string()],
        );
        let urls: Vec<&str> = probes.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.test/app/.env", "https://a.test/app/backup"]);
        assert_eq!(probes[0].target, "https://a.test/app/");
    }

    #[tokio::test]
    async fn test_exposed_env_reported_catch_all_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.env"))
            .respond_with(ResponseTemplate::new(200).set_body_string("DB_PASSWORD=hunter2\n"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/backup.sql"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>home</html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>home</html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let ctx = context_for(&format!("{}/", server.uri()), vec![]);
        let client = HttpClient::new(5, None, &[]).unwrap();
        let findings = SensitiveFilesModule.run(&ctx, &client).await;

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].endpoint, format!("{}/.env", server.uri()));
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[tokio::test]
    async fn test_directory_listing_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/uploads/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Index of /uploads</h1>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>app</html>"))
            .mount(&server)
            .await;

        let ctx = context_for(&format!("{}/", server.uri()), vec![]);
        let client = HttpClient::new(5, None, &[]).unwrap();
        let findings = DirListingModule.run(&ctx, &client).await;
        assert_eq!(findings.len(), 1);
        assert!(findings[0].endpoint.ends_with("/uploads/"));
    }
}
