//! Scanning modules and the machinery they share.
//!
//! Every module reads the frozen [`ScanContext`], picks its work once through a
//! [`WorkSource`], and pushes that work through [`run_pool`], which enforces
//! per-item dedup and the context's concurrency bound.

pub mod exposure;
pub mod fingerprint;
pub mod headers;
pub mod lfi;
pub mod redirect;
pub mod sqli;
pub mod ssrf;
pub mod xss;

use std::future::{ready, Future};

use async_trait::async_trait;
use futures::{stream, StreamExt};

use crate::core::classifier::VulnClass;
use crate::core::context::ScanContext;
use crate::core::{EndpointParam, Finding, SeenSet};
use crate::http::HttpClient;
use crate::utils::payload_loader::{unique_append, Wordlist};

/// Upper bound on endpoint-parameter pairs one module will test.
pub const MAX_WORK_ITEMS: usize = 200;

/// Trait that all scanning modules implement.
#[async_trait]
pub trait ScanModule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs to completion. Probe failures are skipped, never returned.
    async fn run(&self, ctx: &ScanContext, client: &HttpClient) -> Vec<Finding>;
}

/// Where a module's work items came from, decided once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkSource {
    /// Pairs the classifier placed in the module's bucket.
    Bucket(Vec<EndpointParam>),
    /// Every live URL crossed with generic parameter names.
    Fallback(Vec<EndpointParam>),
}

impl WorkSource {
    /// Uses the class bucket when it has entries, otherwise the fallback names.
    pub fn select(ctx: &ScanContext, class: VulnClass, fallback_params: &[&str]) -> Self {
        let bucket = ctx.buckets.get(class);
        if !bucket.is_empty() {
            return WorkSource::Bucket(bucket.iter().take(MAX_WORK_ITEMS).cloned().collect());
        }

        let items = ctx
            .live_urls
            .iter()
            .flat_map(|url| fallback_params.iter().map(move |p| EndpointParam::new(url.clone(), *p)))
            .take(MAX_WORK_ITEMS)
            .collect();
        WorkSource::Fallback(items)
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, WorkSource::Fallback(_))
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn items(&self) -> &[EndpointParam] {
        match self {
            WorkSource::Bucket(items) | WorkSource::Fallback(items) => items,
        }
    }

    pub fn into_items(self) -> Vec<EndpointParam> {
        match self {
            WorkSource::Bucket(items) | WorkSource::Fallback(items) => items,
        }
    }
}

/// Drains `items` through at most `concurrency` in-flight probes.
///
/// Items whose `key` was already dispatched are dropped before they reach a
/// worker. Output order is unspecified.
pub async fn run_pool<T, K, F, Fut>(items: Vec<T>, concurrency: usize, key: K, probe: F) -> Vec<Finding>
where
    K: Fn(&T) -> String,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Vec<Finding>>,
{
    let seen = SeenSet::new();
    let batches: Vec<Vec<Finding>> = stream::iter(items)
        .filter(|item| ready(seen.insert(key(item))))
        .map(probe)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    batches.into_iter().flatten().collect()
}

/// Built-in payloads, then aggressive-mode extras, cut to the per-parameter limit.
pub fn payload_plan(ctx: &ScanContext, builtin: &[&str], list: Wordlist) -> Vec<String> {
    let mut payloads: Vec<String> = builtin.iter().map(|p| p.to_string()).collect();
    if ctx.is_aggressive() {
        payloads = unique_append(payloads, ctx.wordlists.load(list));
    }
    payloads.truncate(ctx.attempt_limit(builtin.len()));
    payloads
}

/// The two module groups, run in this order.
pub fn default_groups() -> Vec<(&'static str, Vec<Box<dyn ScanModule>>)> {
    vec![
        (
            "surface",
            vec![
                Box::new(headers::SecurityHeadersModule) as Box<dyn ScanModule>,
                Box::new(headers::CorsModule),
                Box::new(exposure::SensitiveFilesModule),
                Box::new(exposure::DirListingModule),
                Box::new(fingerprint::TechFingerprintModule),
            ],
        ),
        (
            "injection",
            vec![
                Box::new(sqli::SqliErrorModule) as Box<dyn ScanModule>,
                Box::new(xss::XssReflectModule::new()),
                Box::new(lfi::LfiModule),
                Box::new(redirect::OpenRedirectModule),
                Box::new(ssrf::SsrfModule),
            ],
        ),
    ]
}


#[cfg(test)]
mod tests {
    use super::test_support::context_for;
    use super::*;
    use crate::core::Severity;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_bucket_source_preferred() {
        let ctx = context_for("https://a.test/", vec!["https://a.test/?id=1".to_string()]);
        let source = WorkSource::select(&ctx, VulnClass::Sqli, &["id"]);
        assert!(!source.is_fallback());
        assert_eq!(source.items(), &[EndpointParam::new("https://a.test/?id=1", "id")]);
    }

    #[test]
    fn test_fallback_crosses_live_urls() {
        let ctx = context_for(
            "https://a.test/",
            vec!["https://a.test/".to_string(), "https://a.test/x".to_string()],
        );
        let source = WorkSource::select(&ctx, VulnClass::Lfi, &["file", "path"]);
        assert!(source.is_fallback());
        assert_eq!(source.len(), 4);
        for item in source.items() {
            assert!(ctx.live_urls.contains(&item.url));
        }
    }

    #[test]
    fn test_fallback_is_capped() {
        let live: Vec<String> = (0..300).map(|i| format!("https://a.test/{}", i)).collect();
        let ctx = context_for("https://a.test/", live);
        let source = WorkSource::select(&ctx, VulnClass::Xss, &["q", "s"]);
        assert_eq!(source.len(), MAX_WORK_ITEMS);
    }

    #[tokio::test]
    async fn test_pool_dedups_and_bounds() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let calls = AtomicUsize::new(0);

        let items = vec![
            EndpointParam::new("u1", "a"),
            EndpointParam::new("u1", "a"),
            EndpointParam::new("u2", "a"),
            EndpointParam::new("u3", "b"),
            EndpointParam::new("u4", "b"),
        ];
        let findings = run_pool(items, 2, |ep| ep.key(), |ep| {
            let (in_flight, peak, calls) = (&in_flight, &peak, &calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                vec![Finding {
                    target: ep.url.clone(),
                    endpoint: ep.url,
                    module: "Test".to_string(),
                    vuln_type: "t".to_string(),
                    severity: Severity::Info,
                    confidence: 0.5,
                    evidence: String::new(),
                    tags: Vec::new(),
                }]
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(findings.len(), 4);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_payload_plan_limits() {
        let mut ctx = context_for("https://a.test/", vec![]);
        assert_eq!(payload_plan(&ctx, &["a", "b", "c"], Wordlist::SqliPayloads).len(), 3);

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sqli_payloads.txt"), "a\nx1\nx2\nx3\nx4\nx5\n").unwrap();
        ctx = ScanContext::new(ctx.targets.clone(), 4, true, crate::utils::payload_loader::Wordlists::new(dir.path()));
        let plan = payload_plan(&ctx, &["a", "b", "c"], Wordlist::SqliPayloads);
        assert_eq!(plan, vec!["a", "b", "c", "x1", "x2", "x3"]);
    }
}
