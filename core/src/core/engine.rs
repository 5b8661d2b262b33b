use std::sync::Arc;

use futures::future::join_all;
use log::{info, warn};
use tokio::sync::mpsc;

use crate::core::classifier::{classify, VulnClass};
use crate::core::context::ScanContext;
use crate::core::deadline::Deadline;
use crate::core::live_filter::filter_live;
use crate::core::recon::sample_target;
use crate::core::url_pool::{crawl_limit, UrlPoolBuilder};
use crate::core::{Finding, Target};
use crate::error::{PipelineError, Result};
use crate::http::HttpClient;
use crate::modules::collectors::collect_external_urls;
use crate::modules::crawler::crawl;
use crate::scanners::{default_groups, ScanModule};
use crate::utils::payload_loader::Wordlists;
use crate::{ScanConfig, SinkRef};

/// A named set of modules that run side by side.
pub type ModuleGroup = (&'static str, Vec<Box<dyn ScanModule>>);

/// Drives discovery into a [`ScanContext`], then runs module groups against it.
///
/// Each phase owns its own bounded pool and is fully drained before the next
/// one starts.
pub struct ScanEngine {
    client: Arc<HttpClient>,
    sink: SinkRef,
    concurrency: i64,
    aggressive: bool,
    external: bool,
    wordlists: Wordlists,
}

impl ScanEngine {
    pub fn new(config: &ScanConfig, client: Arc<HttpClient>, sink: SinkRef) -> Self {
        Self {
            client,
            sink,
            concurrency: config.concurrency,
            aggressive: config.aggressive,
            external: config.external,
            wordlists: Wordlists::new(&config.wordlist_dir),
        }
    }

    /// Recon and crawl per target, then pool, live filter and classification.
    ///
    /// Targets are crawled one after another with recon overlapping each
    /// crawl, so in-flight requests stay at the crawl pool size plus one.
    pub async fn build_context(&self, targets: Vec<Target>, deadline: &Deadline) -> Result<ScanContext> {
        if targets.is_empty() {
            return Err(PipelineError::NoTargets);
        }

        let mut ctx = ScanContext::new(targets, self.concurrency, self.aggressive, self.wordlists.clone());
        let concurrency = ctx.concurrency();
        let max_endpoints = crawl_limit(concurrency);

        let client = self.client.as_ref();
        let total = ctx.targets.len();
        let mut pool = UrlPoolBuilder::new();
        let mut fingerprints = Vec::with_capacity(total);

        for (i, target) in ctx.targets.iter().enumerate() {
            self.sink.on_progress("Recon + crawl", i + 1, total);
            let (fingerprint, endpoints) = tokio::join!(
                sample_target(client, target),
                crawl(client, &target.url, max_endpoints, concurrency)
            );
            pool.add_crawled(&endpoints);
            fingerprints.push(fingerprint);
        }
        ctx.fingerprints = fingerprints;
        for target in &ctx.targets {
            pool.add_static_paths(target, ctx.is_aggressive(), &ctx.wordlists);
        }

        if self.external {
            for target in &ctx.targets {
                let external = collect_external_urls(target, deadline).await;
                for url in external.urls {
                    pool.add(url);
                }
                for name in external.used {
                    if !ctx.external_used.contains(&name) {
                        ctx.external_used.push(name);
                    }
                }
            }
        }

        ctx.url_pool = pool.build();
        self.sink.on_log("info", &format!("[*] URL pool: {} candidate(s)", ctx.url_pool.len()));

        self.sink.on_progress("Live filter", 0, ctx.url_pool.len());
        ctx.live_urls = filter_live(client, ctx.url_pool.iter().cloned(), concurrency).await;
        if ctx.live_urls.is_empty() {
            return Err(PipelineError::NoLiveUrls);
        }

        ctx.buckets = classify(&ctx.live_urls);
        let summary: Vec<String> = VulnClass::ALL
            .iter()
            .map(|c| format!("{}={}", c, ctx.buckets.get(*c).len()))
            .collect();
        self.sink.on_log(
            "success",
            &format!("[+] {} live URL(s); buckets: {}", ctx.live_urls.len(), summary.join(" ")),
        );
        Ok(ctx)
    }

    /// Runs the default surface and injection groups.
    pub async fn run_default_groups(&self, ctx: &ScanContext, deadline: &Deadline, tx: mpsc::Sender<Finding>) {
        self.run_groups(ctx, &default_groups(), deadline, tx).await;
    }

    /// Runs groups in order; the modules of one group run concurrently.
    ///
    /// The deadline is checked before each module starts. An expired deadline
    /// skips the module; a running module is never interrupted.
    pub async fn run_groups(
        &self,
        ctx: &ScanContext,
        groups: &[ModuleGroup],
        deadline: &Deadline,
        tx: mpsc::Sender<Finding>,
    ) {
        let client = self.client.as_ref();

        for (group, modules) in groups {
            self.sink.on_log("phase", &format!("[*] Module group: {}", group));

            let runs = modules.iter().filter_map(|module| {
                if deadline.is_expired() {
                    warn!("Global deadline reached, skipping {}", module.name());
                    return None;
                }
                Some(async move {
                    let findings = module.run(ctx, client).await;
                    info!("{} finished with {} finding(s)", module.name(), findings.len());
                    findings
                })
            });

            for findings in join_all(runs).await {
                for finding in findings {
                    if tx.send(finding).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}
