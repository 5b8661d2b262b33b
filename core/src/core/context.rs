use std::collections::BTreeSet;

use crate::core::classifier::ClassifiedBuckets;
use crate::core::recon::Fingerprint;
use crate::core::Target;
use crate::utils::payload_loader::Wordlists;

pub const DEFAULT_CONCURRENCY: usize = 10;

const BASE_ATTEMPTS: usize = 3;
const AGGRESSIVE_EXTRA_ATTEMPTS: usize = 3;

/// Resolves a requested worker count; non-positive values fall back to the default.
pub fn resolve_concurrency(requested: i64) -> usize {
    if requested <= 0 {
        DEFAULT_CONCURRENCY
    } else {
        usize::try_from(requested).unwrap_or(DEFAULT_CONCURRENCY)
    }
}

/// Everything discovery produced, frozen before any scanning module runs.
///
/// Modules only ever receive `&ScanContext`; their output goes to their own
/// finding list.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub targets: Vec<Target>,
    pub fingerprints: Vec<Fingerprint>,
    pub url_pool: BTreeSet<String>,
    pub live_urls: Vec<String>,
    pub buckets: ClassifiedBuckets,
    /// External collectors that contributed URLs to the pool.
    pub external_used: Vec<String>,
    pub wordlists: Wordlists,
    concurrency: usize,
    aggressive: bool,
}

impl ScanContext {
    pub fn new(targets: Vec<Target>, concurrency: i64, aggressive: bool, wordlists: Wordlists) -> Self {
        Self {
            targets,
            fingerprints: Vec::new(),
            url_pool: BTreeSet::new(),
            live_urls: Vec::new(),
            buckets: ClassifiedBuckets::default(),
            external_used: Vec::new(),
            wordlists,
            concurrency: resolve_concurrency(concurrency),
            aggressive,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn is_aggressive(&self) -> bool {
        self.aggressive
    }

    /// Per-parameter payload ceiling for a module with `builtin` payloads.
    ///
    /// Never below the built-in list; aggressive mode allows three more.
    pub fn attempt_limit(&self, builtin: usize) -> usize {
        let base = builtin.max(BASE_ATTEMPTS);
        if self.aggressive { base + AGGRESSIVE_EXTRA_ATTEMPTS } else { base }
    }

    /// The target a concrete URL belongs to, or the URL itself when none matches.
    pub fn target_for(&self, url: &str) -> String {
        self.targets
            .iter()
            .find(|t| url.contains(t.url.trim_end_matches('/')))
            .map(|t| t.url.clone())
            .unwrap_or_else(|| url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(concurrency: i64) -> ScanContext {
        ScanContext::new(
            vec![Target::new("https://a.test/")],
            concurrency,
            false,
            Wordlists::new("wordlists"),
        )
    }

    #[test]
    fn test_concurrency_defaults() {
        assert_eq!(ctx(0).concurrency(), DEFAULT_CONCURRENCY);
        assert_eq!(ctx(-4).concurrency(), DEFAULT_CONCURRENCY);
        assert_eq!(ctx(25).concurrency(), 25);
    }

    #[test]
    fn test_attempt_limit() {
        let mut c = ctx(10);
        assert_eq!(c.attempt_limit(1), 3);
        assert_eq!(c.attempt_limit(3), 3);
        assert_eq!(c.attempt_limit(6), 6);
        c.aggressive = true;
        assert_eq!(c.attempt_limit(3), 6);
        assert_eq!(c.attempt_limit(6), 9);
    }

    #[test]
    fn test_target_for() {
        let c = ctx(10);
        assert_eq!(c.target_for("https://a.test/search?q=1"), "https://a.test/");
        assert_eq!(c.target_for("https://b.test/x"), "https://b.test/x");
    }
}
