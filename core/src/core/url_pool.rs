use std::collections::BTreeSet;

use url::Url;

use crate::core::Target;
use crate::modules::crawler::CrawledEndpoint;
use crate::utils::payload_loader::{Wordlist, Wordlists};

const BASE_CRAWL_LIMIT: usize = 60;

const STATIC_PATHS: &[&str] = &["/", "/login", "/admin", "/search", "/api", "/dashboard"];

const AGGRESSIVE_PATHS: &[&str] = &[
    "/admin/login",
    "/admin-panel",
    "/backup",
    "/backups",
    "/old",
    "/staging",
    "/test",
    "/public",
    "/.git",
    "/.env",
];

/// Per-target crawl budget, scaled up for larger worker pools.
pub fn crawl_limit(concurrency: usize) -> usize {
    if concurrency >= 30 {
        BASE_CRAWL_LIMIT * 3
    } else if concurrency >= 20 {
        BASE_CRAWL_LIMIT * 2
    } else {
        BASE_CRAWL_LIMIT
    }
}

/// Accumulates candidate URLs from every discovery source.
#[derive(Debug, Default)]
pub struct UrlPoolBuilder {
    urls: BTreeSet<String>,
}

impl UrlPoolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    pub fn add_crawled(&mut self, endpoints: &[CrawledEndpoint]) {
        for ep in endpoints {
            self.add(ep.url.clone());
        }
    }

    /// The target itself plus the common static paths on its origin.
    ///
    /// Aggressive mode adds a second list and the `dirs_common` wordlist.
    pub fn add_static_paths(&mut self, target: &Target, aggressive: bool, wordlists: &Wordlists) {
        self.add(target.url.clone());

        let Ok(base) = Url::parse(&target.url) else {
            return;
        };

        let mut paths: Vec<String> = STATIC_PATHS.iter().map(|p| p.to_string()).collect();
        if aggressive {
            paths.extend(AGGRESSIVE_PATHS.iter().map(|p| p.to_string()));
            paths.extend(wordlists.load(Wordlist::DirsCommon));
        }

        for path in paths {
            let path = if path.starts_with('/') { path } else { format!("/{}", path) };
            if let Ok(joined) = base.join(&path) {
                self.add(joined.to_string());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn build(self) -> BTreeSet<String> {
        self.urls
    }
}
