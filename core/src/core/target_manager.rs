use std::collections::{HashSet, VecDeque};

use anyhow::Context;
use url::Url;

use crate::core::Target;
use crate::utils::read_lines;

/// Deduplicating queue of normalized targets.
pub struct TargetManager {
    queue: VecDeque<Target>,
    seen: HashSet<String>,
}

impl TargetManager {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Normalizes and queues a raw target. Invalid or repeated entries are dropped.
    pub fn add_target(&mut self, raw: &str) -> bool {
        let Some(url) = normalize_target(raw) else {
            return false;
        };
        if self.seen.insert(url.clone()) {
            self.queue.push_back(Target::new(url));
            true
        } else {
            false
        }
    }

    pub fn into_targets(self) -> Vec<Target> {
        self.queue.into_iter().collect()
    }
}

impl Default for TargetManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Loads targets from a single URL/domain and/or a newline-delimited file.
pub fn load_targets(single: Option<&str>, file: Option<&str>) -> anyhow::Result<Vec<Target>> {
    let mut manager = TargetManager::new();

    if let Some(path) = file.filter(|p| !p.is_empty()) {
        let lines = read_lines(path).with_context(|| format!("failed to read target list '{}'", path))?;
        for line in lines {
            manager.add_target(&line);
        }
    }

    if let Some(raw) = single {
        manager.add_target(raw);
    }

    Ok(manager.into_targets())
}

/// Adds `https://` to bare domains and `/` to empty paths. Returns `None` without a host.
pub fn normalize_target(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let mut url = Url::parse(&with_scheme).ok()?;
    if url.host_str().map_or(true, str::is_empty) {
        return None;
    }
    url.set_fragment(None);
    if url.path().is_empty() {
        url.set_path("/");
    }
    Some(url.to_string())
}
