use std::collections::HashSet;
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use log::{debug, warn};

pub const SQLI_ERROR_PAYLOADS: &[&str] = &["'", "\"", "' OR 1=1--"];

pub const LFI_TRAVERSALS: &[&str] = &[
    "../../../../../../etc/passwd",
    "../../../../../etc/passwd",
    "../../../../etc/passwd",
    "../../../etc/passwd",
    "../../etc/passwd",
    "../etc/passwd",
];

pub const REDIRECT_TARGETS: &[&str] = &["https://example.org", "https://example.com"];

pub const SSRF_TARGETS: &[&str] = &[
    "http://127.0.0.1/",
    "http://localhost/",
    "http://169.254.169.254/",
];

pub const SENSITIVE_PATHS: &[&str] = &[
    "/.git/config",
    "/.env",
    "/.env.backup",
    "/.env.bak",
    "/backup.sql",
    "/db.sql",
    "/config.php.bak",
    "/web.config.bak",
    "/.DS_Store",
];

pub const LISTING_PATHS: &[&str] = &["/", "/backup/", "/old/", "/uploads/", "/files/"];

/// Supplementary lists read under aggressive mode, each with its own ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wordlist {
    XssPayloads,
    SqliPayloads,
    LfiPayloads,
    SsrfTargets,
    RedirectTargets,
    DirsCommon,
}

impl Wordlist {
    pub fn file_name(&self) -> &'static str {
        match self {
            Wordlist::XssPayloads => "xss_payloads.txt",
            Wordlist::SqliPayloads => "sqli_payloads.txt",
            Wordlist::LfiPayloads => "lfi_payloads.txt",
            Wordlist::SsrfTargets => "ssrf_targets.txt",
            Wordlist::RedirectTargets => "redirect_targets.txt",
            Wordlist::DirsCommon => "dirs_common.txt",
        }
    }

    pub fn max_entries(&self) -> usize {
        match self {
            Wordlist::XssPayloads => 5,
            Wordlist::SqliPayloads => 5,
            Wordlist::LfiPayloads => 6,
            Wordlist::SsrfTargets => 10,
            Wordlist::RedirectTargets => 4,
            Wordlist::DirsCommon => 300,
        }
    }
}

/// Resolves aggressive-mode wordlists relative to one directory.
#[derive(Debug, Clone)]
pub struct Wordlists {
    dir: PathBuf,
}

impl Wordlists {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Loads up to `max_entries` lines of the given list. Absent file → empty.
    pub fn load(&self, list: Wordlist) -> Vec<String> {
        let path = self.dir.join(list.file_name());
        if !path.exists() {
            debug!("Wordlist {:?} not present, skipping", path);
            return Vec::new();
        }
        let mut lines = load_list_from_file(&path);
        lines.truncate(list.max_entries());
        lines
    }

    /// Built-in entries followed by de-duplicated wordlist extras.
    pub fn extend(&self, builtin: &[&str], list: Wordlist) -> Vec<String> {
        let base: Vec<String> = builtin.iter().map(|s| s.to_string()).collect();
        unique_append(base, self.load(list))
    }
}

/// Loads lines from a file, skipping empty lines and comments
pub fn load_list_from_file(path: &Path) -> Vec<String> {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to open wordlist {:?}: {}", path, e);
            return Vec::new();
        }
    };
    let reader = std::io::BufReader::new(file);
    reader
        .lines()
        .map_while(Result::ok)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !s.starts_with('#'))
        .collect()
}

/// Appends entries of `extra` that are not already present in `base`.
pub fn unique_append(mut base: Vec<String>, extra: Vec<String>) -> Vec<String> {
    let mut exists: HashSet<String> = base.iter().cloned().collect();
    for e in extra {
        if exists.insert(e.clone()) {
            base.push(e);
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_list_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "# header").unwrap();
        writeln!(f, "alpha").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "  beta  ").unwrap();

        assert_eq!(load_list_from_file(&path), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_missing_wordlist_is_empty() {
        let lists = Wordlists::new("/nonexistent/wordlists");
        assert!(lists.load(Wordlist::XssPayloads).is_empty());
        assert_eq!(lists.extend(SQLI_ERROR_PAYLOADS, Wordlist::SqliPayloads).len(), 3);
    }

    #[test]
    fn test_wordlist_is_capped_and_deduped() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("ssrf_targets.txt")).unwrap();
        writeln!(f, "http://127.0.0.1/").unwrap();
        for i in 0..20 {
            writeln!(f, "http://10.0.0.{}/", i).unwrap();
        }

        let lists = Wordlists::new(dir.path());
        let loaded = lists.load(Wordlist::SsrfTargets);
        assert_eq!(loaded.len(), Wordlist::SsrfTargets.max_entries());

        let merged = lists.extend(SSRF_TARGETS, Wordlist::SsrfTargets);
        assert_eq!(&merged[..3], SSRF_TARGETS);
        assert_eq!(merged.iter().filter(|p| p.as_str() == "http://127.0.0.1/").count(), 1);
        assert_eq!(merged.len(), 3 + 9);
    }
}
