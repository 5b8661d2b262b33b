use std::process::Stdio;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use url::Url;

use crate::core::deadline::Deadline;
use crate::core::Target;
use crate::utils;

/// Hard ceiling on URLs taken from any single collector.
pub const MAX_COLLECTOR_URLS: usize = 2000;

/// Archive collectors tried in order, when installed.
const COLLECTORS: &[&str] = &["gau", "waybackurls"];

#[derive(Debug, Default, Clone)]
pub struct ExternalUrls {
    pub urls: Vec<String>,
    /// Collectors that actually contributed at least one URL.
    pub used: Vec<String>,
}

/// Runs every installed archive collector against the target host.
///
/// Missing binaries are skipped silently. The deadline is checked before each
/// process is spawned.
pub async fn collect_external_urls(target: &Target, deadline: &Deadline) -> ExternalUrls {
    let mut out = ExternalUrls::default();
    let Some(host) = Url::parse(&target.url).ok().and_then(|u| u.host_str().map(str::to_string)) else {
        return out;
    };

    for name in COLLECTORS {
        if deadline.is_expired() {
            warn!("Global deadline reached, skipping {}", name);
            break;
        }
        let Some(binary) = utils::get_binary_path(name) else {
            debug!("{} not installed, skipping", name);
            continue;
        };

        match run_collector(&binary, &[host.as_str()], &host, MAX_COLLECTOR_URLS).await {
            Ok(urls) if !urls.is_empty() => {
                info!("{} contributed {} URL(s) for {}", name, urls.len(), host);
                out.urls.extend(urls);
                out.used.push(name.to_string());
            }
            Ok(_) => debug!("{} returned nothing for {}", name, host),
            Err(e) => debug!("{} failed: {}", name, e),
        }
    }
    out
}

/// Spawns `binary args...` and keeps same-host http(s) URLs from its stdout.
///
/// The child is killed once `cap` URLs have been read.
pub async fn run_collector(binary: &str, args: &[&str], host: &str, cap: usize) -> anyhow::Result<Vec<String>> {
    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("Failed to capture stdout from {}", binary))?;
    let mut lines = BufReader::new(stdout).lines();
    let mut urls: Vec<String> = Vec::new();

    while let Ok(Some(raw_line)) = lines.next_line().await {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if !is_same_host(line, host) || urls.iter().any(|u| u == line) {
            continue;
        }
        urls.push(line.to_string());
        if urls.len() >= cap {
            child.kill().await.ok();
            break;
        }
    }

    let _ = child.wait().await;
    Ok(urls)
}

fn is_same_host(raw: &str, host: &str) -> bool {
    match Url::parse(raw) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| h.eq_ignore_ascii_case(host)),
        Err(_) => false,
    }
}
