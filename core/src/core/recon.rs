use std::time::Duration;

use log::debug;
use serde::Serialize;

use crate::core::Target;
use crate::http::{HttpClient, ProbeOptions};

const RECON_USER_AGENT: &str = "reconhunt-recon/1.0";
const RECON_TIMEOUT: Duration = Duration::from_secs(8);
const RECON_BODY_SAMPLE: usize = 4096;

/// Body markers mapped to technology tags.
const BODY_HINTS: &[(&str, &str)] = &[
    ("wp-content/", "app:wordpress"),
    ("wordpress", "app:wordpress"),
    ("drupal.settings", "app:drupal"),
    ("content=\"joomla!", "app:joomla"),
    ("powered by prestashop", "app:prestashop"),
    ("var magentoinit", "app:magento"),
    ("cloudflare", "waf:cloudflare"),
    ("akamai", "cdn:akamai"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Reachability {
    Up,
    Down,
}

/// Coarse technology hints for one target, built once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fingerprint {
    pub target: String,
    pub status: Reachability,
    /// Last HTTP status, `0` when the target did not answer.
    pub http_code: u16,
    pub server: Option<String>,
    pub powered_by: Option<String>,
    pub tech: Vec<String>,
}

impl Fingerprint {
    pub fn down(target: &str) -> Self {
        Self {
            target: target.to_string(),
            status: Reachability::Down,
            http_code: 0,
            server: None,
            powered_by: None,
            tech: Vec::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tech.iter().any(|t| t == tag)
    }
}

/// Probes a target once and derives its fingerprint.
pub async fn sample_target(client: &HttpClient, target: &Target) -> Fingerprint {
    let opts = ProbeOptions::default()
        .user_agent(RECON_USER_AGENT)
        .timeout(RECON_TIMEOUT)
        .body_limit(RECON_BODY_SAMPLE);

    match client.probe_with(&target.url, &opts).await {
        Ok(resp) => {
            let server = resp.header("server");
            let powered_by = resp.header("x-powered-by");
            let tech = derive_tags(server.as_deref(), powered_by.as_deref(), &resp.body);
            Fingerprint {
                target: target.url.clone(),
                status: Reachability::Up,
                http_code: resp.status,
                server,
                powered_by,
                tech,
            }
        }
        Err(e) => {
            debug!("Recon probe failed for {}: {}", target.url, e);
            Fingerprint::down(&target.url)
        }
    }
}

/// Builds the tag list from banner headers and a body sample.
pub fn derive_tags(server: Option<&str>, powered_by: Option<&str>, body: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut push = |tag: String| {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    };

    if let Some(s) = server {
        push(format!("server:{}", s.to_lowercase()));
    }
    if let Some(p) = powered_by {
        push(format!("powered-by:{}", p.to_lowercase()));
    }

    let lower = body.to_lowercase();
    for (marker, tag) in BODY_HINTS {
        if lower.contains(marker) {
            push(tag.to_string());
        }
    }
    tags
}
