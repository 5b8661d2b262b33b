use std::collections::HashSet;

use async_trait::async_trait;

use crate::core::context::ScanContext;
use crate::core::recon::{Fingerprint, Reachability};
use crate::core::{Finding, Severity};
use crate::http::HttpClient;
use crate::scanners::ScanModule;

/// Turns recon fingerprints into informational findings. Sends no requests.
pub struct TechFingerprintModule;

struct Rule {
    vuln_type: &'static str,
    severity: Severity,
    confidence: f64,
    tags: &'static [&'static str],
    matches: fn(&Hints) -> bool,
}

/// Lower-cased views of one fingerprint.
struct Hints {
    server: String,
    powered_by: String,
    tech: Vec<String>,
}

impl Hints {
    fn from(fp: &Fingerprint) -> Self {
        Self {
            server: fp.server.as_deref().unwrap_or_default().to_lowercase(),
            powered_by: fp.powered_by.as_deref().unwrap_or_default().to_lowercase(),
            tech: fp.tech.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    fn tech_contains(&self, needle: &str) -> bool {
        self.tech.iter().any(|t| t.contains(needle))
    }
}

const RULES: &[Rule] = &[
    Rule {
        vuln_type: "Potential WordPress-related Vulnerabilities",
        severity: Severity::Medium,
        confidence: 0.6,
        tags: &["cve", "wordpress", "fingerprint"],
        matches: |h| h.tech_contains("wordpress") || h.tech_contains("wp-content"),
    },
    Rule {
        vuln_type: "PHP Stack Detected",
        severity: Severity::Info,
        confidence: 0.5,
        tags: &["php", "fingerprint"],
        matches: |h| h.server.contains("php") || h.powered_by.contains("php"),
    },
    Rule {
        vuln_type: "Apache HTTPD Detected",
        severity: Severity::Info,
        confidence: 0.5,
        tags: &["apache", "cve-hint", "fingerprint"],
        matches: |h| h.server.contains("apache"),
    },
    Rule {
        vuln_type: "nginx Detected",
        severity: Severity::Info,
        confidence: 0.5,
        tags: &["nginx", "cve-hint", "fingerprint"],
        matches: |h| h.server.contains("nginx"),
    },
    Rule {
        vuln_type: "Microsoft IIS Detected",
        severity: Severity::Info,
        confidence: 0.6,
        tags: &["iis", "cve-hint", "fingerprint"],
        matches: |h| h.server.contains("microsoft-iis"),
    },
    Rule {
        vuln_type: "Laravel Framework Detected",
        severity: Severity::Info,
        confidence: 0.7,
        tags: &["laravel", "cve-hint", "fingerprint"],
        matches: |h| h.powered_by.contains("laravel") || h.tech_contains("laravel"),
    },
    Rule {
        vuln_type: "Cloudflare/WAF Detected",
        severity: Severity::Info,
        confidence: 0.9,
        tags: &["waf", "cloudflare", "fingerprint"],
        matches: |h| h.tech_contains("waf:cloudflare") || h.server.contains("cloudflare"),
    },
];

impl TechFingerprintModule {
    pub fn evaluate(&self, fingerprints: &[Fingerprint]) -> Vec<Finding> {
        let mut seen: HashSet<(String, &'static str)> = HashSet::new();
        let mut findings = Vec::new();

        for fp in fingerprints.iter().filter(|fp| fp.status == Reachability::Up) {
            let hints = Hints::from(fp);
            for rule in RULES.iter().filter(|r| (r.matches)(&hints)) {
                if !seen.insert((fp.target.clone(), rule.vuln_type)) {
                    continue;
                }
                findings.push(Finding {
                    target: fp.target.clone(),
                    endpoint: fp.target.clone(),
                    module: self.name().to_string(),
                    vuln_type: rule.vuln_type.to_string(),
                    severity: rule.severity,
                    confidence: rule.confidence,
                    evidence: evidence_for(fp),
                    tags: rule.tags.iter().map(|t| t.to_string()).collect(),
                });
            }
        }
        findings
    }
}

fn evidence_for(fp: &Fingerprint) -> String {
    let mut parts = Vec::new();
    if let Some(server) = &fp.server {
        parts.push(format!("Server: {}", server));
    }
    if let Some(powered) = &fp.powered_by {
        parts.push(format!("X-Powered-By: {}", powered));
    }
    if !fp.tech.is_empty() {
        parts.push(format!("hints: {}", fp.tech.join(", ")));
    }
    parts.join("; ")
}

#[async_trait]
impl ScanModule for TechFingerprintModule {
    fn name(&self) -> &'static str {
        "CVEFingerprint"
    }

    async fn run(&self, ctx: &ScanContext, _client: &HttpClient) -> Vec<Finding> {
        self.evaluate(&ctx.fingerprints)
    }
}
