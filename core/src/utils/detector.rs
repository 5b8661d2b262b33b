//! Response detectors used by the scanning modules.
//!
//! Every function here is pure: it looks at a status code, headers or a body
//! sample and reports whether the class-specific signature is present.

use url::Url;

/// Lower-cased DBMS error fragments (MySQL, PostgreSQL, MSSQL/ODBC, generic).
const DB_ERRORS: &[&str] = &[
    "you have an error in your sql syntax",
    "warning: mysql",
    "mysql_fetch_array()",
    "pg_query():",
    "postgresql query failed",
    "unclosed quotation mark after the character string",
    "odbc sql server driver",
    "microsoft ole db provider",
    "sqlstate[hy000]",
    "sqlstate[42000]",
    "syntax error in query expression",
    "native client",
    "syntax error",
];

const NETWORK_ERRORS: &[&str] = &[
    "connection refused",
    "timed out",
    "unreachable",
    "cannot resolve",
];

/// Returns the first DB error pattern found in the body, case-insensitively.
pub fn find_sql_error(body: &str) -> Option<&'static str> {
    let lower = body.to_lowercase();
    DB_ERRORS.iter().copied().find(|p| lower.contains(p))
}

/// Direct or HTML-entity-encoded reflection of `marker` in `body`.
pub fn is_reflected(body: &str, marker: &str) -> bool {
    if marker.is_empty() {
        return false;
    }
    if body.contains(marker) {
        return true;
    }

    let body_lower = body.to_lowercase();
    let marker_lower = marker.to_lowercase();

    let single: [(&str, &str); 5] = [
        ("<", "&lt;"),
        (">", "&gt;"),
        ("\"", "&quot;"),
        ("\"", "&#34;"),
        ("'", "&#39;"),
    ];
    for (raw, encoded) in single {
        if marker_lower.contains(raw) && body_lower.contains(&marker_lower.replace(raw, encoded)) {
            return true;
        }
    }

    body_lower.contains(&encode_named(&marker_lower))
        || body_lower.contains(&encode_numeric(&marker_lower))
}

fn encode_named(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn encode_numeric(s: &str) -> String {
    s.replace('&', "&#38;")
        .replace('<', "&#60;")
        .replace('>', "&#62;")
        .replace('"', "&#34;")
        .replace('\'', "&#39;")
}

/// Both a root passwd record and a shell path must appear.
pub fn is_passwd_leak(body: &str) -> bool {
    body.contains("root:x:0:0:") && body.contains("/bin/")
}

/// Checks a single redirect hop against the injected external URL.
///
/// Only a 3xx counts. The `Location` must start with the injected URL, or
/// resolve to the injected host or one of its subdomains; the injected
/// domain merely appearing somewhere in the value (e.g. in a query string)
/// is not enough. `location` is resolved against `request_url` first, so
/// relative and protocol-relative values are handled like absolute ones.
pub fn is_open_redirect(status: u16, location: Option<&str>, request_url: &str, injected: &str) -> bool {
    if !(300..400).contains(&status) {
        return false;
    }
    let Some(location) = location.map(str::trim).filter(|l| !l.is_empty()) else {
        return false;
    };
    if location.starts_with(injected) {
        return true;
    }

    let Some(injected_host) = Url::parse(injected)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
    else {
        return false;
    };

    let resolved = match Url::parse(request_url) {
        Ok(base) => base.join(location).ok(),
        Err(_) => Url::parse(location).ok(),
    };
    let Some(host) = resolved.and_then(|u| u.host_str().map(|h| h.to_lowercase())) else {
        return false;
    };

    host == injected_host || host.ends_with(&format!(".{}", injected_host))
}

/// 2xx baseline turned into a 5xx carrying a network error phrase.
///
/// Returns the matched phrase so it can be quoted as evidence.
pub fn ssrf_signal(baseline_status: u16, probe_status: u16, probe_body: &str) -> Option<&'static str> {
    if !(200..300).contains(&baseline_status) || probe_status < 500 {
        return None;
    }
    let snippet: String = probe_body.chars().take(512).collect::<String>().to_lowercase();
    NETWORK_ERRORS.iter().copied().find(|p| snippet.contains(p))
}

/// Apache/nginx style autoindex page.
pub fn is_directory_listing(status: u16, body: &str) -> bool {
    status == 200 && body.contains("Index of /")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_error_case_insensitive() {
        assert_eq!(
            find_sql_error("<b>You have an error in your SQL syntax</b> near ''"),
            Some("you have an error in your sql syntax")
        );
        assert_eq!(find_sql_error("SQLSTATE[42000]: oops"), Some("sqlstate[42000]"));
        assert!(find_sql_error("everything is fine").is_none());
    }

    #[test]
    fn test_reflection_direct_and_encoded() {
        let marker = "reconhunt_abc123_<>\"'</script>";
        assert!(is_reflected(&format!("<p>{}</p>", marker), marker));
        assert!(is_reflected("<p>reconhunt_abc123_&lt;>\"'&lt;/script></p>", marker));
        assert!(is_reflected(
            "reconhunt_abc123_&lt;&gt;&quot;&#39;&lt;/script&gt;",
            marker
        ));
        assert!(is_reflected(
            "RECONHUNT_ABC123_&#60;&#62;&#34;&#39;&#60;/SCRIPT&#62;",
            marker
        ));
        assert!(!is_reflected("reconhunt_abc123_", marker));
        assert!(!is_reflected("anything", ""));
    }

    #[test]
    fn test_passwd_requires_both_markers() {
        assert!(is_passwd_leak("root:x:0:0:root:/root:/bin/bash\n"));
        assert!(!is_passwd_leak("docs mention root:x:0:0: only"));
        assert!(!is_passwd_leak("/bin/sh"));
    }

    #[test]
    fn test_open_redirect_matching() {
        let req = "https://a.test/login?next=https://example.org";
        assert!(is_open_redirect(302, Some("https://example.org"), req, "https://example.org"));
        assert!(is_open_redirect(301, Some("//sub.example.org/x"), req, "https://example.org"));
        assert!(!is_open_redirect(302, Some("/dashboard"), req, "https://example.org"));
        assert!(!is_open_redirect(302, Some("https://example.org.evil.test/"), req, "https://example.org/x"));
        assert!(!is_open_redirect(200, Some("https://example.org"), req, "https://example.org"));
        assert!(!is_open_redirect(302, None, req, "https://example.org"));
    }

    #[test]
    fn test_injected_domain_in_query_is_not_a_redirect() {
        let req = "https://a.test/go?next=https://example.org";
        assert!(!is_open_redirect(
            302,
            Some("/login?return=https://example.org"),
            req,
            "https://example.org"
        ));
    }

    #[test]
    fn test_ssrf_signal_requires_transition() {
        assert_eq!(ssrf_signal(200, 502, "Upstream: Connection refused"), Some("connection refused"));
        assert!(ssrf_signal(500, 502, "connection refused").is_none());
        assert!(ssrf_signal(200, 404, "connection refused").is_none());
        assert!(ssrf_signal(200, 500, "internal error").is_none());
    }

    #[test]
    fn test_directory_listing() {
        assert!(is_directory_listing(200, "<title>Index of /backup</title>"));
        assert!(!is_directory_listing(403, "Index of /"));
    }
}
