use std::sync::Mutex;
use std::time::Duration;

use futures::{stream, StreamExt};
use log::{debug, info};

use crate::core::SeenSet;
use crate::http::{HttpClient, ProbeOptions};

const LIVE_USER_AGENT: &str = "reconhunt-livecheck/1.0";
const LIVE_TIMEOUT: Duration = Duration::from_secs(6);
const LIVE_BODY_SAMPLE: usize = 1024;

/// Status codes that mark a URL as reachable and worth scanning.
pub const LIVE_STATUSES: &[u16] = &[200, 201, 202, 301, 302, 403];

pub fn is_interesting_status(status: u16) -> bool {
    LIVE_STATUSES.contains(&status)
}

/// Re-probes every candidate and keeps only those answering with an allowed status.
///
/// Redirects are not followed, so a 301/302 is judged on its own. Output
/// order is unspecified.
pub async fn filter_live<I>(client: &HttpClient, urls: I, concurrency: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let seen = SeenSet::new();
    let live: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let opts = ProbeOptions::default()
        .user_agent(LIVE_USER_AGENT)
        .timeout(LIVE_TIMEOUT)
        .body_limit(LIVE_BODY_SAMPLE)
        .no_redirects();

    let candidates: Vec<String> = urls.into_iter().filter(|u| seen.insert(u.clone())).collect();
    let total = candidates.len();

    stream::iter(candidates)
        .map(|url| {
            let opts = &opts;
            let live = &live;
            async move {
                match client.probe_with(&url, opts).await {
                    Ok(resp) if is_interesting_status(resp.status) => {
                        debug!("live {} [{}]", url, resp.status);
                        match live.lock() {
                            Ok(mut out) => out.push(url),
                            Err(poisoned) => poisoned.into_inner().push(url),
                        }
                    }
                    Ok(resp) => debug!("dropping {} [{}]", url, resp.status),
                    Err(e) => debug!("dropping {}: {}", url, e),
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect::<Vec<()>>()
        .await;

    let live = match live.into_inner() {
        Ok(v) => v,
        Err(poisoned) => poisoned.into_inner(),
    };
    info!("Live filter kept {}/{} URL(s)", live.len(), total);
    live
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_allow_list() {
        for status in [200, 201, 202, 301, 302, 403] {
            assert!(is_interesting_status(status));
        }
        for status in [204, 304, 401, 404, 500, 503] {
            assert!(!is_interesting_status(status));
        }
    }

    #[tokio::test]
    async fn test_only_allowed_statuses_survive() {
        let server = MockServer::start().await;
        for (p, status) in [("/ok", 200), ("/moved", 301), ("/missing", 404), ("/broken", 500)] {
            let mut template = ResponseTemplate::new(status);
            if status == 301 {
                template = template.insert_header("Location", "/ok");
            }
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(template)
                .mount(&server)
                .await;
        }

        let urls: Vec<String> = ["/ok", "/moved", "/missing", "/broken", "/ok"]
            .iter()
            .map(|p| format!("{}{}", server.uri(), p))
            .collect();

        let client = HttpClient::new(5, None, &[]).unwrap();
        let mut live = filter_live(&client, urls, 4).await;
        live.sort();

        let mut expected = vec![format!("{}/moved", server.uri()), format!("{}/ok", server.uri())];
        expected.sort();
        assert_eq!(live, expected);
    }

    #[tokio::test]
    async fn test_unreachable_is_dropped() {
        let client = HttpClient::new(2, None, &[]).unwrap();
        let live = filter_live(&client, vec!["http://127.0.0.1:1/".to_string()], 2).await;
        assert!(live.is_empty());
    }
}
