use std::collections::VecDeque;

use futures::{stream, StreamExt};
use log::{debug, info};
use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::core::mutator::query_param_names;
use crate::core::SeenSet;
use crate::http::{HttpClient, ProbeOptions};

const HREF_PATTERN: &str = r#"href=["']([^"'#?]+(?:\?[^"']*)?)["']"#;

/// Lower bound on how many pages one crawl may fetch.
const MIN_PAGE_BUDGET: usize = 50;

/// A crawled URL that carried at least one query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawledEndpoint {
    pub url: String,
    pub params: Vec<String>,
}

/// Same-origin BFS from `seed`, returning at most `max_endpoints` parameterised URLs.
///
/// Each BFS level is fetched by up to `concurrency` in-flight requests and
/// fully drained before the next one starts. Fetch errors drop the branch.
pub async fn crawl(
    client: &HttpClient,
    seed: &str,
    max_endpoints: usize,
    concurrency: usize,
) -> Vec<CrawledEndpoint> {
    let mut results: Vec<CrawledEndpoint> = Vec::new();
    if max_endpoints == 0 {
        return results;
    }

    let Ok(seed_url) = Url::parse(seed) else {
        debug!("Crawler: unparseable seed {}", seed);
        return results;
    };
    let Ok(href_re) = Regex::new(HREF_PATTERN) else {
        return results;
    };

    let visited = SeenSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    let start = strip_fragment(seed_url.clone());
    visited.insert(start.clone());
    queue.push_back(start);

    let page_budget = (max_endpoints * 5).max(MIN_PAGE_BUDGET);
    let mut fetched = 0usize;
    let opts = ProbeOptions::default();

    while !queue.is_empty() && results.len() < max_endpoints && fetched < page_budget {
        let wave_size = queue.len().min(page_budget - fetched);
        let wave: Vec<String> = queue.drain(..wave_size).collect();
        fetched += wave.len();

        let pages: Vec<(Option<CrawledEndpoint>, Vec<String>)> = stream::iter(wave)
            .map(|url| {
                let opts = &opts;
                let href_re = &href_re;
                let seed_url = &seed_url;
                async move {
                    let resp = match client.probe_with(&url, opts).await {
                        Ok(r) => r,
                        Err(e) => {
                            debug!("Crawler: {} failed: {}", url, e);
                            return (None, Vec::new());
                        }
                    };
                    let endpoint = Url::parse(&url).ok().and_then(|u| {
                        let params = query_param_names(&u);
                        if params.is_empty() {
                            None
                        } else {
                            Some(CrawledEndpoint { url: url.clone(), params })
                        }
                    });
                    (endpoint, extract_links(href_re, &resp.body, seed_url))
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        for (endpoint, links) in pages {
            if let Some(ep) = endpoint {
                if results.len() < max_endpoints {
                    results.push(ep);
                }
            }
            for link in links {
                if visited.insert(link.clone()) {
                    queue.push_back(link);
                }
            }
        }
    }

    info!(
        "Crawler: {} endpoint(s) from {} page(s) on {}",
        results.len(),
        fetched,
        seed_url.host_str().unwrap_or(seed)
    );
    results
}

/// Pulls `href` targets out of a body and keeps same-origin http(s) links.
///
/// Relative links are resolved against the seed, fragments removed.
pub fn extract_links(re: &Regex, body: &str, seed: &Url) -> Vec<String> {
    let mut links = Vec::new();
    for cap in re.captures_iter(body) {
        let Some(href) = cap.get(1).map(|m| m.as_str().trim()) else {
            continue;
        };
        if href.is_empty() {
            continue;
        }
        let Ok(resolved) = seed.join(href) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        if resolved.host_str() != seed.host_str() || resolved.port_or_known_default() != seed.port_or_known_default() {
            continue;
        }
        let link = strip_fragment(resolved);
        if !links.contains(&link) {
            links.push(link);
        }
    }
    links
}

fn strip_fragment(mut url: Url) -> String {
    url.set_fragment(None);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn re() -> Regex {
        Regex::new(HREF_PATTERN).unwrap()
    }

    #[test]
    fn test_extract_links_same_origin() {
        let seed = Url::parse("https://a.test/app/").unwrap();
        let body = r##"
            <a href="/search?q=1">s</a>
            <a href='item?id=7'>i</a>
            <a href="https://b.test/x?id=1">other</a>
            <a href="https://a.test:8443/y">port</a>
            <a href="mailto:me@a.test">mail</a>
            <a href="#top">top</a>
            <a href="/search?q=1">dup</a>
        "##;
        let links = extract_links(&re(), body, &seed);
        assert_eq!(
            links,
            vec!["https://a.test/search?q=1", "https://a.test/app/item?id=7"]
        );
    }

    fn page(links: &[String]) -> String {
        links
            .iter()
            .map(|l| format!("<a href=\"{}\">x</a>", l))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn test_crawl_respects_bound() {
        let server = MockServer::start().await;
        let links: Vec<String> = (0..30).map(|i| format!("/item?id={}", i)).collect();
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page(&links)))
            .mount(&server)
            .await;

        let client = HttpClient::new(5, None, &[]).unwrap();
        for concurrency in [1, 4, 16] {
            let endpoints = crawl(&client, &format!("{}/", server.uri()), 5, concurrency).await;
            assert!(endpoints.len() <= 5);
            assert!(!endpoints.is_empty());
        }
    }

    #[tokio::test]
    async fn test_crawl_stays_on_seed_host() {
        let server = MockServer::start().await;
        let body = page(&[
            "/list?page=1".to_string(),
            "http://other.invalid/steal?id=1".to_string(),
        ]);
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/list"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page(&["/detail?id=2".to_string()])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/detail"))
            .respond_with(ResponseTemplate::new(200).set_body_string("leaf"))
            .mount(&server)
            .await;

        let seed = format!("{}/", server.uri());
        let seed_host = Url::parse(&seed).unwrap().host_str().unwrap().to_string();
        let client = HttpClient::new(5, None, &[]).unwrap();
        let endpoints = crawl(&client, &seed, 10, 4).await;

        let mut urls: Vec<&str> = endpoints.iter().map(|e| e.url.as_str()).collect();
        urls.sort();
        assert_eq!(
            urls,
            vec![
                format!("{}/detail?id=2", server.uri()).as_str(),
                format!("{}/list?page=1", server.uri()).as_str(),
            ]
        );
        for ep in &endpoints {
            assert_eq!(Url::parse(&ep.url).unwrap().host_str(), Some(seed_host.as_str()));
        }
    }

    #[tokio::test]
    async fn test_crawl_unreachable_seed_is_empty() {
        let client = HttpClient::new(2, None, &[]).unwrap();
        assert!(crawl(&client, "http://127.0.0.1:1/", 10, 2).await.is_empty());
    }
}
