use log::debug;
use rand::prelude::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, LOCATION, USER_AGENT};
use reqwest::{redirect, Client, ClientBuilder, Proxy, Response};
use std::time::Duration;

use super::{ProbeOptions, ProbeResponse};

const MAX_REDIRECTS: usize = 5;

pub struct HttpClient {
    inner: Client,
    no_redirect: Client,
    user_agents: Vec<&'static str>,
    default_timeout: Duration,
    default_headers: HeaderMap,
}

impl HttpClient {
    pub fn new(
        timeout_seconds: u64,
        proxy_url: Option<&str>,
        custom_headers: &[(String, String)],
    ) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(timeout_seconds.max(1));

        let inner = base_builder(timeout, proxy_url)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        let no_redirect = base_builder(timeout, proxy_url)
            .redirect(redirect::Policy::none())
            .build()?;

        let mut default_headers = HeaderMap::new();
        for (key, val) in custom_headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(val),
            ) {
                default_headers.insert(name, value);
            }
        }

        let user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) \
             Gecko/20100101 Firefox/120.0",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_0) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        ];

        Ok(Self {
            inner,
            no_redirect,
            user_agents,
            default_timeout: timeout,
            default_headers,
        })
    }

    /// Single GET with client defaults.
    pub async fn probe(&self, url: &str) -> Result<ProbeResponse, reqwest::Error> {
        self.probe_with(url, &ProbeOptions::default()).await
    }

    /// Single bounded-timeout GET returning status, headers and a capped body sample.
    pub async fn probe_with(
        &self,
        url: &str,
        opts: &ProbeOptions,
    ) -> Result<ProbeResponse, reqwest::Error> {
        let client = if opts.follow_redirects { &self.inner } else { &self.no_redirect };

        let ua = opts
            .user_agent
            .as_deref()
            .unwrap_or_else(|| self.get_random_user_agent());

        let mut req = client
            .get(url)
            .header(USER_AGENT, ua)
            .timeout(opts.timeout.unwrap_or(self.default_timeout));

        for (name, value) in self.default_headers.iter() {
            req = req.header(name, value);
        }
        for (name, value) in &opts.extra_headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let response = req.send().await?;
        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let location = headers
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = read_body_capped(response, opts.body_limit).await?;
        debug!("GET {} -> {} ({} bytes)", url, status, body.len());

        Ok(ProbeResponse {
            url: final_url,
            status,
            headers,
            body,
            location,
        })
    }

    fn get_random_user_agent(&self) -> &'static str {
        let mut rng = rand::rng();
        *self.user_agents.choose(&mut rng).unwrap_or(&"Mozilla/5.0")
    }
}

fn base_builder(timeout: Duration, proxy_url: Option<&str>) -> ClientBuilder {
    let mut builder = ClientBuilder::new()
        .timeout(timeout)
        .danger_accept_invalid_certs(true);

    if let Some(proxy) = proxy_url {
        if let Ok(p) = Proxy::all(proxy) {
            builder = builder.proxy(p);
        }
    }
    builder
}

/// Reads at most `limit` bytes of the body, stopping early once the cap is hit.
async fn read_body_capped(mut response: Response, limit: usize) -> Result<String, reqwest::Error> {
    let mut buf: Vec<u8> = Vec::new();
    while buf.len() < limit {
        match response.chunk().await? {
            Some(chunk) => {
                let take = (limit - buf.len()).min(chunk.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            None => break,
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
