/// Outbound HTTP: one shared `reqwest` client plus a JSON fetch helper with
/// exponential backoff.
use std::time::Duration;

use anyhow::Context;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::AppConfig;

// Several providers serve a bot wall to non-browser user agents.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    retries: u32,
    base_delay: Duration,
}

/// A failed attempt, tagged with whether trying again could help.
struct Attempt {
    error: anyhow::Error,
    retryable: bool,
}

impl HttpClient {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.search_timeout_secs.max(1)))
            .user_agent(USER_AGENT);

        if let Some(p) = &config.proxy {
            if !p.is_empty() {
                builder = builder.proxy(reqwest::Proxy::all(p)?);
            }
        }

        Ok(HttpClient {
            client: builder.build().context("build HTTP client")?,
            retries: config.http_retries,
            base_delay: Duration::from_millis(250),
        })
    }

    #[cfg(test)]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Fetch and decode JSON once, no retries. Used by the search fan-out,
    /// where a slow site is simply dropped.
    pub async fn get_json_once<T, F>(&self, build: F) -> anyhow::Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        self.get_json_with_retry(build, 0).await
    }

    /// Fetch and decode JSON using the configured retry budget.
    pub async fn get_json<T, F>(&self, build: F) -> anyhow::Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        self.get_json_with_retry(build, self.retries).await
    }

    /// Transport errors, 429 and 5xx are retried after `base * 2^n`; any
    /// other non-2xx status or a malformed body fails immediately.
    pub async fn get_json_with_retry<T, F>(&self, build: F, retries: u32) -> anyhow::Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            match try_once(build(&self.client)).await {
                Ok(v) => return Ok(v),
                Err(a) if a.retryable && attempt < retries => {
                    let delay = self.base_delay * 2u32.pow(attempt);
                    attempt += 1;
                    warn!(
                        "Request attempt {attempt}/{retries} failed, retrying in {delay:?}: {:#}",
                        a.error
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(a) => return Err(a.error),
            }
        }
    }
}

async fn try_once<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, Attempt> {
    let resp = req.send().await.map_err(|e| Attempt {
        error: anyhow::Error::new(e).context("HTTP request"),
        retryable: true,
    })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(Attempt {
            error: anyhow::anyhow!("upstream returned HTTP {status}"),
            retryable: is_retryable_status(status),
        });
    }

    // Many providers send JSON as text/html, so decode from text.
    let body = resp.text().await.map_err(|e| Attempt {
        error: anyhow::Error::new(e).context("read response body"),
        retryable: true,
    })?;
    debug!("Upstream JSON: {} bytes", body.len());

    serde_json::from_str(&body).map_err(|e| Attempt {
        error: anyhow::Error::new(e).context("decode upstream JSON"),
        retryable: false,
    })
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
