/// Third-party metadata lookups (Douban, WMDB, TMDB, YouTube).
///
/// Each provider is a thin JSON client plus a pure parser. Responses are
/// cached in memory for `cache_time` seconds, keyed by request.
pub mod douban;
pub mod tmdb;
pub mod wmdb;
pub mod youtube;

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use moka::future::Cache;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, info};

/// A browsable title card shared by the Douban and TMDB endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MediaCard {
    pub id: String,
    pub title: String,
    pub poster: String,
    pub rate: String,
    pub year: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Entries carry their insertion time so the lifetime can change at runtime
/// (the site config file may set `cache_time`).
#[derive(Clone)]
pub struct MetaCache {
    inner: Cache<String, (Instant, Value)>,
    ttl_secs: Arc<AtomicU64>,
}

impl std::fmt::Debug for MetaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaCache")
            .field("entries", &self.inner.entry_count())
            .field("ttl_secs", &self.ttl())
            .finish()
    }
}

impl MetaCache {
    pub fn new(ttl_secs: u64) -> Self {
        MetaCache {
            inner: Cache::builder().max_capacity(10_000).build(),
            ttl_secs: Arc::new(AtomicU64::new(ttl_secs)),
        }
    }

    pub fn ttl(&self) -> u64 {
        self.ttl_secs.load(Ordering::Relaxed)
    }

    pub fn set_ttl(&self, ttl_secs: u64) {
        let old = self.ttl_secs.swap(ttl_secs, Ordering::Relaxed);
        if old != ttl_secs {
            info!("Metadata cache lifetime is now {ttl_secs}s");
        }
    }

    /// Return the cached value for `key`, or run `fetch` and cache a success.
    /// Failures are never cached.
    pub async fn get_or_fetch<T, Fut>(&self, key: String, fetch: Fut) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let ttl = Duration::from_secs(self.ttl());
        if let Some((stored_at, v)) = self.inner.get(&key).await {
            if stored_at.elapsed() < ttl {
                if let Ok(hit) = serde_json::from_value(v) {
                    debug!("Metadata cache hit: {key}");
                    return Ok(hit);
                }
            }
        }
        let fresh = fetch.await?;
        self.inner
            .insert(key, (Instant::now(), serde_json::to_value(&fresh)?))
            .await;
        Ok(fresh)
    }
}

/// Extract the first 4-digit year from free text ("2024 / 中国大陆 / 剧情").
pub(crate) fn find_year(s: &str) -> Option<String> {
    static RE: once_cell::sync::Lazy<regex::Regex> =
        once_cell::sync::Lazy::new(|| regex::Regex::new(r"(?:19|20)\d{2}").unwrap());
    RE.find(s).map(|m| m.as_str().to_string())
}

/// Read a JSON value that providers send either as a string or a number.
pub(crate) fn loose_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}
