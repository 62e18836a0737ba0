/// Registry of searchable API sites.
///
/// Sites come from a JSON config (remote CONFIGJSON store first, local file
/// as fallback) and are mirrored into the `api_sites` table, where admins
/// can disable them or add custom ones.
use std::collections::{BTreeMap, BTreeSet};

use anyhow::Context;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{config::AppConfig, db::Db, http::HttpClient, models::ApiSite, state::AppState};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub cache_time: Option<u64>,
    #[serde(default)]
    pub api_site: BTreeMap<String, SiteEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    pub api: String,
    pub name: String,
    #[serde(default)]
    pub detail: Option<String>,
}

pub fn parse_site_config(text: &str) -> anyhow::Result<SiteConfig> {
    let cfg: SiteConfig = serde_json::from_str(text).context("parse site config")?;
    for (key, site) in &cfg.api_site {
        if key.contains('+') {
            anyhow::bail!("site key '{key}' must not contain '+'");
        }
        if !site.api.starts_with("http://") && !site.api.starts_with("https://") {
            anyhow::bail!("site '{key}' has a non-http api URL");
        }
    }
    Ok(cfg)
}

/// Load the site config: remote CONFIGJSON store if configured, then the
/// local file. A missing local file means no configured sites.
pub async fn load_site_config(http: &HttpClient, config: &AppConfig) -> anyhow::Result<SiteConfig> {
    if let Some(base) = config.config_json.as_deref().filter(|b| !b.is_empty()) {
        let url = format!("{}/config.json", base.trim_end_matches('/'));
        match http.get_json::<serde_json::Value, _>(|c| c.get(&url)).await {
            Ok(v) => match parse_site_config(&v.to_string()) {
                Ok(cfg) => {
                    info!("Loaded {} site(s) from {url}", cfg.api_site.len());
                    return Ok(cfg);
                }
                Err(e) => warn!("Remote site config at {url} is invalid: {e:#}"),
            },
            Err(e) => warn!("Could not fetch remote site config {url}: {e:#}"),
        }
    }

    match tokio::fs::read_to_string(&config.config_file).await {
        Ok(text) => parse_site_config(&text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                "Site config {} not found, starting with no configured sites",
                config.config_file
            );
            Ok(SiteConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("read {}", config.config_file)),
    }
}

/// Mirror configured sites into the database. Keeps each site's `disabled`
/// flag, removes config sites that disappeared, never touches custom sites.
/// A config key that collides with a custom site is skipped.
pub async fn sync_config_sites(db: &Db, cfg: &SiteConfig) -> anyhow::Result<usize> {
    let mut tx = db.begin().await?;

    let custom: Vec<(String,)> = sqlx::query_as("SELECT key FROM api_sites WHERE from_config=0")
        .fetch_all(&mut *tx)
        .await?;
    let custom: BTreeSet<String> = custom.into_iter().map(|(k,)| k).collect();

    let mut synced = 0;
    for (key, site) in &cfg.api_site {
        if custom.contains(key) {
            warn!("Configured site '{key}' clashes with a custom site, skipping");
            continue;
        }
        sqlx::query(
            "INSERT INTO api_sites (key, api, name, detail, from_config) VALUES (?, ?, ?, ?, 1) \
             ON CONFLICT(key) DO UPDATE SET api=excluded.api, name=excluded.name, \
             detail=excluded.detail WHERE api_sites.from_config=1",
        )
        .bind(key)
        .bind(&site.api)
        .bind(&site.name)
        .bind(&site.detail)
        .execute(&mut *tx)
        .await?;
        synced += 1;
    }

    let stored: Vec<(String,)> = sqlx::query_as("SELECT key FROM api_sites WHERE from_config=1")
        .fetch_all(&mut *tx)
        .await?;
    for (key,) in stored {
        if !cfg.api_site.contains_key(&key) {
            info!("Site '{key}' no longer configured, removing");
            sqlx::query("DELETE FROM api_sites WHERE key=? AND from_config=1")
                .bind(&key)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;
    Ok(synced)
}

/// Load and mirror the site config, logging instead of failing. The file's
/// `cache_time`, when present, becomes the metadata cache lifetime.
pub async fn refresh(state: &AppState) {
    let cfg = match load_site_config(&state.http, &state.config).await {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Failed to load site config: {e:#}");
            return;
        }
    };
    state
        .cache
        .set_ttl(cfg.cache_time.unwrap_or(state.config.cache_time));
    match sync_config_sites(&state.db, &cfg).await {
        Ok(n) => info!("Site registry refreshed ({n} configured site(s))"),
        Err(e) => warn!("Failed to store site config: {e:#}"),
    }
}

pub async fn enabled_sites(db: &Db) -> Result<Vec<ApiSite>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM api_sites WHERE disabled=0 ORDER BY name, key")
        .fetch_all(db)
        .await
}

pub async fn find_site(db: &Db, key: &str) -> Result<Option<ApiSite>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM api_sites WHERE key=?")
        .bind(key)
        .fetch_optional(db)
        .await
}
