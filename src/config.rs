use anyhow::Context;
use serde::Deserialize;

/// Application configuration, loaded from environment variables / .env file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Bind address for the HTTP server.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Path to the SQLite database file.
    #[serde(default = "default_db_url")]
    pub database_url: String,

    /// Secret used for signing auth tokens.
    #[serde(default = "default_secret")]
    pub secret: String,

    /// Owner account username (only used on first launch).
    #[serde(default = "default_admin_user")]
    pub admin_username: String,

    /// Owner account password (only used on first launch).
    #[serde(default = "default_admin_pass")]
    pub admin_password: String,

    /// Display name returned by /api/server-config.
    #[serde(default = "default_site_name")]
    pub site_name: String,

    /// Allow self-service account creation via /api/register.
    #[serde(default)]
    pub enable_register: bool,

    /// Local JSON file listing the API sites to search.
    #[serde(default = "default_config_file")]
    pub config_file: String,

    /// Base URL of a remote config store (CONFIGJSON). When set, the site
    /// list is fetched from `<config_json>/config.json` before falling back
    /// to `config_file`.
    #[serde(default)]
    pub config_json: Option<String>,

    /// Maximum number of result pages fetched per API site.
    #[serde(default = "default_search_max_page")]
    pub search_max_page: u32,

    /// Per-site timeout for a search, in seconds.
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,

    /// How long third-party metadata responses are cached, in seconds.
    #[serde(default = "default_cache_time")]
    pub cache_time: u64,

    #[serde(default)]
    pub tmdb_api_key: Option<String>,

    #[serde(default)]
    pub youtube_api_key: Option<String>,

    /// Optional HTTP proxy used for all outbound requests.
    #[serde(default)]
    pub proxy: Option<String>,

    /// Retries for metadata fetches. Each retry waits 2^n * 250ms.
    #[serde(default = "default_http_retries")]
    pub http_retries: u32,

    /// Directory holding the compiled front end.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}
fn default_db_url() -> String {
    "/data/esmeetv.db".to_string()
}
fn default_secret() -> String {
    "change-me-in-production".to_string()
}
fn default_admin_user() -> String {
    "admin".to_string()
}
fn default_admin_pass() -> String {
    "changeme".to_string()
}
fn default_site_name() -> String {
    "EsmeeTV".to_string()
}
fn default_config_file() -> String {
    "/data/config.json".to_string()
}
fn default_search_max_page() -> u32 {
    5
}
fn default_search_timeout() -> u64 {
    20
}
fn default_cache_time() -> u64 {
    7200
}
fn default_http_retries() -> u32 {
    2
}
fn default_static_dir() -> String {
    "/app/ui/dist".to_string()
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env if present (it may not exist)
        let _ = dotenvy::dotenv();

        envy::from_env::<AppConfig>().context("Failed to load config from environment")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind: default_bind(),
            database_url: default_db_url(),
            secret: default_secret(),
            admin_username: default_admin_user(),
            admin_password: default_admin_pass(),
            site_name: default_site_name(),
            enable_register: false,
            config_file: default_config_file(),
            config_json: None,
            search_max_page: default_search_max_page(),
            search_timeout_secs: default_search_timeout(),
            cache_time: default_cache_time(),
            tmdb_api_key: None,
            youtube_api_key: None,
            proxy: None,
            http_retries: default_http_retries(),
            static_dir: default_static_dir(),
        }
    }
}
