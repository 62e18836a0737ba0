use axum::{
    Json,
    body::Body,
    extract::{Query, State},
    http::{StatusCode, header},
    response::Response,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    metadata::{
        MediaCard, douban, tmdb,
        wmdb::{self, WmdbInfo},
        youtube::{self, YoutubeVideo},
    },
    routes::settings,
    state::AppState,
};

#[derive(Serialize)]
pub struct DoubanResponse {
    pub code: u16,
    pub message: String,
    pub list: Vec<MediaCard>,
}

fn douban_kind(kind: &str) -> Result<&'static str> {
    match kind {
        "movie" => Ok("movie"),
        "tv" => Ok("tv"),
        other => Err(AppError::BadRequest(format!(
            "type must be movie or tv, got '{other}'"
        ))),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoubanQuery {
    pub r#type: String,
    pub tag: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub page_start: u32,
}

fn default_page_size() -> u32 {
    16
}

/// GET /api/douban?type=movie|tv&tag=...&pageSize=..&pageStart=..
pub async fn douban_by_tag(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(q): Query<DoubanQuery>,
) -> Result<Json<DoubanResponse>> {
    let kind = douban_kind(&q.r#type)?;
    if q.tag.trim().is_empty() {
        return Err(AppError::BadRequest("tag is required".into()));
    }
    let page_limit = q.page_size.clamp(1, 100);

    let key = format!("douban:tag:{kind}:{}:{page_limit}:{}", q.tag, q.page_start);
    let list = state
        .cache
        .get_or_fetch(
            key,
            douban::by_tag(
                &state.http,
                douban::TagQuery {
                    kind,
                    tag: q.tag.trim(),
                    page_limit,
                    page_start: q.page_start,
                },
            ),
        )
        .await
        .map_err(|e| AppError::Upstream(format!("douban: {e:#}")))?;

    Ok(Json(DoubanResponse {
        code: 200,
        message: "获取成功".to_string(),
        list,
    }))
}

#[derive(Deserialize)]
pub struct CategoryQuery {
    pub kind: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_category_type")]
    pub r#type: String,
    #[serde(default = "default_page_size")]
    pub limit: u32,
    #[serde(default)]
    pub start: u32,
}

fn default_category() -> String {
    "热门".to_string()
}
fn default_category_type() -> String {
    "全部".to_string()
}

/// GET /api/douban/categories?kind=movie|tv&category=..&type=..&limit=..&start=..
pub async fn douban_categories(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(q): Query<CategoryQuery>,
) -> Result<Json<DoubanResponse>> {
    let kind = douban_kind(&q.kind)?;
    let limit = q.limit.clamp(1, 100);

    let key = format!(
        "douban:hot:{kind}:{}:{}:{limit}:{}",
        q.category, q.r#type, q.start
    );
    let list = state
        .cache
        .get_or_fetch(
            key,
            douban::recent_hot(
                &state.http,
                douban::CategoryQuery {
                    kind,
                    category: &q.category,
                    r#type: &q.r#type,
                    limit,
                    start: q.start,
                },
            ),
        )
        .await
        .map_err(|e| AppError::Upstream(format!("douban: {e:#}")))?;

    Ok(Json(DoubanResponse {
        code: 200,
        message: "获取成功".to_string(),
        list,
    }))
}

#[derive(Deserialize)]
pub struct WmdbQuery {
    pub douban_id: String,
}

/// GET /api/wmdb?douban_id=...: Douban → IMDb cross-reference
pub async fn wmdb_lookup(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(q): Query<WmdbQuery>,
) -> Result<Json<WmdbInfo>> {
    let id = q.douban_id.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest("douban_id must be numeric".into()));
    }
    let info: WmdbInfo = state
        .cache
        .get_or_fetch(format!("wmdb:{id}"), wmdb::lookup(&state.http, id))
        .await
        .map_err(|e| AppError::Upstream(format!("wmdb: {e:#}")))?;
    Ok(Json(info))
}

#[derive(Deserialize)]
pub struct TrendingQuery {
    #[serde(default = "default_media")]
    pub media: String,
    #[serde(default = "default_window")]
    pub window: String,
    #[serde(default)]
    pub language: Option<String>,
}

fn default_media() -> String {
    "movie".to_string()
}
fn default_window() -> String {
    "week".to_string()
}

/// GET /api/tmdb/trending?media=movie|tv&window=day|week
pub async fn tmdb_trending(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(q): Query<TrendingQuery>,
) -> Result<Json<Vec<MediaCard>>> {
    let api_key = state
        .config
        .tmdb_api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::Unavailable("TMDB API key is not configured".into()))?;
    if !matches!(q.media.as_str(), "movie" | "tv") {
        return Err(AppError::BadRequest("media must be movie or tv".into()));
    }
    if !matches!(q.window.as_str(), "day" | "week") {
        return Err(AppError::BadRequest("window must be day or week".into()));
    }
    let language = q.language.as_deref().unwrap_or("zh-CN");

    let key = format!("tmdb:trending:{}:{}:{language}", q.media, q.window);
    let list = state
        .cache
        .get_or_fetch(
            key,
            tmdb::trending(&state.http, &api_key, &q.media, &q.window, language),
        )
        .await
        .map_err(|e| AppError::Upstream(format!("tmdb: {e:#}")))?;
    Ok(Json(list))
}

#[derive(Deserialize)]
pub struct YoutubeQuery {
    pub q: String,
    #[serde(default = "default_youtube_max")]
    pub max: u32,
}

fn default_youtube_max() -> u32 {
    10
}

/// GET /api/youtube/search?q=...&max=...
pub async fn youtube_search(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(q): Query<YoutubeQuery>,
) -> Result<Json<Vec<YoutubeVideo>>> {
    let api_key = state
        .config
        .youtube_api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::Unavailable("YouTube API key is not configured".into()))?;
    let query = q.q.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("q is required".into()));
    }
    let max = q.max.clamp(1, 50);

    let key = format!("youtube:{query}:{max}");
    let videos = state
        .cache
        .get_or_fetch(key, youtube::search(&state.http, &api_key, query, max))
        .await
        .map_err(|e| AppError::Upstream(format!("youtube: {e:#}")))?;
    Ok(Json(videos))
}

#[derive(Deserialize)]
pub struct ImageProxyQuery {
    pub url: String,
}

/// Largest image body the proxy will relay.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Douban's image CDN rejects requests without a Douban referer.
fn referer_for(host: &str) -> Option<&'static str> {
    let under = |domain: &str| {
        host == domain
            || host
                .strip_suffix(domain)
                .is_some_and(|rest| rest.ends_with('.'))
    };
    if under("doubanio.com") || under("douban.com") {
        Some("https://movie.douban.com/")
    } else {
        None
    }
}

/// GET /api/image-proxy?url=...
pub async fn image_proxy(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(q): Query<ImageProxyQuery>,
) -> Result<Response> {
    let url = reqwest::Url::parse(&q.url)
        .map_err(|_| AppError::BadRequest("invalid image URL".into()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::BadRequest("only http(s) images can be proxied".into()));
    }

    let mut req = state.http.client().get(url.clone());
    if let Some(referer) = url.host_str().and_then(referer_for) {
        req = req.header("Referer", referer);
    }
    let mut resp = req
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("image fetch: {e}")))?;
    if !resp.status().is_success() {
        return Err(AppError::Upstream(format!(
            "image host returned HTTP {}",
            resp.status()
        )));
    }

    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_string();
    if !content_type.starts_with("image/") {
        return Err(AppError::Upstream(format!(
            "not an image ({content_type})"
        )));
    }
    if resp.content_length().is_some_and(|len| len > MAX_IMAGE_BYTES) {
        return Err(AppError::Upstream("image is too large".into()));
    }

    // Content-Length may be missing or wrong, so the cap is also enforced
    // while reading.
    let mut bytes = Vec::new();
    while let Some(chunk) = resp
        .chunk()
        .await
        .map_err(|e| AppError::Upstream(format!("image body: {e}")))?
    {
        if (bytes.len() + chunk.len()) as u64 > MAX_IMAGE_BYTES {
            return Err(AppError::Upstream("image is too large".into()));
        }
        bytes.extend_from_slice(&chunk);
    }

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}

#[derive(Serialize)]
pub struct ServerConfig {
    pub site_name: String,
    pub announcement: Option<String>,
    pub enable_register: bool,
    pub version: &'static str,
}

/// GET /api/server-config: public
pub async fn server_config(State(state): State<AppState>) -> Json<ServerConfig> {
    let site_name = settings::setting_value(&state.db, settings::SITE_NAME)
        .await
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| state.config.site_name.clone());
    Json(ServerConfig {
        site_name,
        announcement: settings::setting_value(&state.db, settings::ANNOUNCEMENT).await,
        enable_register: state.config.enable_register,
        version: env!("CARGO_PKG_VERSION"),
    })
}
