use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    auth::AdminUser,
    error::{AppError, Result},
    models::ApiSite,
    sites::find_site,
    state::AppState,
};

/// GET /api/admin/sites: every site, disabled ones included
pub async fn list_sites(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ApiSite>>> {
    let sites: Vec<ApiSite> = sqlx::query_as("SELECT * FROM api_sites ORDER BY name, key")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(sites))
}

#[derive(Debug, Deserialize)]
pub struct AddSiteRequest {
    pub key: String,
    pub api: String,
    pub name: String,
    #[serde(default)]
    pub detail: Option<String>,
}

/// POST /api/admin/sites: add a custom site
pub async fn add_site(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<AddSiteRequest>,
) -> Result<(StatusCode, Json<ApiSite>)> {
    let key = req.key.trim();
    if key.is_empty() || key.contains('+') {
        return Err(AppError::BadRequest(
            "site key must be non-empty and must not contain '+'".into(),
        ));
    }
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("site name cannot be empty".into()));
    }
    if !req.api.starts_with("http://") && !req.api.starts_with("https://") {
        return Err(AppError::BadRequest("api must be an http(s) URL".into()));
    }
    if find_site(&state.db, key).await?.is_some() {
        return Err(AppError::Conflict(format!("site '{key}' already exists")));
    }

    sqlx::query("INSERT INTO api_sites (key, api, name, detail, from_config) VALUES (?,?,?,?,0)")
        .bind(key)
        .bind(req.api.trim())
        .bind(req.name.trim())
        .bind(&req.detail)
        .execute(&state.db)
        .await?;
    tracing::info!("{} added site '{key}'", admin.username);

    let site = find_site(&state.db, key).await?.ok_or(AppError::NotFound)?;
    Ok((StatusCode::CREATED, Json(site)))
}

#[derive(Debug, Deserialize)]
pub struct ToggleSiteRequest {
    pub disabled: bool,
}

/// PUT /api/admin/sites/{key}: enable / disable
pub async fn toggle_site(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<ToggleSiteRequest>,
) -> Result<Json<ApiSite>> {
    let res = sqlx::query("UPDATE api_sites SET disabled=? WHERE key=?")
        .bind(req.disabled)
        .bind(&key)
        .execute(&state.db)
        .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    find_site(&state.db, &key)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// DELETE /api/admin/sites/{key}: custom sites only
pub async fn delete_site(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode> {
    let site = find_site(&state.db, &key).await?.ok_or(AppError::NotFound)?;
    if site.from_config {
        return Err(AppError::BadRequest(
            "configured sites can only be disabled".into(),
        ));
    }
    sqlx::query("DELETE FROM api_sites WHERE key=?")
        .bind(&key)
        .execute(&state.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
