use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    auth::AdminUser,
    db::Db,
    error::{AppError, Result},
    models::Setting,
    state::AppState,
};

/// Keys admins may set at runtime. Each overrides the matching config value.
pub const SITE_NAME: &str = "site_name";
pub const ANNOUNCEMENT: &str = "announcement";
pub const SEARCH_MAX_PAGE: &str = "search_max_page";

const KNOWN_SETTINGS: [&str; 3] = [SITE_NAME, ANNOUNCEMENT, SEARCH_MAX_PAGE];

fn validate_setting(key: &str, value: &str) -> Result<()> {
    if !KNOWN_SETTINGS.contains(&key) {
        return Err(AppError::BadRequest(format!("unknown setting '{key}'")));
    }
    if key == SEARCH_MAX_PAGE && !matches!(value.parse::<u32>(), Ok(1..=50)) {
        return Err(AppError::BadRequest(
            "search_max_page must be between 1 and 50".into(),
        ));
    }
    Ok(())
}

/// Read one setting; a lookup failure counts as unset.
pub async fn setting_value(db: &Db, key: &str) -> Option<String> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key=?")
        .bind(key)
        .fetch_optional(db)
        .await
        .unwrap_or(None);
    row.map(|(v,)| v)
}

/// Pages fetched per site: runtime setting, else config.
pub async fn effective_max_page(state: &AppState) -> u32 {
    setting_value(&state.db, SEARCH_MAX_PAGE)
        .await
        .and_then(|v| v.parse().ok())
        .unwrap_or(state.config.search_max_page)
}

async fn upsert<'e, E>(executor: E, key: &str, value: &str) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?) \
         ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at",
    )
    .bind(key)
    .bind(value)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(executor)
    .await?;
    Ok(())
}

/// GET /api/settings
pub async fn list_settings(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Setting>>> {
    let settings: Vec<Setting> = sqlx::query_as("SELECT * FROM settings ORDER BY key")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(settings))
}

/// GET /api/settings/{key}
pub async fn get_setting(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Setting>> {
    let setting: Option<Setting> = sqlx::query_as("SELECT * FROM settings WHERE key=?")
        .bind(&key)
        .fetch_optional(&state.db)
        .await?;

    setting.map(Json).ok_or(AppError::NotFound)
}

#[derive(Debug, Deserialize)]
pub struct SetSettingRequest {
    pub value: String,
}

/// PUT /api/settings/{key}
pub async fn set_setting(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetSettingRequest>,
) -> Result<Json<Setting>> {
    validate_setting(&key, &req.value)?;
    upsert(&state.db, &key, &req.value).await?;
    tracing::info!("Setting '{key}' changed by {}", admin.username);

    let setting: Setting = sqlx::query_as("SELECT * FROM settings WHERE key=?")
        .bind(&key)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(setting))
}

/// PATCH /api/settings: bulk update, all or nothing
pub async fn bulk_update_settings(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(updates): Json<HashMap<String, String>>,
) -> Result<StatusCode> {
    for (key, value) in &updates {
        validate_setting(key, value)?;
    }
    let mut tx = state.db.begin().await?;
    for (key, value) in &updates {
        upsert(&mut *tx, key, value).await?;
    }
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}
