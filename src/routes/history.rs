use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    auth::AuthUser,
    db::Db,
    error::{AppError, Result},
    models::{SyncEvent, now_millis},
    state::AppState,
};

/// Maximum entries kept per user.
pub const HISTORY_LIMIT: i64 = 20;

/// Move `keyword` to the front of the user's history, trimming old entries.
pub async fn record_keyword(db: &Db, user_id: &str, keyword: &str) -> Result<(), sqlx::Error> {
    let mut tx = db.begin().await?;

    // Strictly increasing timestamps keep the order stable within one millisecond.
    let (latest,): (i64,) =
        sqlx::query_as("SELECT COALESCE(MAX(created_at), 0) FROM search_history WHERE user_id=?")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
    let ts = now_millis().max(latest + 1);

    sqlx::query(
        "INSERT INTO search_history (user_id, keyword, created_at) VALUES (?, ?, ?) \
         ON CONFLICT(user_id, keyword) DO UPDATE SET created_at=excluded.created_at",
    )
    .bind(user_id)
    .bind(keyword)
    .bind(ts)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "DELETE FROM search_history WHERE user_id=? AND keyword NOT IN \
         (SELECT keyword FROM search_history WHERE user_id=? ORDER BY created_at DESC LIMIT ?)",
    )
    .bind(user_id)
    .bind(user_id)
    .bind(HISTORY_LIMIT)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

/// GET /api/searchhistory: newest first
pub async fn list_history(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT keyword FROM search_history WHERE user_id=? ORDER BY created_at DESC LIMIT ?",
    )
    .bind(&user.id)
    .bind(HISTORY_LIMIT)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows.into_iter().map(|(k,)| k).collect()))
}

#[derive(Deserialize)]
pub struct AddKeywordRequest {
    pub keyword: String,
}

/// POST /api/searchhistory
pub async fn add_history(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<AddKeywordRequest>,
) -> Result<StatusCode> {
    let keyword = req.keyword.trim();
    if keyword.is_empty() {
        return Err(AppError::BadRequest("keyword cannot be empty".into()));
    }
    record_keyword(&state.db, &user.id, keyword).await?;
    state.notify(&user.id, SyncEvent::SearchHistoryChanged);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct DeleteKeywordQuery {
    pub keyword: Option<String>,
}

/// DELETE /api/searchhistory?keyword=...: one keyword, or everything
pub async fn delete_history(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(q): Query<DeleteKeywordQuery>,
) -> Result<StatusCode> {
    match q.keyword.as_deref().map(str::trim) {
        Some(keyword) => {
            sqlx::query("DELETE FROM search_history WHERE user_id=? AND keyword=?")
                .bind(&user.id)
                .bind(keyword)
                .execute(&state.db)
                .await?;
        }
        None => {
            sqlx::query("DELETE FROM search_history WHERE user_id=?")
                .bind(&user.id)
                .execute(&state.db)
                .await?;
        }
    }
    state.notify(&user.id, SyncEvent::SearchHistoryChanged);
    Ok(StatusCode::NO_CONTENT)
}
