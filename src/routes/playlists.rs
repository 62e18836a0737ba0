use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    auth::AuthUser,
    db::Db,
    error::{AppError, Result},
    models::{Playlist, PlaylistItem, split_record_key},
    state::AppState,
};

const MAX_NAME_LEN: usize = 100;

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("playlist name cannot be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "playlist name is limited to {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Load a playlist owned by `user_id`, items included. Other users' lists
/// are reported as missing.
async fn load_playlist(db: &Db, user_id: &str, id: &str) -> Result<Playlist> {
    let playlist: Option<Playlist> = sqlx::query_as(
        "SELECT id, name, created_at, updated_at FROM playlists WHERE id=? AND user_id=?",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    let mut playlist = playlist.ok_or(AppError::NotFound)?;
    playlist.items = load_items(db, &playlist.id).await?;
    Ok(playlist)
}

async fn load_items(db: &Db, playlist_id: &str) -> Result<Vec<PlaylistItem>, sqlx::Error> {
    sqlx::query_as(
        "SELECT key, title, cover, position, added_at FROM playlist_items \
         WHERE playlist_id=? ORDER BY position",
    )
    .bind(playlist_id)
    .fetch_all(db)
    .await
}

/// GET /api/playlists
pub async fn list_playlists(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Playlist>>> {
    let mut playlists: Vec<Playlist> = sqlx::query_as(
        "SELECT id, name, created_at, updated_at FROM playlists \
         WHERE user_id=? ORDER BY created_at, name",
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    for p in &mut playlists {
        p.items = load_items(&state.db, &p.id).await?;
    }
    Ok(Json(playlists))
}

#[derive(Deserialize)]
pub struct PlaylistNameRequest {
    pub name: String,
}

/// POST /api/playlists
pub async fn create_playlist(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<PlaylistNameRequest>,
) -> Result<(StatusCode, Json<Playlist>)> {
    let name = validate_name(&req.name)?;
    let id = Playlist::new_id();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO playlists (id, user_id, name, created_at, updated_at) VALUES (?,?,?,?,?)",
    )
    .bind(&id)
    .bind(&user.id)
    .bind(&name)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let playlist = load_playlist(&state.db, &user.id, &id).await?;
    Ok((StatusCode::CREATED, Json(playlist)))
}

/// GET /api/playlists/{id}
pub async fn get_playlist(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Playlist>> {
    load_playlist(&state.db, &user.id, &id).await.map(Json)
}

/// PUT /api/playlists/{id}: rename
pub async fn rename_playlist(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PlaylistNameRequest>,
) -> Result<Json<Playlist>> {
    let name = validate_name(&req.name)?;
    let res = sqlx::query("UPDATE playlists SET name=?, updated_at=? WHERE id=? AND user_id=?")
        .bind(&name)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&id)
        .bind(&user.id)
        .execute(&state.db)
        .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    load_playlist(&state.db, &user.id, &id).await.map(Json)
}

/// DELETE /api/playlists/{id}
pub async fn delete_playlist(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let res = sqlx::query("DELETE FROM playlists WHERE id=? AND user_id=?")
        .bind(&id)
        .bind(&user.id)
        .execute(&state.db)
        .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub cover: String,
}

/// POST /api/playlists/{id}/items: append
pub async fn add_item(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<Playlist>)> {
    if split_record_key(&req.key).is_none() {
        return Err(AppError::BadRequest("key must look like source+id".into()));
    }
    if req.title.trim().is_empty() {
        return Err(AppError::BadRequest("title cannot be empty".into()));
    }
    let playlist = load_playlist(&state.db, &user.id, &id).await?;
    if playlist.items.iter().any(|i| i.key == req.key) {
        return Err(AppError::Conflict(format!(
            "{} is already in this playlist",
            req.key
        )));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let mut tx = state.db.begin().await?;
    sqlx::query(
        "INSERT INTO playlist_items (playlist_id, key, title, cover, position, added_at) \
         VALUES (?,?,?,?,?,?)",
    )
    .bind(&id)
    .bind(&req.key)
    .bind(req.title.trim())
    .bind(&req.cover)
    .bind(playlist.items.len() as i64)
    .bind(&now)
    .execute(&mut *tx)
    .await?;
    sqlx::query("UPDATE playlists SET updated_at=? WHERE id=?")
        .bind(&now)
        .bind(&id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    let playlist = load_playlist(&state.db, &user.id, &id).await?;
    Ok((StatusCode::CREATED, Json(playlist)))
}

#[derive(Deserialize)]
pub struct RemoveItemQuery {
    pub key: String,
}

/// DELETE /api/playlists/{id}/items?key=...: positions are renumbered 0..n
pub async fn remove_item(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<RemoveItemQuery>,
) -> Result<Json<Playlist>> {
    let playlist = load_playlist(&state.db, &user.id, &id).await?;
    if !playlist.items.iter().any(|i| i.key == q.key) {
        return Err(AppError::NotFound);
    }

    let mut tx = state.db.begin().await?;
    sqlx::query("DELETE FROM playlist_items WHERE playlist_id=? AND key=?")
        .bind(&id)
        .bind(&q.key)
        .execute(&mut *tx)
        .await?;
    let remaining = playlist.items.iter().filter(|i| i.key != q.key);
    for (position, item) in remaining.enumerate() {
        sqlx::query("UPDATE playlist_items SET position=? WHERE playlist_id=? AND key=?")
            .bind(position as i64)
            .bind(&id)
            .bind(&item.key)
            .execute(&mut *tx)
            .await?;
    }
    sqlx::query("UPDATE playlists SET updated_at=? WHERE id=?")
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    load_playlist(&state.db, &user.id, &id).await.map(Json)
}
