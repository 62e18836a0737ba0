use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;
use sqlx::FromRow;

use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    identity,
    models::{Favorite, SyncEvent, now_millis, split_record_key},
    routes::playrecords::KeyQuery,
    state::AppState,
};

#[derive(FromRow)]
struct StoredFavorite {
    key: String,
    #[sqlx(flatten)]
    favorite: Favorite,
}

/// GET /api/favorites: map of `source+id` → favorite
/// GET /api/favorites?key=...: one favorite or `null`
pub async fn get_favorites(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(q): Query<KeyQuery>,
) -> Result<Json<Value>> {
    if let Some(key) = &q.key {
        let fav: Option<StoredFavorite> =
            sqlx::query_as("SELECT * FROM favorites WHERE user_id=? AND key=?")
                .bind(&user.id)
                .bind(key)
                .fetch_optional(&state.db)
                .await?;
        return Ok(Json(serde_json::to_value(fav.map(|f| f.favorite)).map_err(anyhow::Error::from)?));
    }

    let rows: Vec<StoredFavorite> =
        sqlx::query_as("SELECT * FROM favorites WHERE user_id=? ORDER BY save_time DESC")
            .bind(&user.id)
            .fetch_all(&state.db)
            .await?;
    let map: BTreeMap<String, Favorite> = rows.into_iter().map(|r| (r.key, r.favorite)).collect();
    Ok(Json(serde_json::to_value(map).map_err(anyhow::Error::from)?))
}

#[derive(Debug, Deserialize)]
pub struct SaveFavoriteRequest {
    pub key: String,
    pub favorite: Favorite,
}

/// POST /api/favorites: upsert; older favorites of the same title are dropped
pub async fn save_favorite(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SaveFavoriteRequest>,
) -> Result<Json<Favorite>> {
    if split_record_key(&req.key).is_none() {
        return Err(AppError::BadRequest("key must look like source+id".into()));
    }
    if req.favorite.title.trim().is_empty() {
        return Err(AppError::BadRequest("title cannot be empty".into()));
    }

    let mut favorite = req.favorite;
    if favorite.save_time <= 0 {
        favorite.save_time = now_millis();
    }

    let others: Vec<StoredFavorite> =
        sqlx::query_as("SELECT * FROM favorites WHERE user_id=? AND key<>?")
            .bind(&user.id)
            .bind(&req.key)
            .fetch_all(&state.db)
            .await?;
    let stale: Vec<String> = others
        .into_iter()
        .filter(|o| identity::overlaps(&o.favorite, &favorite))
        .map(|o| o.key)
        .collect();

    let mut tx = state.db.begin().await?;
    for key in &stale {
        sqlx::query("DELETE FROM favorites WHERE user_id=? AND key=?")
            .bind(&user.id)
            .bind(key)
            .execute(&mut *tx)
            .await?;
    }
    sqlx::query(
        "INSERT INTO favorites \
         (user_id, key, title, source_name, cover, year, total_episodes, save_time, \
          search_title, origin, douban_id, imdb_id) \
         VALUES (?,?,?,?,?,?,?,?,?,?,?,?) \
         ON CONFLICT(user_id, key) DO UPDATE SET \
          title=excluded.title, source_name=excluded.source_name, cover=excluded.cover, \
          year=excluded.year, total_episodes=excluded.total_episodes, \
          save_time=excluded.save_time, search_title=excluded.search_title, \
          origin=excluded.origin, douban_id=excluded.douban_id, imdb_id=excluded.imdb_id",
    )
    .bind(&user.id)
    .bind(&req.key)
    .bind(&favorite.title)
    .bind(&favorite.source_name)
    .bind(&favorite.cover)
    .bind(&favorite.year)
    .bind(favorite.total_episodes)
    .bind(favorite.save_time)
    .bind(&favorite.search_title)
    .bind(&favorite.origin)
    .bind(&favorite.douban_id)
    .bind(&favorite.imdb_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    for key in stale {
        state.notify(&user.id, SyncEvent::FavoriteDeleted { key: Some(key) });
    }
    state.notify(
        &user.id,
        SyncEvent::FavoriteSaved {
            key: req.key,
            favorite: favorite.clone(),
        },
    );

    Ok(Json(favorite))
}

/// DELETE /api/favorites?key=...: one favorite, or all of them
pub async fn delete_favorites(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(q): Query<KeyQuery>,
) -> Result<StatusCode> {
    match &q.key {
        Some(key) => {
            let res = sqlx::query("DELETE FROM favorites WHERE user_id=? AND key=?")
                .bind(&user.id)
                .bind(key)
                .execute(&state.db)
                .await?;
            if res.rows_affected() == 0 {
                return Err(AppError::NotFound);
            }
        }
        None => {
            sqlx::query("DELETE FROM favorites WHERE user_id=?")
                .bind(&user.id)
                .execute(&state.db)
                .await?;
        }
    }
    state.notify(&user.id, SyncEvent::FavoriteDeleted { key: q.key });
    Ok(StatusCode::NO_CONTENT)
}
