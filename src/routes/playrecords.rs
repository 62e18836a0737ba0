use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use sqlx::FromRow;
use tracing::info;

use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    identity,
    models::{PlayRecord, SyncEvent, now_millis, split_record_key},
    state::AppState,
};

#[derive(FromRow)]
struct StoredPlayRecord {
    key: String,
    #[sqlx(flatten)]
    record: PlayRecord,
}

/// GET /api/playrecords: map of `source+id` → record
///
/// Duplicates of the same title saved from different sources are removed
/// here, keeping the most recently saved one.
pub async fn list_play_records(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, PlayRecord>>> {
    let rows: Vec<StoredPlayRecord> =
        sqlx::query_as("SELECT * FROM play_records WHERE user_id=? ORDER BY save_time DESC")
            .bind(&user.id)
            .fetch_all(&state.db)
            .await?;

    let deduped = identity::dedupe(rows.into_iter().map(|r| (r.key, r.record)).collect());

    if !deduped.removed.is_empty() {
        info!(
            "Removing {} duplicate play record(s) for {}",
            deduped.removed.len(),
            user.username
        );
        let mut tx = state.db.begin().await?;
        for key in &deduped.removed {
            sqlx::query("DELETE FROM play_records WHERE user_id=? AND key=?")
                .bind(&user.id)
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        for key in deduped.removed {
            state.notify(&user.id, SyncEvent::PlayRecordDeleted { key: Some(key) });
        }
    }

    Ok(Json(deduped.kept.into_iter().collect()))
}

#[derive(Debug, Deserialize)]
pub struct SavePlayRecordRequest {
    pub key: String,
    pub record: PlayRecord,
}

pub fn validate_play_record(key: &str, record: &PlayRecord) -> Result<()> {
    if split_record_key(key).is_none() {
        return Err(AppError::BadRequest("key must look like source+id".into()));
    }
    if record.title.trim().is_empty() {
        return Err(AppError::BadRequest("title cannot be empty".into()));
    }
    if record.index < 1 {
        return Err(AppError::BadRequest("index starts at 1".into()));
    }
    if record.play_time < 0 || record.total_time < 0 || record.total_episodes < 0 {
        return Err(AppError::BadRequest("times cannot be negative".into()));
    }
    Ok(())
}

/// POST /api/playrecords
///
/// Last write wins: any other record of this user describing the same
/// title is deleted.
pub async fn save_play_record(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SavePlayRecordRequest>,
) -> Result<Json<PlayRecord>> {
    validate_play_record(&req.key, &req.record)?;

    let mut record = req.record;
    if record.save_time <= 0 {
        record.save_time = now_millis();
    }

    let others: Vec<StoredPlayRecord> =
        sqlx::query_as("SELECT * FROM play_records WHERE user_id=? AND key<>?")
            .bind(&user.id)
            .bind(&req.key)
            .fetch_all(&state.db)
            .await?;
    let stale: Vec<String> = others
        .into_iter()
        .filter(|o| identity::overlaps(&o.record, &record))
        .map(|o| o.key)
        .collect();

    let mut tx = state.db.begin().await?;
    for key in &stale {
        sqlx::query("DELETE FROM play_records WHERE user_id=? AND key=?")
            .bind(&user.id)
            .bind(key)
            .execute(&mut *tx)
            .await?;
    }
    sqlx::query(
        "INSERT INTO play_records \
         (user_id, key, title, source_name, cover, year, episode_index, total_episodes, \
          play_time, total_time, save_time, search_title, douban_id, imdb_id) \
         VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?) \
         ON CONFLICT(user_id, key) DO UPDATE SET \
          title=excluded.title, source_name=excluded.source_name, cover=excluded.cover, \
          year=excluded.year, episode_index=excluded.episode_index, \
          total_episodes=excluded.total_episodes, play_time=excluded.play_time, \
          total_time=excluded.total_time, save_time=excluded.save_time, \
          search_title=excluded.search_title, douban_id=excluded.douban_id, \
          imdb_id=excluded.imdb_id",
    )
    .bind(&user.id)
    .bind(&req.key)
    .bind(&record.title)
    .bind(&record.source_name)
    .bind(&record.cover)
    .bind(&record.year)
    .bind(record.index)
    .bind(record.total_episodes)
    .bind(record.play_time)
    .bind(record.total_time)
    .bind(record.save_time)
    .bind(&record.search_title)
    .bind(&record.douban_id)
    .bind(&record.imdb_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    for key in stale {
        tracing::debug!("Play record {key} superseded by {}", req.key);
        state.notify(&user.id, SyncEvent::PlayRecordDeleted { key: Some(key) });
    }
    state.notify(
        &user.id,
        SyncEvent::PlayRecordSaved {
            key: req.key,
            record: record.clone(),
        },
    );

    Ok(Json(record))
}

#[derive(Deserialize)]
pub struct KeyQuery {
    pub key: Option<String>,
}

/// DELETE /api/playrecords?key=...: one record, or all of them
pub async fn delete_play_records(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(q): Query<KeyQuery>,
) -> Result<StatusCode> {
    match &q.key {
        Some(key) => {
            let res = sqlx::query("DELETE FROM play_records WHERE user_id=? AND key=?")
                .bind(&user.id)
                .bind(key)
                .execute(&state.db)
                .await?;
            if res.rows_affected() == 0 {
                return Err(AppError::NotFound);
            }
        }
        None => {
            sqlx::query("DELETE FROM play_records WHERE user_id=?")
                .bind(&user.id)
                .execute(&state.db)
                .await?;
        }
    }
    state.notify(&user.id, SyncEvent::PlayRecordDeleted { key: q.key });
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: i64) -> PlayRecord {
        PlayRecord {
            title: "Film".into(),
            source_name: "Demo".into(),
            cover: String::new(),
            year: "2020".into(),
            index,
            total_episodes: 1,
            play_time: 10,
            total_time: 100,
            save_time: 0,
            search_title: String::new(),
            douban_id: None,
            imdb_id: None,
        }
    }

    #[test]
    fn validation() {
        assert!(validate_play_record("demo+1", &record(1)).is_ok());
        assert!(validate_play_record("demo1", &record(1)).is_err());
        assert!(validate_play_record("demo+1", &record(0)).is_err());
        let mut blank = record(1);
        blank.title = "  ".into();
        assert!(validate_play_record("demo+1", &blank).is_err());
    }
}
