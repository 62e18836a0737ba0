use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    state::AppState,
};

pub const SUPPORTED_LANGUAGES: [&str; 3] = ["zh-CN", "zh-TW", "en"];
pub const DEFAULT_LANGUAGE: &str = "zh-CN";

#[derive(Debug, Serialize, Deserialize)]
pub struct LanguagePreference {
    pub language: String,
}

/// GET /api/user/language
pub async fn get_language(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LanguagePreference>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT language FROM user_preferences WHERE user_id=?")
            .bind(&user.id)
            .fetch_optional(&state.db)
            .await?;
    Ok(Json(LanguagePreference {
        language: row
            .map(|(l,)| l)
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
    }))
}

/// PUT /api/user/language
pub async fn set_language(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<LanguagePreference>,
) -> Result<Json<LanguagePreference>> {
    let language = SUPPORTED_LANGUAGES
        .iter()
        .find(|l| l.eq_ignore_ascii_case(req.language.trim()))
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "unsupported language '{}', expected one of {}",
                req.language,
                SUPPORTED_LANGUAGES.join(", ")
            ))
        })?;

    sqlx::query(
        "INSERT INTO user_preferences (user_id, language, updated_at) VALUES (?, ?, ?) \
         ON CONFLICT(user_id) DO UPDATE SET language=excluded.language, updated_at=excluded.updated_at",
    )
    .bind(&user.id)
    .bind(*language)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    Ok(Json(LanguagePreference {
        language: language.to_string(),
    }))
}
