use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ── User ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    User,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::User => "user",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(anyhow::anyhow!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: String,
    pub banned: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::User)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role(), Role::Owner | Role::Admin)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

// ── API sites ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApiSite {
    pub key: String,
    pub api: String,
    pub name: String,
    pub detail: Option<String>,
    pub disabled: bool,
    pub from_config: bool,
}

/// One playable title as returned by an API site, normalised.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub poster: String,
    pub episodes: Vec<String>,
    pub episode_titles: Vec<String>,
    pub source: String,
    pub source_name: String,
    pub class: Option<String>,
    pub year: String,
    pub desc: Option<String>,
    pub type_name: Option<String>,
    pub douban_id: Option<String>,
}

// ── Per-user records ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct PlayRecord {
    pub title: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub year: String,
    /// 1-based episode number the user is on.
    #[sqlx(rename = "episode_index")]
    pub index: i64,
    #[serde(default)]
    pub total_episodes: i64,
    /// Seconds into the episode.
    #[serde(default)]
    pub play_time: i64,
    #[serde(default)]
    pub total_time: i64,
    /// Unix milliseconds.
    #[serde(default)]
    pub save_time: i64,
    #[serde(default)]
    pub search_title: String,
    #[serde(default)]
    pub douban_id: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Favorite {
    pub title: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub total_episodes: i64,
    #[serde(default)]
    pub save_time: i64,
    #[serde(default)]
    pub search_title: String,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub douban_id: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    #[sqlx(skip)]
    pub items: Vec<PlaylistItem>,
}

impl Playlist {
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct PlaylistItem {
    pub key: String,
    pub title: String,
    pub cover: String,
    pub position: i64,
    pub added_at: String,
}

/// Key/value settings pair
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

/// Splits a `source+id` storage key. Both halves must be non-empty.
pub fn split_record_key(key: &str) -> Option<(&str, &str)> {
    let (source, id) = key.split_once('+')?;
    if source.is_empty() || id.is_empty() {
        return None;
    }
    Some((source, id))
}

/// Current time in Unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ── Sync events ──────────────────────────────────────────────────────────────

/// A change to a user's stored state, pushed to that user's open sockets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    PlayRecordSaved { key: String, record: PlayRecord },
    PlayRecordDeleted { key: Option<String> },
    FavoriteSaved { key: String, favorite: Favorite },
    FavoriteDeleted { key: Option<String> },
    SearchHistoryChanged,
}

/// Broadcast envelope; only delivered to sockets owned by `user_id`.
#[derive(Debug, Clone)]
pub struct UserEvent {
    pub user_id: String,
    pub event: SyncEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_key_needs_both_halves() {
        assert_eq!(split_record_key("dyttzy+123"), Some(("dyttzy", "123")));
        assert_eq!(split_record_key("a+b+c"), Some(("a", "b+c")));
        assert_eq!(split_record_key("+123"), None);
        assert_eq!(split_record_key("dyttzy+"), None);
        assert_eq!(split_record_key("dyttzy"), None);
    }

    #[test]
    fn unknown_role_falls_back_to_user() {
        let user = User {
            id: "1".into(),
            username: "u".into(),
            password: String::new(),
            role: "superhero".into(),
            banned: false,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(user.role(), Role::User);
        assert!(!user.is_admin());
    }

    #[test]
    fn sync_event_is_tagged() {
        let ev = SyncEvent::PlayRecordDeleted { key: None };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "play_record_deleted");
    }
}
