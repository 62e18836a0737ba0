use std::sync::Arc;
use tokio::sync::broadcast;

use crate::{config::AppConfig, db::Db, http::HttpClient, metadata::MetaCache, models::UserEvent};

/// Shared application state injected into every Axum handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Arc<AppConfig>,
    /// Outbound client for API sites and metadata providers.
    pub http: HttpClient,
    pub cache: MetaCache,
    /// Broadcast channel for per-user sync events.
    pub events: broadcast::Sender<UserEvent>,
}

impl AppState {
    pub fn new(db: Db, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let http = HttpClient::from_config(&config)?;
        let cache = MetaCache::new(config.cache_time);
        let (events, _) = broadcast::channel::<UserEvent>(256);
        Ok(AppState {
            db,
            config,
            http,
            cache,
            events,
        })
    }

    /// Push a sync event to the user's open sockets. Nobody listening is fine.
    pub fn notify(&self, user_id: &str, event: crate::models::SyncEvent) {
        let _ = self.events.send(UserEvent {
            user_id: user_id.to_string(),
            event,
        });
    }
}
