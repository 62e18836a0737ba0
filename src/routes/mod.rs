pub mod favorites;
pub mod history;
pub mod metadata;
pub mod playlists;
pub mod playrecords;
pub mod preferences;
pub mod search;
pub mod settings;
pub mod sites;
pub mod users;
pub mod ws;

#[cfg(test)]
mod tests;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{
    auth::{login_handler, logout_handler, register_handler},
    state::AppState,
};

pub fn build_router(state: AppState, static_dir: &str) -> Router {
    let api = Router::new()
        // Auth
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/register", post(register_handler))
        .route("/server-config", get(metadata::server_config))
        // Search
        .route("/search", get(search::search))
        .route("/search/one", get(search::search_one))
        .route("/search/stream", get(search::search_stream))
        .route("/search/resources", get(search::resources))
        .route("/detail", get(search::detail))
        // Per-user data
        .route(
            "/playrecords",
            get(playrecords::list_play_records)
                .post(playrecords::save_play_record)
                .delete(playrecords::delete_play_records),
        )
        .route(
            "/favorites",
            get(favorites::get_favorites)
                .post(favorites::save_favorite)
                .delete(favorites::delete_favorites),
        )
        .route(
            "/searchhistory",
            get(history::list_history)
                .post(history::add_history)
                .delete(history::delete_history),
        )
        .route(
            "/playlists",
            get(playlists::list_playlists).post(playlists::create_playlist),
        )
        .route(
            "/playlists/{id}",
            get(playlists::get_playlist)
                .put(playlists::rename_playlist)
                .delete(playlists::delete_playlist),
        )
        .route(
            "/playlists/{id}/items",
            post(playlists::add_item).delete(playlists::remove_item),
        )
        .route(
            "/user/language",
            get(preferences::get_language).put(preferences::set_language),
        )
        // Metadata
        .route("/douban", get(metadata::douban_by_tag))
        .route("/douban/categories", get(metadata::douban_categories))
        .route("/wmdb", get(metadata::wmdb_lookup))
        .route("/tmdb/trending", get(metadata::tmdb_trending))
        .route("/youtube/search", get(metadata::youtube_search))
        .route("/image-proxy", get(metadata::image_proxy))
        // Settings
        .route(
            "/settings",
            get(settings::list_settings).patch(settings::bulk_update_settings),
        )
        .route(
            "/settings/{key}",
            get(settings::get_setting).put(settings::set_setting),
        )
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/me", get(users::get_me))
        .route("/users/{id}", delete(users::delete_user))
        .route("/users/{id}/ban", put(users::set_banned))
        .route("/users/{id}/password", put(users::change_password))
        // Sites
        .route(
            "/admin/sites",
            get(sites::list_sites).post(sites::add_site),
        )
        .route(
            "/admin/sites/{key}",
            put(sites::toggle_site).delete(sites::delete_site),
        );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/api", api)
        // SPA fallback
        .fallback_service(
            ServeDir::new(static_dir)
                .not_found_service(ServeFile::new(format!("{static_dir}/index.html"))),
        )
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
