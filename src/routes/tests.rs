use std::{collections::HashMap, sync::Arc};

use axum::{
    Json, Router,
    extract::Query,
    http::{StatusCode, header},
    routing::get,
};
use axum_test::TestServer;
use serde_json::{Value, json};

use super::{build_router, ws::next_own_event};
use crate::{config::AppConfig, db, models::SyncEvent, sites, state::AppState};

const ADMIN_PASSWORD: &str = "admin-password";

/// A vod API site that knows exactly one title.
async fn vod(Query(p): Query<HashMap<String, String>>) -> Json<Value> {
    let item = json!({
        "vod_id": 42,
        "vod_name": "Dune",
        "vod_year": "2021",
        "vod_pic": "https://img.example/dune.jpg",
        "vod_class": "科幻",
        "vod_play_url": "第1集$https://cdn.example/dune/1.m3u8#第2集$https://cdn.example/dune/2.m3u8",
    });
    let wanted = p.get("wd").map(|s| s.to_lowercase()).unwrap_or_default();
    let hit = p.get("ids").is_some_and(|id| id == "42")
        || (!wanted.is_empty() && "dune".contains(&wanted));
    let list = if hit { vec![item] } else { vec![] };
    Json(json!({ "code": 1, "page": 1, "pagecount": 1, "list": list }))
}

async fn mock_site() -> String {
    let app = Router::new()
        .route("/vod", get(vod))
        .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route(
            "/small.png",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![7u8; 64]) }),
        )
        .route(
            "/huge.png",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![0u8; 6 * 1024 * 1024]) }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn setup_with(config: AppConfig) -> (TestServer, AppState) {
    let pool = db::connect_url("sqlite::memory:", 1).await.unwrap();
    db::seed_admin(&pool, &config).await.unwrap();
    let state = AppState::new(pool, Arc::new(config)).unwrap();
    let server = TestServer::new(build_router(state.clone(), "/nonexistent")).unwrap();
    (server, state)
}

async fn setup() -> (TestServer, AppState) {
    setup_with(AppConfig {
        secret: "test-secret".into(),
        admin_username: "admin".into(),
        admin_password: ADMIN_PASSWORD.into(),
        search_timeout_secs: 5,
        ..AppConfig::default()
    })
    .await
}

async fn add_sites(state: &AppState) {
    let base = mock_site().await;
    for (key, path, name) in [("good", "vod", "Good Site"), ("bad", "broken", "Bad Site")] {
        sqlx::query("INSERT INTO api_sites (key, api, name, from_config) VALUES (?, ?, ?, 0)")
            .bind(key)
            .bind(format!("{base}/{path}"))
            .bind(name)
            .execute(&state.db)
            .await
            .unwrap();
    }
}

async fn login(server: &TestServer, username: &str, password: &str) -> String {
    let resp = server
        .post("/api/login")
        .json(&json!({ "username": username, "password": password }))
        .await;
    resp.assert_status_ok();
    resp.json::<Value>()["token"].as_str().unwrap().to_string()
}

/// Log in as admin, create a plain user and return (admin token, user token).
async fn admin_and_user(server: &TestServer) -> (String, String) {
    let admin = login(server, "admin", ADMIN_PASSWORD).await;
    server
        .post("/api/users")
        .authorization_bearer(&admin)
        .json(&json!({ "username": "alice", "password": "alice-password" }))
        .await
        .assert_status(StatusCode::CREATED);
    let user = login(server, "alice", "alice-password").await;
    (admin, user)
}

fn record(title: &str, year: &str, save_time: i64) -> Value {
    json!({
        "title": title,
        "source_name": "Demo",
        "cover": "",
        "year": year,
        "index": 1,
        "total_episodes": 8,
        "play_time": 120,
        "total_time": 2400,
        "save_time": save_time,
    })
}

#[tokio::test]
async fn login_rejects_bad_password_and_missing_token() {
    let (server, _) = setup().await;
    server
        .post("/api/login")
        .json(&json!({ "username": "admin", "password": "nope-nope" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/api/playrecords")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn server_config_is_public_and_register_is_off_by_default() {
    let (server, _) = setup().await;
    let cfg: Value = server.get("/api/server-config").await.json();
    assert_eq!(cfg["site_name"], "EsmeeTV");
    assert_eq!(cfg["enable_register"], false);

    server
        .post("/api/register")
        .json(&json!({ "username": "bob", "password": "bob-password" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn register_when_enabled() {
    let (server, _) = setup_with(AppConfig {
        enable_register: true,
        admin_password: ADMIN_PASSWORD.into(),
        ..AppConfig::default()
    })
    .await;
    let resp = server
        .post("/api/register")
        .json(&json!({ "username": "bob", "password": "bob-password" }))
        .await;
    resp.assert_status(StatusCode::CREATED);
    assert_eq!(resp.json::<Value>()["role"], "user");

    server
        .post("/api/register")
        .json(&json!({ "username": "bob", "password": "bob-password" }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn admin_routes_are_forbidden_for_users() {
    let (server, _) = setup().await;
    let (admin, user) = admin_and_user(&server).await;

    for path in ["/api/users", "/api/settings", "/api/admin/sites"] {
        server
            .get(path)
            .authorization_bearer(&user)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .get(path)
            .authorization_bearer(&admin)
            .await
            .assert_status_ok();
    }
}

#[tokio::test]
async fn banned_users_are_locked_out() {
    let (server, _) = setup().await;
    let (admin, user) = admin_and_user(&server).await;
    let me: Value = server
        .get("/api/users/me")
        .authorization_bearer(&user)
        .await
        .json();
    let id = me["id"].as_str().unwrap();

    server
        .put(&format!("/api/users/{id}/ban"))
        .authorization_bearer(&admin)
        .json(&json!({ "banned": true }))
        .await
        .assert_status_ok();
    server
        .get("/api/users/me")
        .authorization_bearer(&user)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .post("/api/login")
        .json(&json!({ "username": "alice", "password": "alice-password" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn saving_a_record_replaces_the_same_title_from_another_source() {
    let (server, _) = setup().await;
    let token = login(&server, "admin", ADMIN_PASSWORD).await;

    server
        .post("/api/playrecords")
        .authorization_bearer(&token)
        .json(&json!({ "key": "siteA+1", "record": record("Dune", "2021", 1_000) }))
        .await
        .assert_status_ok();
    server
        .post("/api/playrecords")
        .authorization_bearer(&token)
        .json(&json!({ "key": "siteB+7", "record": record("  DUNE ", "2021", 2_000) }))
        .await
        .assert_status_ok();
    server
        .post("/api/playrecords")
        .authorization_bearer(&token)
        .json(&json!({ "key": "siteA+2", "record": record("Arrival", "2016", 3_000) }))
        .await
        .assert_status_ok();

    let records: Value = server
        .get("/api/playrecords")
        .authorization_bearer(&token)
        .await
        .json();
    let map = records.as_object().unwrap();
    assert_eq!(map.len(), 2);
    assert!(map.contains_key("siteB+7"));
    assert!(map.contains_key("siteA+2"));
    assert_eq!(map["siteB+7"]["index"], 1);
}

#[tokio::test]
async fn listing_records_removes_stored_duplicates() {
    let (server, state) = setup().await;
    let token = login(&server, "admin", ADMIN_PASSWORD).await;
    let (admin_id,): (String,) = sqlx::query_as("SELECT id FROM users WHERE username='admin'")
        .fetch_one(&state.db)
        .await
        .unwrap();

    // Rows written behind the API's back, as an older version would have left them.
    for (key, save_time) in [("old+1", 1_000i64), ("new+1", 5_000)] {
        sqlx::query(
            "INSERT INTO play_records (user_id, key, title, year, episode_index, save_time, douban_id) \
             VALUES (?, ?, 'Some Show', '2020', 3, ?, '1234567')",
        )
        .bind(&admin_id)
        .bind(key)
        .bind(save_time)
        .execute(&state.db)
        .await
        .unwrap();
    }

    let records: Value = server
        .get("/api/playrecords")
        .authorization_bearer(&token)
        .await
        .json();
    let keys: Vec<&String> = records.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["new+1"]);

    let (left,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM play_records")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(left, 1);
}

#[tokio::test]
async fn deleting_play_records() {
    let (server, _) = setup().await;
    let token = login(&server, "admin", ADMIN_PASSWORD).await;
    server
        .post("/api/playrecords")
        .authorization_bearer(&token)
        .json(&json!({ "key": "siteA+1", "record": record("Dune", "2021", 1_000) }))
        .await
        .assert_status_ok();

    server
        .delete("/api/playrecords")
        .authorization_bearer(&token)
        .add_query_param("key", "siteA+404")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .delete("/api/playrecords")
        .authorization_bearer(&token)
        .add_query_param("key", "siteA+1")
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let records: Value = server
        .get("/api/playrecords")
        .authorization_bearer(&token)
        .await
        .json();
    assert!(records.as_object().unwrap().is_empty());
}

#[tokio::test]
async fn records_are_private_to_each_user() {
    let (server, _) = setup().await;
    let (admin, user) = admin_and_user(&server).await;
    server
        .post("/api/playrecords")
        .authorization_bearer(&admin)
        .json(&json!({ "key": "siteA+1", "record": record("Dune", "2021", 1_000) }))
        .await
        .assert_status_ok();

    let theirs: Value = server
        .get("/api/playrecords")
        .authorization_bearer(&user)
        .await
        .json();
    assert!(theirs.as_object().unwrap().is_empty());
}

#[tokio::test]
async fn favorites_by_key() {
    let (server, _) = setup().await;
    let token = login(&server, "admin", ADMIN_PASSWORD).await;

    server
        .post("/api/favorites")
        .authorization_bearer(&token)
        .json(&json!({
            "key": "siteA+1",
            "favorite": { "title": "Dune", "year": "2021", "total_episodes": 1 },
        }))
        .await
        .assert_status_ok();

    let one: Value = server
        .get("/api/favorites")
        .authorization_bearer(&token)
        .add_query_param("key", "siteA+1")
        .await
        .json();
    assert_eq!(one["title"], "Dune");
    assert!(one["save_time"].as_i64().unwrap() > 0);

    let missing: Value = server
        .get("/api/favorites")
        .authorization_bearer(&token)
        .add_query_param("key", "siteA+2")
        .await
        .json();
    assert!(missing.is_null());

    server
        .post("/api/favorites")
        .authorization_bearer(&token)
        .json(&json!({ "key": "no-plus", "favorite": { "title": "Dune" } }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_history_is_newest_first_and_capped() {
    let (server, _) = setup().await;
    let token = login(&server, "admin", ADMIN_PASSWORD).await;

    for keyword in ["a", "b", "a"] {
        server
            .post("/api/searchhistory")
            .authorization_bearer(&token)
            .json(&json!({ "keyword": keyword }))
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }
    let history: Vec<String> = server
        .get("/api/searchhistory")
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(history, ["a", "b"]);

    for n in 0..25 {
        server
            .post("/api/searchhistory")
            .authorization_bearer(&token)
            .json(&json!({ "keyword": format!("kw{n}") }))
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }
    let history: Vec<String> = server
        .get("/api/searchhistory")
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(history.len(), 20);
    assert_eq!(history[0], "kw24");

    server
        .delete("/api/searchhistory")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    let history: Vec<String> = server
        .get("/api/searchhistory")
        .authorization_bearer(&token)
        .await
        .json();
    assert!(history.is_empty());
}

#[tokio::test]
async fn playlists_crud() {
    let (server, _) = setup().await;
    let (admin, user) = admin_and_user(&server).await;

    let created = server
        .post("/api/playlists")
        .authorization_bearer(&user)
        .json(&json!({ "name": "Weekend" }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let id = created.json::<Value>()["id"].as_str().unwrap().to_string();
    let items_path = format!("/api/playlists/{id}/items");

    for key in ["siteA+1", "siteA+2"] {
        server
            .post(&items_path)
            .authorization_bearer(&user)
            .json(&json!({ "key": key, "title": key }))
            .await
            .assert_status(StatusCode::CREATED);
    }
    server
        .post(&items_path)
        .authorization_bearer(&user)
        .json(&json!({ "key": "siteA+1", "title": "again" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let after: Value = server
        .delete(&items_path)
        .authorization_bearer(&user)
        .add_query_param("key", "siteA+1")
        .await
        .json();
    assert_eq!(after["items"][0]["key"], "siteA+2");
    assert_eq!(after["items"][0]["position"], 0);

    server
        .get(&format!("/api/playlists/{id}"))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let renamed: Value = server
        .put(&format!("/api/playlists/{id}"))
        .authorization_bearer(&user)
        .json(&json!({ "name": "Sunday" }))
        .await
        .json();
    assert_eq!(renamed["name"], "Sunday");
}

#[tokio::test]
async fn language_preference() {
    let (server, _) = setup().await;
    let token = login(&server, "admin", ADMIN_PASSWORD).await;

    let lang: Value = server
        .get("/api/user/language")
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(lang["language"], "zh-CN");

    let set: Value = server
        .put("/api/user/language")
        .authorization_bearer(&token)
        .json(&json!({ "language": "EN" }))
        .await
        .json();
    assert_eq!(set["language"], "en");

    server
        .put("/api/user/language")
        .authorization_bearer(&token)
        .json(&json!({ "language": "fr" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_survives_a_failing_site_and_records_history() {
    let (server, state) = setup().await;
    add_sites(&state).await;
    let token = login(&server, "admin", ADMIN_PASSWORD).await;

    let found: Value = server
        .get("/api/search")
        .authorization_bearer(&token)
        .add_query_param("q", "dune")
        .await
        .json();
    let results = found["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["source"], "good");
    assert_eq!(results[0]["episodes"].as_array().unwrap().len(), 2);

    let history: Vec<String> = server
        .get("/api/searchhistory")
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(history, ["dune"]);
}

#[tokio::test]
async fn search_skips_disabled_sites() {
    let (server, state) = setup().await;
    add_sites(&state).await;
    let token = login(&server, "admin", ADMIN_PASSWORD).await;

    server
        .put("/api/admin/sites/good")
        .authorization_bearer(&token)
        .json(&json!({ "disabled": true }))
        .await
        .assert_status_ok();

    let found: Value = server
        .get("/api/search")
        .authorization_bearer(&token)
        .add_query_param("q", "dune")
        .await
        .json();
    assert!(found["results"].as_array().unwrap().is_empty());

    let resources: Value = server
        .get("/api/search/resources")
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(resources.as_array().unwrap().len(), 1);
    assert_eq!(resources[0]["key"], "bad");
}

#[tokio::test]
async fn search_one_site_and_detail() {
    let (server, state) = setup().await;
    add_sites(&state).await;
    let token = login(&server, "admin", ADMIN_PASSWORD).await;

    let one: Value = server
        .get("/api/search/one")
        .authorization_bearer(&token)
        .add_query_param("q", "Dune")
        .add_query_param("resourceId", "good")
        .await
        .json();
    assert_eq!(one["results"][0]["title"], "Dune");

    server
        .get("/api/search/one")
        .authorization_bearer(&token)
        .add_query_param("q", "Dune")
        .add_query_param("resourceId", "bad")
        .await
        .assert_status(StatusCode::BAD_GATEWAY);

    let detail: Value = server
        .get("/api/detail")
        .authorization_bearer(&token)
        .add_query_param("source", "good")
        .add_query_param("id", "42")
        .await
        .json();
    assert_eq!(detail["year"], "2021");
    assert_eq!(detail["episode_titles"][1], "第2集");

    server
        .get("/api/detail")
        .authorization_bearer(&token)
        .add_query_param("source", "good")
        .add_query_param("id", "7")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn streaming_search_reports_every_source() {
    let (server, state) = setup().await;
    add_sites(&state).await;
    let token = login(&server, "admin", ADMIN_PASSWORD).await;

    let body = server
        .get("/api/search/stream")
        .authorization_bearer(&token)
        .add_query_param("q", "dune")
        .await
        .text();
    let frames: Vec<Value> = body
        .lines()
        .filter_map(|l| l.strip_prefix("data:"))
        .map(|d| serde_json::from_str(d.trim()).unwrap())
        .collect();

    assert_eq!(frames.first().unwrap()["type"], "start");
    assert_eq!(frames.first().unwrap()["totalSources"], 2);
    assert!(frames.iter().any(|f| f["type"] == "source_result" && f["source"] == "good"));
    assert!(frames.iter().any(|f| f["type"] == "source_error" && f["source"] == "bad"));
    let last = frames.last().unwrap();
    assert_eq!(last["type"], "complete");
    assert_eq!(last["totalResults"], 1);
    assert_eq!(last["completedSources"], 2);
}

#[tokio::test]
async fn metadata_without_api_keys_is_unavailable() {
    let (server, _) = setup().await;
    let token = login(&server, "admin", ADMIN_PASSWORD).await;
    server
        .get("/api/tmdb/trending")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    server
        .get("/api/youtube/search")
        .authorization_bearer(&token)
        .add_query_param("q", "trailer")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    server
        .get("/api/image-proxy")
        .authorization_bearer(&token)
        .add_query_param("url", "file:///etc/passwd")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn settings_override_site_name() {
    let (server, _) = setup().await;
    let token = login(&server, "admin", ADMIN_PASSWORD).await;
    server
        .put("/api/settings/site_name")
        .authorization_bearer(&token)
        .json(&json!({ "value": "Home Cinema" }))
        .await
        .assert_status_ok();
    server
        .put("/api/settings/theme")
        .authorization_bearer(&token)
        .json(&json!({ "value": "dark" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let cfg: Value = server.get("/api/server-config").await.json();
    assert_eq!(cfg["site_name"], "Home Cinema");
}

#[tokio::test]
async fn saving_a_favorite_replaces_the_same_title_from_another_source() {
    let (server, _) = setup().await;
    let token = login(&server, "admin", ADMIN_PASSWORD).await;

    for (key, title) in [("siteA+1", "Dune"), ("siteB+7", "DUNE"), ("siteA+2", "Arrival")] {
        server
            .post("/api/favorites")
            .authorization_bearer(&token)
            .json(&json!({
                "key": key,
                "favorite": { "title": title, "year": "2021", "total_episodes": 1 },
            }))
            .await
            .assert_status_ok();
    }

    let favorites: Value = server
        .get("/api/favorites")
        .authorization_bearer(&token)
        .await
        .json();
    let mut keys: Vec<&String> = favorites.as_object().unwrap().keys().collect();
    keys.sort();
    assert_eq!(keys, ["siteA+2", "siteB+7"]);
}

#[tokio::test]
async fn sync_events_reach_only_their_owner() {
    let (server, state) = setup().await;
    let (admin, user) = admin_and_user(&server).await;
    let me: Value = server
        .get("/api/users/me")
        .authorization_bearer(&user)
        .await
        .json();
    let user_id = me["id"].as_str().unwrap().to_string();

    let mut rx = state.events.subscribe();
    server
        .post("/api/playrecords")
        .authorization_bearer(&admin)
        .json(&json!({ "key": "siteA+1", "record": record("Dune", "2021", 1_000) }))
        .await
        .assert_status_ok();
    server
        .post("/api/playrecords")
        .authorization_bearer(&user)
        .json(&json!({ "key": "siteB+3", "record": record("Arrival", "2016", 2_000) }))
        .await
        .assert_status_ok();

    let event = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        next_own_event(&user_id, &mut rx),
    )
    .await
    .unwrap();
    match event {
        Some(SyncEvent::PlayRecordSaved { key, record }) => {
            assert_eq!(key, "siteB+3");
            assert_eq!(record.title, "Arrival");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn image_proxy_relays_small_images_and_refuses_huge_ones() {
    let (server, _) = setup().await;
    let token = login(&server, "admin", ADMIN_PASSWORD).await;
    let base = mock_site().await;

    let small = server
        .get("/api/image-proxy")
        .authorization_bearer(&token)
        .add_query_param("url", format!("{base}/small.png"))
        .await;
    small.assert_status_ok();
    assert_eq!(small.as_bytes().len(), 64);
    assert_eq!(
        small.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=86400"
    );

    server
        .get("/api/image-proxy")
        .authorization_bearer(&token)
        .add_query_param("url", format!("{base}/huge.png"))
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn site_config_cache_time_sets_metadata_cache_lifetime() {
    let path = std::env::temp_dir().join(format!("esmeetv-sites-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(
        &path,
        r#"{"cache_time": 60, "api_site": {"demo": {"api": "http://demo.invalid/vod", "name": "Demo"}}}"#,
    )
    .unwrap();

    let (_, state) = setup_with(AppConfig {
        config_file: path.to_string_lossy().into_owned(),
        cache_time: 7200,
        ..AppConfig::default()
    })
    .await;
    assert_eq!(state.cache.ttl(), 7200);

    sites::refresh(&state).await;
    std::fs::remove_file(&path).unwrap();

    assert_eq!(state.cache.ttl(), 60);
    assert!(sites::find_site(&state.db, "demo").await.unwrap().is_some());
}

#[tokio::test]
async fn usernames_are_trimmed() {
    let (server, _) = setup_with(AppConfig {
        enable_register: true,
        admin_password: ADMIN_PASSWORD.into(),
        ..AppConfig::default()
    })
    .await;
    let created: Value = server
        .post("/api/register")
        .json(&json!({ "username": " bob ", "password": "bob-password" }))
        .await
        .json();
    assert_eq!(created["username"], "bob");

    server
        .post("/api/register")
        .json(&json!({ "username": "bob", "password": "bob-password" }))
        .await
        .assert_status(StatusCode::CONFLICT);
    login(&server, " bob", "bob-password").await;
}
