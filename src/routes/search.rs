use std::{collections::HashMap, convert::Infallible, time::Duration};

use axum::{
    Json,
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::{Stream, StreamExt, future::join_all};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::mpsc,
    task::{self, JoinError, JoinSet},
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    http::HttpClient,
    models::{ApiSite, SearchResult, SyncEvent},
    routes::{history, settings},
    sites, source,
    state::AppState,
};

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

/// Search one site, giving up after `timeout`.
async fn timed_search(
    http: &HttpClient,
    site: &ApiSite,
    query: &str,
    max_page: u32,
    timeout: Duration,
) -> anyhow::Result<Vec<SearchResult>> {
    match tokio::time::timeout(timeout, source::search_site(http, site, query, max_page)).await {
        Ok(res) => res,
        Err(_) => anyhow::bail!("timed out after {}s", timeout.as_secs()),
    }
}

fn search_timeout(state: &AppState) -> Duration {
    Duration::from_secs(state.config.search_timeout_secs.max(1))
}

/// Best-effort: a failed history write never fails the search.
async fn remember_query(state: &AppState, user_id: &str, query: &str) {
    match history::record_keyword(&state.db, user_id, query).await {
        Ok(()) => state.notify(user_id, SyncEvent::SearchHistoryChanged),
        Err(e) => warn!("Could not record search history: {e}"),
    }
}

/// GET /api/search?q=...: all enabled sites in parallel
pub async fn search(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let query = params.q.trim();
    if query.is_empty() {
        return Ok(Json(SearchResponse { results: vec![] }));
    }

    let sites = sites::enabled_sites(&state.db).await?;
    remember_query(&state, &user.id, query).await;

    let timeout = search_timeout(&state);
    let max_page = settings::effective_max_page(&state).await;
    let searches = sites
        .iter()
        .map(|site| timed_search(&state.http, site, query, max_page, timeout));

    let mut results = Vec::new();
    for (site, outcome) in sites.iter().zip(join_all(searches).await) {
        match outcome {
            Ok(found) => results.extend(found),
            Err(e) => warn!("Search on {} failed: {e:#}", site.key),
        }
    }

    info!(
        "Search {query:?}: {} result(s) from {} site(s)",
        results.len(),
        sites.len()
    );
    Ok(Json(SearchResponse { results }))
}

#[derive(Deserialize)]
pub struct SearchOneQuery {
    #[serde(default)]
    pub q: String,
    #[serde(rename = "resourceId")]
    pub resource_id: String,
}

/// GET /api/search/one?q=...&resourceId=...: one site, exact title first
pub async fn search_one(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<SearchOneQuery>,
) -> Result<Json<SearchResponse>> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("query is required".into()));
    }

    let site = sites::find_site(&state.db, &params.resource_id)
        .await?
        .filter(|s| !s.disabled)
        .ok_or(AppError::NotFound)?;

    let found = timed_search(
        &state.http,
        &site,
        query,
        settings::effective_max_page(&state).await,
        search_timeout(&state),
    )
    .await
    .map_err(|e| AppError::Upstream(format!("{}: {e:#}", site.name)))?;

    Ok(Json(SearchResponse {
        results: prefer_exact_title(found, query),
    }))
}

fn squash(s: &str) -> String {
    s.split_whitespace().collect::<String>().to_lowercase()
}

/// Keep only exact title matches (ignoring case and whitespace), or
/// everything when nothing matches exactly.
pub fn prefer_exact_title(results: Vec<SearchResult>, query: &str) -> Vec<SearchResult> {
    let wanted = squash(query);
    if !results.iter().any(|r| squash(&r.title) == wanted) {
        return results;
    }
    results
        .into_iter()
        .filter(|r| squash(&r.title) == wanted)
        .collect()
}

/// Messages of the streaming search, one SSE `data:` frame each.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StreamMessage {
    Start {
        query: String,
        total_sources: usize,
    },
    SourceResult {
        source: String,
        source_name: String,
        results: Vec<SearchResult>,
    },
    SourceError {
        source: String,
        source_name: String,
        error: String,
    },
    Complete {
        total_results: usize,
        completed_sources: usize,
    },
}

/// GET /api/search/stream?q=...: Server-Sent Events, one frame per site
/// as soon as it answers.
pub async fn search_stream(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let query = params.q.trim().to_string();
    if query.is_empty() {
        return Err(AppError::BadRequest("query is required".into()));
    }

    let sites = sites::enabled_sites(&state.db).await?;
    remember_query(&state, &user.id, &query).await;

    let (tx, rx) = mpsc::channel::<StreamMessage>(sites.len() + 2);
    tokio::spawn(fan_out(state, sites, query, tx));

    let stream = ReceiverStream::new(rx).map(|msg| {
        let data = serde_json::to_string(&msg).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().data(data))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn fan_out(
    state: AppState,
    sites: Vec<ApiSite>,
    query: String,
    tx: mpsc::Sender<StreamMessage>,
) {
    let start = StreamMessage::Start {
        query: query.clone(),
        total_sources: sites.len(),
    };
    if tx.send(start).await.is_err() {
        return;
    }

    // Dropping the set (client gone) aborts the outstanding searches.
    let mut set = JoinSet::new();
    let mut pending: HashMap<task::Id, (String, String)> = HashMap::new();
    let timeout = search_timeout(&state);
    let max_page = settings::effective_max_page(&state).await;
    for site in sites {
        let http = state.http.clone();
        let query = query.clone();
        let names = (site.key.clone(), site.name.clone());
        let handle = set.spawn(async move {
            let outcome = timed_search(&http, &site, &query, max_page, timeout).await;
            (site, outcome)
        });
        pending.insert(handle.id(), names);
    }

    let mut total_results = 0;
    let mut completed_sources = 0;
    while let Some(joined) = set.join_next().await {
        completed_sources += 1;
        let msg = match joined {
            Ok((site, Ok(results))) => {
                total_results += results.len();
                StreamMessage::SourceResult {
                    source: site.key,
                    source_name: site.name,
                    results,
                }
            }
            Ok((site, Err(e))) => {
                warn!("Streaming search on {} failed: {e:#}", site.key);
                StreamMessage::SourceError {
                    source: site.key,
                    source_name: site.name,
                    error: e.to_string(),
                }
            }
            Err(e) => failed_task(&mut pending, e),
        };
        if tx.send(msg).await.is_err() {
            return;
        }
    }

    let _ = tx
        .send(StreamMessage::Complete {
            total_results,
            completed_sources,
        })
        .await;
}

/// A search task that panicked or was cancelled still reports its site.
fn failed_task(pending: &mut HashMap<task::Id, (String, String)>, err: JoinError) -> StreamMessage {
    let (source, source_name) = pending.remove(&err.id()).unwrap_or_default();
    warn!("Streaming search task for {source:?} failed: {err}");
    StreamMessage::SourceError {
        source,
        source_name,
        error: if err.is_panic() {
            "search task panicked".to_string()
        } else {
            "search task was cancelled".to_string()
        },
    }
}

#[derive(Serialize)]
pub struct ResourceView {
    pub key: String,
    pub name: String,
    pub api: String,
}

/// GET /api/search/resources
pub async fn resources(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ResourceView>>> {
    let sites = sites::enabled_sites(&state.db).await?;
    Ok(Json(
        sites
            .into_iter()
            .map(|s| ResourceView {
                key: s.key,
                name: s.name,
                api: s.api,
            })
            .collect(),
    ))
}

#[derive(Deserialize)]
pub struct DetailQuery {
    pub source: String,
    pub id: String,
}

/// GET /api/detail?source=...&id=...
pub async fn detail(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<DetailQuery>,
) -> Result<Json<SearchResult>> {
    if params.id.trim().is_empty() {
        return Err(AppError::BadRequest("id is required".into()));
    }
    let site = sites::find_site(&state.db, &params.source)
        .await?
        .ok_or(AppError::NotFound)?;

    source::get_detail(&state.http, &site, params.id.trim())
        .await
        .map_err(|e| AppError::Upstream(format!("{}: {e:#}", site.name)))?
        .map(Json)
        .ok_or(AppError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn exact_titles_win() {
        let out = prefer_exact_title(
            vec![result("流浪地球 2"), result("流浪地球2 特别版"), result("流浪地球2")],
            "流浪地球2",
        );
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| squash(&r.title) == "流浪地球2"));
    }

    #[test]
    fn falls_back_to_everything() {
        let out = prefer_exact_title(vec![result("Dune Part Two")], "dune");
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn panicked_search_still_reports_its_site() {
        let mut set: JoinSet<()> = JoinSet::new();
        let mut pending = HashMap::new();
        let handle = set.spawn(async { panic!("boom") });
        pending.insert(handle.id(), ("demo".to_string(), "Demo".to_string()));

        let err = set.join_next().await.unwrap().unwrap_err();
        match failed_task(&mut pending, err) {
            StreamMessage::SourceError { source, source_name, error } => {
                assert_eq!(source, "demo");
                assert_eq!(source_name, "Demo");
                assert!(error.contains("panicked"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert!(pending.is_empty());
    }

    #[test]
    fn stream_messages_are_camel_case() {
        let msg = StreamMessage::Start {
            query: "x".into(),
            total_sources: 2,
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["type"], "start");
        assert_eq!(v["totalSources"], 2);
    }
}
