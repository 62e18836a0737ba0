use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    auth::{AuthRejection, extract_token, verify_token},
    models::{SyncEvent, User, UserEvent},
    state::AppState,
};

#[derive(Deserialize)]
pub struct WsQuery {
    /// Browsers can't set headers on a WebSocket handshake.
    pub token: Option<String>,
}

/// GET /ws: the caller's own sync events (play records, favorites, history)
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let Some(user_id) = query
        .token
        .or_else(|| extract_token(&headers))
        .and_then(|t| verify_token(&t, &state.config.secret))
    else {
        return AuthRejection::Unauthorized.into_response();
    };

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&user_id)
        .fetch_optional(&state.db)
        .await
        .unwrap_or(None);
    match user {
        None => return AuthRejection::Unauthorized.into_response(),
        Some(u) if u.banned => return AuthRejection::Forbidden.into_response(),
        Some(_) => {}
    }

    let rx = state.events.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, rx))
}

/// Wait for the next event addressed to `user_id`, skipping everyone
/// else's. `None` once the channel is closed.
pub(crate) async fn next_own_event(
    user_id: &str,
    rx: &mut broadcast::Receiver<UserEvent>,
) -> Option<SyncEvent> {
    loop {
        match rx.recv().await {
            Ok(UserEvent { user_id: owner, event }) if owner == user_id => return Some(event),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("WS subscriber lagged by {n} messages");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

async fn handle_socket(
    socket: WebSocket,
    user_id: String,
    mut rx: broadcast::Receiver<UserEvent>,
) {
    let (mut sink, mut stream) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(event) = next_own_event(&user_id, &mut rx).await {
            let json = match serde_json::to_string(&event) {
                Ok(j) => j,
                Err(e) => {
                    warn!("WS serialise error: {e}");
                    continue;
                }
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Nothing is read from the client; keep the socket open until it closes.
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(m) => debug!("WS recv (ignored): {m:?}"),
        }
    }

    send_task.abort();
}
