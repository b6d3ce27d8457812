//! Presence endpoints: a snapshot route and a push WebSocket

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::watch;

use super::ApiState;
use crate::reaction::Presence;

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/presence", get(snapshot))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

/// Current speaking state
async fn snapshot(State(state): State<Arc<ApiState>>) -> Json<Presence> {
    Json(state.presence.borrow().clone())
}

async fn ws_upgrade(State(state): State<Arc<ApiState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let presence = state.presence.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, presence))
}

/// Push the current presence, then every change, until either side hangs up
async fn handle_socket(socket: WebSocket, mut presence: watch::Receiver<Presence>) {
    let (mut sender, mut receiver) = socket.split();

    tracing::debug!("overlay connected");

    let mut send_task = tokio::spawn(async move {
        loop {
            let current = presence.borrow_and_update().clone();
            let Ok(text) = serde_json::to_string(&current) else {
                break;
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
            if presence.changed().await.is_err() {
                break;
            }
        }
    });

    // Overlays only listen; drain until close
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::debug!("overlay disconnected");
}
