// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// HTTP surface
//
// GET /v1/heartbeat         -> 200 OK
// GET /v1/chat?session=<id> -> WebSocket carrying the event channel
//
// Each connection gets one session. Outbound events go through a bounded
// channel to a writer task; inbound user messages are handled one at a
// time.

use crate::engine::ChatEngine;
use crate::events::OutboundEvent;
use crate::stream::RequestOutcome;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outbound events buffered per connection before the engine waits on
/// the socket.
const EVENT_BUFFER: usize = 64;

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Shared state injected into axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
}

// ---------------------------------------------------------------------------
// Inbound messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum InboundMessage {
    UserMessage { text: String },
}

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub session: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Heartbeat endpoint: GET /v1/heartbeat -> 200 OK
pub async fn heartbeat() -> StatusCode {
    StatusCode::OK
}

pub async fn chat_socket(
    ws: WebSocketUpgrade,
    Query(query): Query<ChatQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket: WebSocket| {
        let (sender, receiver) = socket.split();
        serve_connection(sender, receiver, state.engine, query.session)
    })
}

/// Run one connection until the client leaves.
pub(crate) async fn serve_connection<S, R>(
    mut sender: S,
    mut receiver: R,
    engine: Arc<ChatEngine>,
    requested_session: Option<String>,
) where
    S: Sink<WsMessage> + Unpin + Send + 'static,
    R: Stream<Item = Result<WsMessage, axum::Error>> + Unpin + Send,
{
    let (tx, mut rx) = mpsc::channel::<OutboundEvent>(EVENT_BUFFER);

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(event = event.name(), error = %e, "failed to serialize event");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let opened = engine.open_session(requested_session.as_deref());
    let session_id = opened.state.session_id.clone();

    let mut greeting = vec![OutboundEvent::SessionId(session_id.clone())];
    if opened.resumed {
        greeting.push(OutboundEvent::SessionHistory(opened.state.history));
    }
    for event in greeting {
        if tx.send(event).await.is_err() {
            return;
        }
    }

    while let Some(message) = receiver.next().await {
        let text = match message {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(%session_id, error = %e, "socket read failed");
                break;
            }
        };

        let inbound = match serde_json::from_str::<InboundMessage>(text.as_str()) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "ignoring malformed client message");
                continue;
            }
        };

        match inbound {
            InboundMessage::UserMessage { text } if text.trim().is_empty() => {
                tracing::debug!(%session_id, "ignoring empty user message");
            }
            InboundMessage::UserMessage { text } => {
                if engine.respond(&session_id, &text, &tx).await == RequestOutcome::Abandoned {
                    break;
                }
            }
        }
    }

    tracing::info!(%session_id, "connection closed");
    drop(tx);
    let _ = writer.await;
}

// ---------------------------------------------------------------------------
// Router construction
// ---------------------------------------------------------------------------

/// Build the axum router. The engine is injected; no hard-coded clients.
pub fn build_router(engine: Arc<ChatEngine>) -> Router {
    let state = AppState { engine };

    Router::new()
        .route("/v1/heartbeat", get(heartbeat))
        .route("/v1/chat", get(chat_socket))
        .with_state(state)
}
