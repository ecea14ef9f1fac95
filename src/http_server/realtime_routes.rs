//! Realtime WebSocket Route
//!
//! One WebSocket connection per viewer session. The client joins and leaves
//! poll rooms over the socket; accepted votes and lifecycle closes arrive as
//! `tally` messages keyed by `poll_id`.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::poll::TallySnapshot;

use super::server::AppState;

// ==================
// Wire Messages
// ==================

/// Message from the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a poll's room
    Subscribe { poll_id: Uuid },

    /// Leave a poll's room
    Unsubscribe { poll_id: Uuid },

    /// Heartbeat
    Ping,
}

/// Message to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established
    Connected { session_id: String },

    /// Room join confirmed
    Subscribed { poll_id: Uuid },

    /// Room leave confirmed
    Unsubscribed { poll_id: Uuid },

    /// Live tally update; `poll_id` inside the snapshot keys the room
    Tally {
        #[serde(flatten)]
        snapshot: TallySnapshot,
    },

    /// Heartbeat response
    Pong,

    /// Error with a stable reason code
    Error { message: String, code: String },
}

// ==================
// Routes
// ==================

/// Create realtime routes
pub fn realtime_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

/// Handle WebSocket upgrade request
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle one viewer connection until it closes
async fn handle_websocket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4().to_string();
    let mut snapshots = state.hub.connect(&session_id);

    let (mut sender, mut receiver) = socket.split();

    let welcome = ServerMessage::Connected {
        session_id: session_id.clone(),
    };
    if let Ok(json) = serde_json::to_string(&welcome) {
        let _ = sender.send(Message::Text(json.into())).await;
    }

    loop {
        tokio::select! {
            // Client messages
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handle_client_message(client_msg, &state, &session_id).await
                            }
                            Err(e) => ServerMessage::Error {
                                message: format!("Invalid message format: {}", e),
                                code: "invalid_message".to_string(),
                            },
                        };
                        if let Ok(json) = serde_json::to_string(&response) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }

            // Tally pushes from the hub
            snapshot = snapshots.recv() => {
                let Some(snapshot) = snapshot else {
                    break;
                };
                let tally = ServerMessage::Tally { snapshot };
                if let Ok(json) = serde_json::to_string(&tally) {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    // Disconnect drops every room membership for this session
    state.hub.disconnect(&session_id);
    info!(session_id, "websocket session closed");
}

/// Handle a parsed client message
async fn handle_client_message(
    msg: ClientMessage,
    state: &AppState,
    session_id: &str,
) -> ServerMessage {
    match msg {
        ClientMessage::Subscribe { poll_id } => {
            // Rooms only exist for real polls; current state is fetched
            // separately through the snapshot route (no replay on join).
            if let Err(e) = state.store.get_poll(poll_id).await {
                return ServerMessage::Error {
                    message: e.to_string(),
                    code: e.reason_code().to_string(),
                };
            }
            match state.hub.join(session_id, poll_id) {
                Ok(()) => ServerMessage::Subscribed { poll_id },
                Err(e) => ServerMessage::Error {
                    message: e.to_string(),
                    code: "internal".to_string(),
                },
            }
        }

        ClientMessage::Unsubscribe { poll_id } => match state.hub.leave(session_id, poll_id) {
            Ok(()) => ServerMessage::Unsubscribed { poll_id },
            Err(e) => ServerMessage::Error {
                message: e.to_string(),
                code: "internal".to_string(),
            },
        },

        ClientMessage::Ping => ServerMessage::Pong,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::PollOption;

    #[test]
    fn test_client_message_parse() {
        let poll_id = Uuid::new_v4();
        let json = format!(r#"{{"type":"subscribe","poll_id":"{}"}}"#, poll_id);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();

        match msg {
            ClientMessage::Subscribe { poll_id: parsed } => assert_eq!(parsed, poll_id),
            _ => panic!("wrong message type"),
        }
    }

    #[test]
    fn test_ping_parse() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_tally_message_is_keyed_by_poll_id() {
        let poll_id = Uuid::new_v4();
        let msg = ServerMessage::Tally {
            snapshot: TallySnapshot::open(poll_id, vec![PollOption::new("Tea".to_string())]),
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "tally");
        assert_eq!(json["poll_id"], serde_json::json!(poll_id));
        assert_eq!(json["is_open"], true);
    }

    #[test]
    fn test_error_message_serializes_code() {
        let msg = ServerMessage::Error {
            message: "Poll not found".to_string(),
            code: "not_found".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("not_found"));
    }
}
