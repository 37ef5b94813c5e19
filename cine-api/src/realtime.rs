use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::state::AppState;

/// Client -> server frames.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Watch { showing_id: Uuid },
    Unwatch { showing_id: Uuid },
}

/// Server -> client frames.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    SeatsChanged {
        showing_id: Uuid,
        reserved_seat_ids: Vec<Uuid>,
        released_seat_ids: Vec<Uuid>,
    },
    Error {
        message: String,
    },
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/ws", get(ws_handler))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One connection may watch any number of showings. Events are deltas only;
/// a client joining a room must fetch authoritative occupancy first.
async fn handle_socket(socket: WebSocket, state: AppState) {
    info!("websocket client connected");
    let (mut sink, mut stream) = socket.split();

    // Single writer draining an outbound queue shared by every watch task
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(64);
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let Ok(json) = serde_json::to_string(&msg) else {
                continue;
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut watches: HashMap<Uuid, JoinHandle<()>> = HashMap::new();

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Watch { showing_id }) => {
                                if watches.contains_key(&showing_id) {
                                    continue;
                                }
                                let task = spawn_watch(&state, showing_id, out_tx.clone());
                                watches.insert(showing_id, task);
                            }
                            Ok(ClientMessage::Unwatch { showing_id }) => {
                                if let Some(task) = watches.remove(&showing_id) {
                                    task.abort();
                                    state.hub.leave(showing_id);
                                    debug!(%showing_id, "client stopped watching");
                                }
                            }
                            Err(e) => {
                                let _ = out_tx
                                    .send(ServerMessage::Error {
                                        message: format!("unrecognized message: {}", e),
                                    })
                                    .await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
            _ = &mut write_task => break,
        }
    }

    for (showing_id, task) in watches.drain() {
        task.abort();
        state.hub.leave(showing_id);
    }
    write_task.abort();
    info!("websocket client disconnected");
}

fn spawn_watch(
    state: &AppState,
    showing_id: Uuid,
    out_tx: mpsc::Sender<ServerMessage>,
) -> JoinHandle<()> {
    let mut room = state.hub.join(showing_id);
    debug!(%showing_id, "client watching showing");

    tokio::spawn(async move {
        loop {
            match room.recv().await {
                Ok(event) => {
                    let msg = ServerMessage::SeatsChanged {
                        showing_id: event.showing_id,
                        reserved_seat_ids: event.reserved_seat_ids,
                        released_seat_ids: event.released_seat_ids,
                    };
                    if out_tx.send(msg).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // Deltas were dropped; the client must resync from the
                    // availability endpoint before applying further patches
                    let _ = out_tx
                        .send(ServerMessage::Error {
                            message: format!(
                                "missed {} update(s); refetch seat availability",
                                missed
                            ),
                        })
                        .await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
