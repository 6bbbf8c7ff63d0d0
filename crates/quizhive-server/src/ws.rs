//! Player WebSocket endpoint: join on upgrade, dispatch inbound messages,
//! one cleanup path when the socket goes away.

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use quizhive_core::{ClientMessage, ConnectionId, GameCode, GameEvent};

use crate::server::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Close code for a refused join (policy violation).
const CLOSE_POLICY_VIOLATION: u16 = 1008;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((game_code, nickname)): Path<(String, String)>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, game_code, nickname))
}

async fn handle_socket(socket: WebSocket, state: AppState, game_code: String, nickname: String) {
    let code = match GameCode::parse(game_code) {
        Ok(code) => code,
        Err(err) => {
            reject(socket, &err.to_string()).await;
            return;
        }
    };

    let (connection_id, rx) = state.registry.register(code.clone());
    let outcome = match state.store.join_session(&code, &nickname, connection_id.clone()) {
        Ok(outcome) => outcome,
        Err(err) => {
            state.registry.unregister(&connection_id);
            reject(socket, &err.to_string()).await;
            return;
        }
    };

    tracing::info!(code = %code, nickname, connection_id = %connection_id, "websocket connected");

    let (ws_tx, ws_rx) = socket.split();
    let writer = tokio::spawn(write_loop(ws_tx, rx));

    state.registry.send_event(
        &connection_id,
        &GameEvent::Connected {
            message: outcome.message().to_owned(),
            nickname: nickname.clone(),
        },
    );
    state.registry.broadcast_event(
        &code,
        &GameEvent::PlayerJoined {
            nickname: nickname.clone(),
        },
    );

    read_loop(ws_rx, &state, &code, &nickname, &connection_id).await;

    // Sole cleanup path for a joined connection. Unregistering closes the
    // outbound queue, which ends the writer task.
    state.registry.unregister(&connection_id);
    if let Some(dropped) = state.store.disconnect_player(&connection_id) {
        state.registry.broadcast_event(
            &dropped.code,
            &GameEvent::PlayerDisconnected {
                nickname: dropped.nickname,
            },
        );
    }
    let _ = writer.await;
}

/// Tell a refused socket why, then close it with a policy code.
async fn reject(mut socket: WebSocket, message: &str) {
    let event = GameEvent::Error {
        message: message.to_owned(),
    };
    if let Ok(json) = serde_json::to_string(&event) {
        let _ = socket.send(WsMessage::Text(json.into())).await;
    }
    let _ = socket
        .send(WsMessage::Close(Some(CloseFrame {
            code: CLOSE_POLICY_VIOLATION,
            reason: message.to_owned().into(),
        })))
        .await;
}

/// Drain the outbound queue onto the socket, interleaved with protocol
/// pings. A failed write means the socket is dead either way.
async fn write_loop(mut ws_tx: SplitSink<WebSocket, WsMessage>, mut rx: mpsc::Receiver<String>) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(text) => {
                        if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = heartbeat.tick() => {
                if ws_tx.send(WsMessage::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn read_loop(
    mut ws_rx: SplitStream<WebSocket>,
    state: &AppState,
    code: &GameCode,
    nickname: &str,
    connection_id: &ConnectionId,
) {
    while let Some(Ok(msg)) = ws_rx.next().await {
        match msg {
            WsMessage::Text(text) => {
                dispatch_client_message(state, code, nickname, connection_id, text.as_str());
            }
            WsMessage::Close(_) => break,
            // axum answers protocol pings itself
            _ => {}
        }
    }
}

/// One inbound frame. Malformed frames earn an error event and the
/// connection lives on.
fn dispatch_client_message(
    state: &AppState,
    code: &GameCode,
    nickname: &str,
    connection_id: &ConnectionId,
    raw: &str,
) {
    let message: ClientMessage = match serde_json::from_str(raw) {
        Ok(message) => message,
        Err(_) => {
            tracing::debug!(code = %code, nickname, "unrecognized frame");
            state.registry.send_event(
                connection_id,
                &GameEvent::Error {
                    message: "unrecognized message".to_owned(),
                },
            );
            return;
        }
    };

    match message {
        ClientMessage::SubmitAnswer { answer } => {
            let success = state.store.submit_answer(code, nickname, &answer);
            state
                .registry
                .send_event(connection_id, &GameEvent::AnswerSubmitted { success });
            if success {
                if let Some(progress) = state.store.question_progress(code) {
                    state.registry.broadcast_event(
                        code,
                        &GameEvent::AnswerReceived {
                            nickname: nickname.to_owned(),
                            answers_count: progress.answers_count,
                            total_players: progress.total_players,
                        },
                    );
                }
            }
        }
        ClientMessage::Ping => {
            state.registry.send_event(connection_id, &GameEvent::Pong);
        }
    }
}
