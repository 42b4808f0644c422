use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use relay_protocol::RelayEvent;
use std::net::SocketAddr;
use tokio::sync::broadcast;

use crate::app::AppState;

pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, peer, state))
}

async fn handle_ws(mut socket: WebSocket, peer: SocketAddr, state: AppState) {
    let mut subscription = state.hub.register(peer.to_string()).await;
    let id = subscription.id;
    let connections = state.hub.connection_count().await;
    tracing::info!(
        event = "ws.connected",
        connection_id = %id,
        peer = %peer,
        connections = connections,
        "client connected"
    );

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            event = subscription.rx.recv() => {
                match event {
                    Ok(event) => {
                        if send_ws_event(&mut socket, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            event = "ws.lagged",
                            connection_id = %id,
                            skipped = skipped,
                            "client fell behind; alerts dropped"
                        );
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.hub.unregister(id).await;
    tracing::info!(event = "ws.disconnected", connection_id = %id, "client disconnected");
}

async fn send_ws_event(socket: &mut WebSocket, event: &RelayEvent) -> Result<(), axum::Error> {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(error = %err, "failed to serialize websocket event");
            return Ok(());
        }
    };
    socket.send(Message::Text(payload)).await
}
