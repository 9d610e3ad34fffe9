use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::state::AppState;
use crate::screen::Screen;
use crate::viewers::reply_to;

pub async fn ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| viewer_session(socket, state.screen))
}

async fn viewer_session(mut socket: WebSocket, screen: Arc<Screen>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let (id, clients) = screen.viewers.register(Box::new(tx));
    info!(%id, clients, "ws_connected");

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                let Some(text) = outbound else { break };
                if let Err(e) = socket.send(Message::Text(text)).await {
                    debug!(%id, error = %e, "ws send failed");
                    break;
                }
            }
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = reply_to(&text) {
                        if socket.send(Message::Text(reply.to_string())).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(%id, error = %e, "ws_error");
                    break;
                }
            },
        }
    }

    let clients = screen.viewers.unregister(id);
    info!(%id, clients, "ws_disconnected");
}
