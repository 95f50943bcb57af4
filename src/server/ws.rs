//! WebSocket connection handler
//!
//! One handler task per connected client: registers a session on open,
//! forwards queued outbound frames through a writer task, decodes inbound
//! control frames, and tears the session down (cancelling any in-flight
//! run) when the channel closes.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};

use super::AppState;
use crate::protocol::{decode_inbound, ClientFrame, FrameSender};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (sender, mut outbound_rx) = FrameSender::channel();
    let session = state.registry.register(sender);
    let session_id = session.id;

    // Writer task: drain the session's frame queue onto the socket in send
    // order. Stops when the socket or the queue goes away.
    let writer = tokio::spawn(async move {
        while let Some(payload) = outbound_rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match decode_inbound(&text) {
                Some(ClientFrame::Search { query }) => {
                    // The model loads asynchronously at process start; gate
                    // the first run on its readiness. A probe failure is
                    // not fatal here; the run itself will surface the
                    // error on the stream.
                    if let Err(e) = state.loader.ready().await {
                        log::warn!("model readiness probe failed: {}", e);
                    }
                    state.orchestrator.spawn_run(session.clone(), query);
                }
                None => {
                    log::trace!(
                        "session {} sent unrecognized message, ignoring",
                        session_id
                    );
                }
            },
            Ok(Message::Close(_)) => {
                log::info!("session {} requested close", session_id);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("session {} websocket error: {}", session_id, e);
                break;
            }
        }
    }

    // Teardown: evict the session (aborting any in-flight run) and stop the
    // writer. Unregister is idempotent, so a racing sweep is harmless.
    state.registry.unregister(session_id);
    writer.abort();
    log::info!("session {} connection closed", session_id);
}
