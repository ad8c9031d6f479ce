//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::messaging::ConnectionHub;
use crate::util::rate_limit::ConnectionRateLimiter;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Participant identity the socket speaks for
    pub client_id: Uuid,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    info!(client_id = %query.client_id, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, query.client_id, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, client_id: Uuid, state: AppState) {
    let (connection, outbound) = state.hub.connect(client_id);
    info!(client_id = %client_id, connection, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    run_session(client_id, &state.hub, ws_sink, ws_stream, outbound).await;

    // A replaced connection leaves the newer one alone
    state.hub.disconnect(client_id, connection);

    info!(client_id = %client_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    client_id: Uuid,
    hub: &ConnectionHub,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut outbound: mpsc::Receiver<String>,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Spawn writer task: hub -> WebSocket. Ends when the hub drops the
    // sender (connection replaced) or the socket fails.
    let mut writer_handle = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if let Err(e) = ws_sink.send(Message::Text(text)).await {
                debug!(client_id = %client_id, error = %e, "WebSocket send failed");
                break;
            }
        }
        let _ = ws_sink.close().await;
    });

    // Reader loop: WebSocket -> hub listeners
    loop {
        let result = tokio::select! {
            next = ws_stream.next() => match next {
                Some(result) => result,
                None => break,
            },
            _ = &mut writer_handle => {
                debug!(client_id = %client_id, "Writer finished");
                return;
            }
        };

        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(client_id = %client_id, "Rate limited inbound message");
                    continue;
                }

                if let Err(e) = hub.dispatch(client_id, &text) {
                    debug!(client_id = %client_id, error = %e, "Inbound message dropped");
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(client_id = %client_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(client_id = %client_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(client_id = %client_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Abort writer task
    writer_handle.abort();
}
