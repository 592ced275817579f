use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};

use crate::AppState;
use crate::ws;

/// Chat WebSocket: every upgraded connection joins the broadcast set.
pub async fn chat_websocket_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    let hub = state.hub.clone();
    let history = state.history.clone();
    let metrics = state.metrics.clone();

    ws.on_upgrade(move |socket| ws::handle_chat_ws(socket, hub, history, metrics))
}
