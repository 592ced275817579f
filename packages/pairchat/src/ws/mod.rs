//! Live chat over WebSocket
//!
//! - `registry`: which connections are live
//! - `hub`: persist a message, then fan it out to every live connection
//! - `handler`/`dispatch`: the per-connection socket loop

pub(crate) mod dispatch;
mod handler;
mod hub;
mod protocol;
mod registry;

pub use handler::handle_chat_ws;
pub use hub::BroadcastHub;
pub use protocol::{ClientMessage, ServerMessage};
pub use registry::{ConnectionRegistry, DEFAULT_CONNECTION_BUFFER};
