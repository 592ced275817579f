pub mod admin;
pub mod health;
pub mod messages;
pub mod users;
pub mod websocket;

// Re-export all handlers for easy route registration
pub use admin::get_database_stats;
pub use health::{health_handler, health_live_handler, health_ready_handler, metrics_handler};
pub use messages::{history_by_day_handler, history_handler, send_message_handler};
pub use users::{list_users_handler, login_handler, register_handler};
pub use websocket::chat_websocket_handler;
