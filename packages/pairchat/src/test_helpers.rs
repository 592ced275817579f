use std::sync::Arc;

use crate::AppState;
use crate::config::{IdentityConfig, PairchatConfig};
use crate::db::Database;
use crate::history::HistoryService;
use crate::metrics::ServerMetrics;
use crate::repository::ChatRepository;
use crate::ws::{BroadcastHub, ConnectionRegistry};

/// Build a fully-wired `AppState` backed by an in-memory SQLite database.
///
/// Returns `(AppState, TempDir)`; hold the `TempDir` for the lifetime of the
/// test so the data directory stays valid.
pub async fn test_app_state() -> (AppState, tempfile::TempDir) {
    test_app_state_with_identity(IdentityConfig::default()).await
}

pub async fn test_app_state_with_identity(
    identity: IdentityConfig,
) -> (AppState, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = PairchatConfig::new(Some(tmp.path().to_path_buf())).expect("config");

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");

    crate::db::run_migrations(&pool).await.expect("migrations");

    let metrics = Arc::new(ServerMetrics::new());
    let repository = ChatRepository::new(pool.clone());
    let hub = Arc::new(BroadcastHub::new(
        repository.clone(),
        Arc::new(ConnectionRegistry::default()),
        metrics.clone(),
    ));

    let state = AppState {
        config: Arc::new(config),
        identity: Arc::new(identity),
        metrics,
        db: Arc::new(Database { pool }),
        history: HistoryService::new(repository.clone()),
        repository,
        hub,
    };

    (state, tmp)
}
