// Repository layer: each domain lives in its own file with `impl ChatRepository`.

use sqlx::sqlite::SqlitePool;
use std::sync::Arc;

mod messages;
mod users;

#[cfg(test)]
pub(crate) mod test_helpers;

use messages::MonotonicClock;

/// Durable store for direct messages and the accounts that send them.
///
/// Cheap to clone; every clone shares the pool and the send-time clock.
#[derive(Clone)]
pub struct ChatRepository {
    pub(crate) pool: SqlitePool,
    clock: Arc<MonotonicClock>,
}

impl ChatRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            clock: Arc::new(MonotonicClock::default()),
        }
    }
}
