use chrono::{DateTime, TimeZone, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::conversation::PairKey;
use crate::error::{ChatError, Result};
use crate::models::{Appended, Message, NewMessage};

use super::ChatRepository;

/// Millisecond wall clock that never runs backwards within the process.
#[derive(Debug, Default)]
pub(crate) struct MonotonicClock {
    last_ms: AtomicI64,
}

impl MonotonicClock {
    pub fn now_millis(&self) -> i64 {
        let wall = Utc::now().timestamp_millis();
        let prev = self.last_ms.fetch_max(wall, Ordering::SeqCst);
        prev.max(wall)
    }
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

fn row_to_message(r: &SqliteRow) -> Message {
    Message {
        id: r.get("id"),
        uuid: r.get("uuid"),
        sender_id: r.get("sender_id"),
        receiver_id: r.get("receiver_id"),
        body: r.get("body"),
        sent_at: millis_to_datetime(r.get("sent_at")),
    }
}

impl ChatRepository {
    /// Durably record a message.
    ///
    /// The store assigns `id`, and `sent_at` when the caller did not supply
    /// one. A message whose `uuid` was already recorded is not written
    /// again; the stored original comes back with `duplicate = true`.
    pub async fn append(&self, new: &NewMessage) -> Result<Appended> {
        let sent_at_ms = match new.sent_at {
            Some(t) => t.timestamp_millis(),
            None => self.clock.now_millis(),
        };
        let uuid = new
            .uuid
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO messages (uuid, sender_id, receiver_id, body, sent_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(uuid) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&uuid)
        .bind(&new.sender_id)
        .bind(&new.receiver_id)
        .bind(&new.body)
        .bind(sent_at_ms)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(id) => Ok(Appended {
                message: Message {
                    id,
                    uuid,
                    sender_id: new.sender_id.clone(),
                    receiver_id: new.receiver_id.clone(),
                    body: new.body.clone(),
                    sent_at: millis_to_datetime(sent_at_ms),
                },
                duplicate: false,
            }),
            None => {
                let existing = self
                    .get_message_by_uuid(&uuid)
                    .await?
                    .ok_or_else(|| ChatError::NotFound(format!("message {}", uuid)))?;
                if existing.sender_id != new.sender_id
                    || existing.receiver_id != new.receiver_id
                    || existing.body != new.body
                {
                    return Err(ChatError::Conflict(format!(
                        "uuid {} already used by another message",
                        uuid
                    )));
                }
                Ok(Appended {
                    message: existing,
                    duplicate: true,
                })
            }
        }
    }

    /// Every message between `user_a` and `user_b`, in either direction,
    /// oldest first. Equal timestamps keep insertion order.
    pub async fn history(&self, user_a: &str, user_b: &str) -> Result<Vec<Message>> {
        let key = PairKey::new(user_a, user_b);
        let rows = sqlx::query(
            r#"
            SELECT id, uuid, sender_id, receiver_id, body, sent_at
            FROM messages
            WHERE (sender_id = ? AND receiver_id = ?)
               OR (sender_id = ? AND receiver_id = ?)
            ORDER BY sent_at ASC, id ASC
            "#,
        )
        .bind(key.low())
        .bind(key.high())
        .bind(key.high())
        .bind(key.low())
        .fetch_all(&self.pool)
        .await?;

        let messages: Vec<Message> = rows.iter().map(row_to_message).collect();
        debug_assert!(
            messages
                .iter()
                .all(|m| key.matches(&m.sender_id, &m.receiver_id))
        );
        Ok(messages)
    }

    pub async fn get_message_by_uuid(&self, uuid: &str) -> Result<Option<Message>> {
        let row = sqlx::query(
            r#"
            SELECT id, uuid, sender_id, receiver_id, body, sent_at
            FROM messages
            WHERE uuid = ?
            "#,
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_message))
    }
}
