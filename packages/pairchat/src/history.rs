//! Conversation history: read a pair's messages from the store and bucket
//! them by calendar day for display.

use chrono::{FixedOffset, NaiveDate};
use std::collections::HashMap;

use crate::error::Result;
use crate::models::{DayGroup, Message};
use crate::repository::ChatRepository;

/// Largest UTC offset accepted for a viewer's calendar (±18h, per RFC 3339 practice).
pub const MAX_OFFSET_MINUTES: i32 = 18 * 60;

#[derive(Clone)]
pub struct HistoryService {
    store: ChatRepository,
}

impl HistoryService {
    pub fn new(store: ChatRepository) -> Self {
        Self { store }
    }

    /// All messages between `viewer_id` and `peer_id`, oldest first.
    /// Self-conversations are allowed.
    pub async fn open_conversation(&self, viewer_id: &str, peer_id: &str) -> Result<Vec<Message>> {
        self.store.history(viewer_id, peer_id).await
    }
}

/// Resolve a viewer offset in minutes east of UTC.
pub fn viewer_offset(minutes: i32) -> Option<FixedOffset> {
    if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(minutes * 60)
}

/// The calendar day of `message` as seen from `offset`.
pub fn day_key(message: &Message, offset: &FixedOffset) -> NaiveDate {
    message.sent_at.with_timezone(offset).date_naive()
}

/// Partition messages into day buckets.
///
/// Buckets appear in order of their first message; messages keep their
/// relative order inside a bucket. A day that shows up again later joins
/// its existing bucket.
pub fn group_by_day(messages: &[Message], offset: &FixedOffset) -> Vec<DayGroup> {
    let mut groups: Vec<DayGroup> = Vec::new();
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();

    for msg in messages {
        let day = day_key(msg, offset);
        match index.get(&day) {
            Some(&i) => groups[i].messages.push(msg.clone()),
            None => {
                index.insert(day, groups.len());
                groups.push(DayGroup {
                    day,
                    messages: vec![msg.clone()],
                });
            }
        }
    }

    groups
}

/// Concatenate buckets back into a single sequence.
pub fn flatten(groups: &[DayGroup]) -> Vec<Message> {
    groups
        .iter()
        .flat_map(|g| g.messages.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewMessage;
    use crate::repository::test_helpers;
    use chrono::{DateTime, TimeZone, Utc};

    fn msg(id: i64, rfc3339: &str) -> Message {
        Message {
            id,
            uuid: format!("m-{}", id),
            sender_id: "a".into(),
            receiver_id: "b".into(),
            body: format!("body {}", id),
            sent_at: DateTime::parse_from_rfc3339(rfc3339)
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    fn utc() -> FixedOffset {
        viewer_offset(0).unwrap()
    }

    #[test]
    fn groups_consecutive_days() {
        let messages = vec![
            msg(1, "2024-03-01T09:00:00Z"),
            msg(2, "2024-03-01T23:59:59Z"),
            msg(3, "2024-03-02T00:00:00Z"),
        ];
        let groups = group_by_day(&messages, &utc());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].day, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(groups[0].messages.len(), 2);
        assert_eq!(groups[1].messages[0].id, 3);
    }

    #[test]
    fn day_key_follows_viewer_offset() {
        let m = msg(1, "2024-03-01T23:30:00Z");
        let tokyo = viewer_offset(9 * 60).unwrap();
        let new_york = viewer_offset(-5 * 60).unwrap();
        assert_eq!(
            day_key(&m, &tokyo),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
        assert_eq!(
            day_key(&m, &new_york),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn offset_shifts_bucket_boundaries() {
        let messages = vec![
            msg(1, "2024-03-01T20:00:00Z"),
            msg(2, "2024-03-02T02:00:00Z"),
        ];
        assert_eq!(group_by_day(&messages, &utc()).len(), 2);
        let pacific = viewer_offset(-8 * 60).unwrap();
        assert_eq!(group_by_day(&messages, &pacific).len(), 1);
    }

    #[test]
    fn empty_input_no_groups() {
        assert!(group_by_day(&[], &utc()).is_empty());
    }

    #[test]
    fn recurring_day_joins_first_bucket() {
        let messages = vec![
            msg(1, "2024-03-02T10:00:00Z"),
            msg(2, "2024-03-01T10:00:00Z"),
            msg(3, "2024-03-02T11:00:00Z"),
        ];
        let groups = group_by_day(&messages, &utc());
        assert_eq!(groups.len(), 2);
        let ids: Vec<i64> = groups[0].messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn grouping_is_idempotent() {
        let messages = vec![
            msg(1, "2024-03-01T09:00:00Z"),
            msg(2, "2024-03-02T09:00:00Z"),
            msg(3, "2024-03-01T10:00:00Z"),
            msg(4, "2024-03-03T09:00:00Z"),
            msg(5, "2024-03-02T10:00:00Z"),
        ];
        let once = group_by_day(&messages, &utc());
        let twice = group_by_day(&flatten(&once), &utc());
        assert_eq!(once, twice);
    }

    #[test]
    fn offset_bounds() {
        assert!(viewer_offset(MAX_OFFSET_MINUTES).is_some());
        assert!(viewer_offset(-MAX_OFFSET_MINUTES).is_some());
        assert!(viewer_offset(MAX_OFFSET_MINUTES + 1).is_none());
        assert!(viewer_offset(-MAX_OFFSET_MINUTES - 1).is_none());
        assert!(viewer_offset(i32::MIN).is_none());
        assert!(viewer_offset(i32::MAX).is_none());
        assert_eq!(viewer_offset(330).unwrap().local_minus_utc(), 330 * 60);
    }

    #[tokio::test]
    async fn open_conversation_reads_store() {
        let repo = test_helpers::test_repository().await;
        let service = HistoryService::new(repo.clone());
        let t = |s: i64| Utc.timestamp_opt(s, 0).unwrap();

        repo.append(&NewMessage::new("viewer", "peer", "hi").at(t(100)))
            .await
            .unwrap();
        repo.append(&NewMessage::new("peer", "viewer", "hey").at(t(200)))
            .await
            .unwrap();
        repo.append(&NewMessage::new("peer", "other", "unrelated").at(t(150)))
            .await
            .unwrap();

        let conversation = service.open_conversation("viewer", "peer").await.unwrap();
        let bodies: Vec<_> = conversation.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["hi", "hey"]);

        assert!(
            service
                .open_conversation("nobody", "peer")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn self_conversation_behaves_like_any_pair() {
        let repo = test_helpers::test_repository().await;
        let service = HistoryService::new(repo.clone());
        repo.append(&NewMessage::new("me", "me", "reminder"))
            .await
            .unwrap();
        let conversation = service.open_conversation("me", "me").await.unwrap();
        assert_eq!(conversation.len(), 1);
    }
}
