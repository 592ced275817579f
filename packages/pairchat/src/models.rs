use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// === Message models ===

/// A stored direct message. Immutable once the store has assigned `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub uuid: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

/// A message as submitted, before the store has accepted it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMessage {
    pub sender_id: String,
    pub receiver_id: String,
    pub body: String,
    /// Client-assigned send time; the store stamps the current time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    /// Client-generated id used to collapse double submissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

impl NewMessage {
    pub fn new(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            body: body.into(),
            sent_at: None,
            uuid: None,
        }
    }

    pub fn at(mut self, sent_at: DateTime<Utc>) -> Self {
        self.sent_at = Some(sent_at);
        self
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }
}

/// Result of an append: the stored message, and whether its uuid had
/// already been recorded by an earlier submission.
#[derive(Debug, Clone)]
pub struct Appended {
    pub message: Message,
    pub duplicate: bool,
}

/// One calendar day of a conversation, in the viewer's local calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayGroup {
    pub day: chrono::NaiveDate,
    pub messages: Vec<Message>,
}

// === Account models ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: i64,
}

/// Public user info (no email, no password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub display_name: String,
}

impl From<User> for UserInfo {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            display_name: u.display_name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn message_serializes_rfc3339_millis() {
        let msg = Message {
            id: 7,
            uuid: "m-1".into(),
            sender_id: "u1".into(),
            receiver_id: "u2".into(),
            body: "hi".into(),
            sent_at: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["sender_id"], "u1");
        assert_eq!(json["sent_at"], "2023-11-14T22:13:20.123Z");
        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn new_message_optional_fields_default() {
        let msg: NewMessage = serde_json::from_str(
            r#"{"sender_id":"a","receiver_id":"b","body":"yo"}"#,
        )
        .unwrap();
        assert!(msg.sent_at.is_none());
        assert!(msg.uuid.is_none());
    }

    #[test]
    fn user_hides_password_hash() {
        let user = User {
            id: "u1".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            display_name: "alice".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: 0,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        let info = UserInfo::from(user);
        assert_eq!(info.display_name, "alice");
    }
}
