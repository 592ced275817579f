//! Conversation index: the unordered pair key shared by both participants.

use crate::models::Message;

/// Identifies a one-to-one conversation independent of direction.
///
/// `PairKey::new(a, b) == PairKey::new(b, a)`. Messages keep their
/// direction in storage; the key only matters when querying.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    low: String,
    high: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self {
                low: a.to_string(),
                high: b.to_string(),
            }
        } else {
            Self {
                low: b.to_string(),
                high: a.to_string(),
            }
        }
    }

    pub fn low(&self) -> &str {
        &self.low
    }

    pub fn high(&self) -> &str {
        &self.high
    }

    /// True when `{sender, receiver}` is this pair in either direction.
    pub fn matches(&self, sender_id: &str, receiver_id: &str) -> bool {
        (sender_id == self.low && receiver_id == self.high)
            || (sender_id == self.high && receiver_id == self.low)
    }
}

impl std::fmt::Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}

impl Message {
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(&self.sender_id, &self.receiver_id)
    }
}
