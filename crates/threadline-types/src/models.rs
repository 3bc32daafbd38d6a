use chrono::Utc;
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type PostId = i64;

/// Timestamps are stored and exchanged as milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// A vote is binary. Clients may send any integer; only an exact `-1` counts
/// as a downvote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    pub fn normalize(raw: i64) -> Self {
        if raw == -1 { Self::Down } else { Self::Up }
    }

    /// Interpret a value read back from the `vote` table.
    pub fn from_stored(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Up),
            -1 => Some(Self::Down),
            _ => None,
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_minus_one_is_a_downvote() {
        assert_eq!(VoteValue::normalize(-1), VoteValue::Down);
        assert_eq!(VoteValue::normalize(1), VoteValue::Up);
        assert_eq!(VoteValue::normalize(0), VoteValue::Up);
        assert_eq!(VoteValue::normalize(-5), VoteValue::Up);
        assert_eq!(VoteValue::normalize(42), VoteValue::Up);
    }

    #[test]
    fn stored_values_outside_the_binary_range_are_rejected() {
        assert_eq!(VoteValue::from_stored(1), Some(VoteValue::Up));
        assert_eq!(VoteValue::from_stored(-1), Some(VoteValue::Down));
        assert_eq!(VoteValue::from_stored(2), None);
    }
}
