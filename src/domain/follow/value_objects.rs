use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::CounterError;

// ============================================================================
// Follow Value Objects
// ============================================================================

/// Identifier of a user record (the `uid` of the `users` table)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(uid: impl Into<String>) -> Result<Self, CounterError> {
        let uid = uid.into();

        if uid.is_empty() {
            return Err(CounterError::InvalidEdge("user id cannot be empty".to_string()));
        }
        if uid.trim() != uid {
            return Err(CounterError::InvalidEdge(format!(
                "user id has surrounding whitespace: {:?}",
                uid
            )));
        }

        Ok(Self(uid))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = CounterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

/// Denormalized counter columns on a user record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterField {
    FollowersCount,
    FollowingCount,
}

impl CounterField {
    /// Column name in `user_counters`
    pub fn column(&self) -> &'static str {
        match self {
            CounterField::FollowersCount => "followers_count",
            CounterField::FollowingCount => "following_count",
        }
    }
}

impl fmt::Display for CounterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_accepts_plain_uid() {
        let uid = UserId::new("U1").unwrap();
        assert_eq!(uid.as_str(), "U1");
        assert_eq!(uid.to_string(), "U1");
    }

    #[test]
    fn test_user_id_rejects_empty() {
        assert!(matches!(UserId::new(""), Err(CounterError::InvalidEdge(_))));
    }

    #[test]
    fn test_user_id_rejects_padded_uid() {
        assert!(matches!(UserId::new(" U1"), Err(CounterError::InvalidEdge(_))));
        assert!(matches!(UserId::new("U1\n"), Err(CounterError::InvalidEdge(_))));
    }

    #[test]
    fn test_user_id_deserialization_validates() {
        let ok: UserId = serde_json::from_str("\"alice\"").unwrap();
        assert_eq!(ok.as_str(), "alice");

        let bad: Result<UserId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_counter_field_columns() {
        assert_eq!(CounterField::FollowersCount.column(), "followers_count");
        assert_eq!(CounterField::FollowingCount.column(), "following_count");
    }
}
