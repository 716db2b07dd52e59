use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::errors::CounterError;
use super::value_objects::UserId;

// ============================================================================
// Follow Edge Events - Lifecycle notifications for follow edges
// ============================================================================

/// "follower_uid follows target_uid", stored under the target's record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FollowEdge {
    pub target_uid: UserId,
    pub follower_uid: UserId,
}

impl FollowEdge {
    pub fn new(target_uid: UserId, follower_uid: UserId) -> Self {
        Self { target_uid, follower_uid }
    }

    /// Build an edge from raw identifiers (e.g. key columns of a change row)
    pub fn parse(target_uid: &str, follower_uid: &str) -> Result<Self, CounterError> {
        Ok(Self::new(UserId::new(target_uid)?, UserId::new(follower_uid)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeEventKind {
    Created,
    Deleted,
}

impl EdgeEventKind {
    /// Signed adjustment applied to both counters
    pub fn delta(&self) -> i64 {
        match self {
            EdgeEventKind::Created => 1,
            EdgeEventKind::Deleted => -1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeEventKind::Created => "FollowEdgeCreated",
            EdgeEventKind::Deleted => "FollowEdgeDeleted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowEdgeEvent {
    pub event_id: Uuid,
    pub kind: EdgeEventKind,
    pub edge: FollowEdge,
    pub observed_at: DateTime<Utc>,
}

impl FollowEdgeEvent {
    pub fn created(edge: FollowEdge) -> Self {
        Self::new(EdgeEventKind::Created, edge)
    }

    pub fn deleted(edge: FollowEdge) -> Self {
        Self::new(EdgeEventKind::Deleted, edge)
    }

    fn new(kind: EdgeEventKind, edge: FollowEdge) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            kind,
            edge,
            observed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_deltas() {
        assert_eq!(EdgeEventKind::Created.delta(), 1);
        assert_eq!(EdgeEventKind::Deleted.delta(), -1);
    }

    #[test]
    fn test_parse_rejects_blank_follower() {
        let result = FollowEdge::parse("U1", "");
        assert!(matches!(result, Err(CounterError::InvalidEdge(_))));
    }

    #[test]
    fn test_event_payload_keeps_identifiers() {
        let edge = FollowEdge::parse("U1", "U2").unwrap();
        let event = FollowEdgeEvent::deleted(edge);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"target_uid\":\"U1\""));
        assert!(json.contains("\"follower_uid\":\"U2\""));
        assert!(json.contains("Deleted"));

        let parsed: FollowEdgeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_id, event.event_id);
        assert_eq!(parsed.kind, EdgeEventKind::Deleted);
    }
}
