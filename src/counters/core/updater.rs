use async_trait::async_trait;

use crate::domain::follow::{CounterError, CounterField, FollowEdge, UserId};

// ============================================================================
// Transactional Counter Updater - Core Abstraction
// ============================================================================
//
// Counters are only ever moved by relative deltas. A transaction carries
// exactly two mutations (target side and follower side) submitted to the
// store as one write.
//
// ============================================================================

/// One relative-increment mutation: `user.field += delta`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterMutation {
    pub user: UserId,
    pub field: CounterField,
    pub delta: i64,
}

impl CounterMutation {
    pub fn new(user: UserId, field: CounterField, delta: i64) -> Self {
        Self { user, field, delta }
    }
}

/// The pair of mutations produced by one edge event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterTransaction {
    pub target: CounterMutation,
    pub follower: CounterMutation,
}

impl CounterTransaction {
    /// `target.followers_count += delta` and `follower.following_count += delta`
    pub fn for_edge(edge: &FollowEdge, delta: i64) -> Self {
        Self {
            target: CounterMutation::new(
                edge.target_uid.clone(),
                CounterField::FollowersCount,
                delta,
            ),
            follower: CounterMutation::new(
                edge.follower_uid.clone(),
                CounterField::FollowingCount,
                delta,
            ),
        }
    }

    pub fn mutations(&self) -> [&CounterMutation; 2] {
        [&self.target, &self.follower]
    }
}

/// Submits both mutations of a counter transaction as one write.
///
/// Returns `Ok(())` only once both mutations are committed. What an error
/// leaves behind depends on the store:
/// - `InMemoryCounterStore`: nothing, the transaction is all-or-nothing.
/// - `ScyllaCounterStore`: nothing for `UserNotFound` and for rejections
///   before the write (`Unavailable`, `Contention`). After `OutcomeUnknown`
///   one, both or neither mutation may have landed.
#[async_trait]
pub trait CounterUpdater: Send + Sync {
    async fn apply(&self, transaction: &CounterTransaction) -> Result<(), CounterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_for_created_edge() {
        let edge = FollowEdge::parse("U1", "U2").unwrap();
        let tx = CounterTransaction::for_edge(&edge, 1);

        assert_eq!(tx.target.user.as_str(), "U1");
        assert_eq!(tx.target.field, CounterField::FollowersCount);
        assert_eq!(tx.target.delta, 1);

        assert_eq!(tx.follower.user.as_str(), "U2");
        assert_eq!(tx.follower.field, CounterField::FollowingCount);
        assert_eq!(tx.follower.delta, 1);
    }

    #[test]
    fn test_transaction_always_has_two_mutations() {
        let edge = FollowEdge::parse("U1", "U1").unwrap();
        let tx = CounterTransaction::for_edge(&edge, -1);

        let mutations = tx.mutations();
        assert_eq!(mutations.len(), 2);
        assert!(mutations.iter().all(|m| m.delta == -1));
        assert_ne!(mutations[0].field, mutations[1].field);
    }
}
