use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::counters::core::{CounterMutation, CounterTransaction, CounterUpdater};
use crate::domain::follow::{CounterError, CounterField, UserId};

// ============================================================================
// In-Memory Counter Store - test double with strict all-or-nothing commits
// ============================================================================

#[derive(Default)]
struct MemoryState {
    users: HashMap<UserId, HashMap<CounterField, i64>>,
    injected_failures: VecDeque<CounterError>,
    committed: Vec<CounterMutation>,
}

#[derive(Default)]
pub struct InMemoryCounterStore {
    state: Mutex<MemoryState>,
}

impl InMemoryCounterStore {
    pub fn with_users(uids: &[&str]) -> Self {
        let store = Self::default();
        for uid in uids {
            store.add_user(uid);
        }
        store
    }

    pub fn add_user(&self, uid: &str) {
        let uid = UserId::new(uid).expect("test user id must be valid");
        self.state.lock().unwrap().users.entry(uid).or_default();
    }

    /// The next transaction aborts with `error` without touching any counter
    pub fn fail_next(&self, error: CounterError) {
        self.state.lock().unwrap().injected_failures.push_back(error);
    }

    pub fn value(&self, uid: &str, field: CounterField) -> i64 {
        let state = self.state.lock().unwrap();
        state
            .users
            .iter()
            .find(|(id, _)| id.as_str() == uid)
            .and_then(|(_, counters)| counters.get(&field).copied())
            .unwrap_or(0)
    }

    pub fn followers(&self, uid: &str) -> i64 {
        self.value(uid, CounterField::FollowersCount)
    }

    pub fn following(&self, uid: &str) -> i64 {
        self.value(uid, CounterField::FollowingCount)
    }

    /// Every mutation committed so far, in commit order
    pub fn committed_mutations(&self) -> Vec<CounterMutation> {
        self.state.lock().unwrap().committed.clone()
    }
}

#[async_trait]
impl CounterUpdater for InMemoryCounterStore {
    async fn apply(&self, transaction: &CounterTransaction) -> Result<(), CounterError> {
        // Let concurrent callers interleave before the commit point
        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap();

        if let Some(error) = state.injected_failures.pop_front() {
            return Err(error);
        }

        for mutation in transaction.mutations() {
            if !state.users.contains_key(&mutation.user) {
                return Err(CounterError::UserNotFound {
                    uid: mutation.user.to_string(),
                });
            }
        }

        for mutation in transaction.mutations() {
            if let Some(counters) = state.users.get_mut(&mutation.user) {
                *counters.entry(mutation.field).or_insert(0) += mutation.delta;
            }
            state.committed.push(mutation.clone());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::follow::FollowEdge;

    #[tokio::test]
    async fn test_commit_applies_both_mutations() {
        let store = InMemoryCounterStore::with_users(&["U1", "U2"]);
        let edge = FollowEdge::parse("U1", "U2").unwrap();

        store.apply(&CounterTransaction::for_edge(&edge, 1)).await.unwrap();

        assert_eq!(store.followers("U1"), 1);
        assert_eq!(store.following("U2"), 1);
        assert_eq!(store.committed_mutations().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_follower_commits_nothing() {
        let store = InMemoryCounterStore::with_users(&["U1"]);
        let edge = FollowEdge::parse("U1", "ghost").unwrap();

        let result = store.apply(&CounterTransaction::for_edge(&edge, 1)).await;

        assert_eq!(result, Err(CounterError::UserNotFound { uid: "ghost".into() }));
        assert_eq!(store.followers("U1"), 0);
        assert!(store.committed_mutations().is_empty());
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let store = InMemoryCounterStore::with_users(&["U1", "U2"]);
        let tx = CounterTransaction::for_edge(&FollowEdge::parse("U1", "U2").unwrap(), 1);
        store.fail_next(CounterError::Contention("conflict".into()));

        assert!(store.apply(&tx).await.is_err());
        assert!(store.apply(&tx).await.is_ok());
        assert_eq!(store.followers("U1"), 1);
    }
}
