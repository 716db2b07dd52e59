use std::sync::Arc;

use crate::counters::{CounterTransaction, CounterUpdater};

use super::errors::CounterError;
use super::events::{EdgeEventKind, FollowEdge, FollowEdgeEvent};

// ============================================================================
// Follow Edge Handlers
// ============================================================================
//
// Orchestrates: Edge event → Counter transaction → Store
//
// Handlers are stateless. They never retry and never compensate: a failed
// transaction is logged with both identifiers and returned unchanged so the
// dispatcher can apply its own redelivery policy.
//
// ============================================================================

/// Reacts to a newly created follow edge: +1 / +1
pub struct EdgeCreatedHandler {
    updater: Arc<dyn CounterUpdater>,
}

impl EdgeCreatedHandler {
    pub fn new(updater: Arc<dyn CounterUpdater>) -> Self {
        Self { updater }
    }

    pub async fn handle(&self, edge: &FollowEdge) -> Result<(), CounterError> {
        apply_edge_delta(self.updater.as_ref(), edge, EdgeEventKind::Created).await
    }
}

/// Reacts to a removed follow edge: -1 / -1
pub struct EdgeDeletedHandler {
    updater: Arc<dyn CounterUpdater>,
}

impl EdgeDeletedHandler {
    pub fn new(updater: Arc<dyn CounterUpdater>) -> Self {
        Self { updater }
    }

    pub async fn handle(&self, edge: &FollowEdge) -> Result<(), CounterError> {
        apply_edge_delta(self.updater.as_ref(), edge, EdgeEventKind::Deleted).await
    }
}

async fn apply_edge_delta(
    updater: &dyn CounterUpdater,
    edge: &FollowEdge,
    kind: EdgeEventKind,
) -> Result<(), CounterError> {
    let transaction = CounterTransaction::for_edge(edge, kind.delta());

    match updater.apply(&transaction).await {
        Ok(()) => {
            tracing::debug!(
                target_uid = %edge.target_uid,
                follower_uid = %edge.follower_uid,
                delta = kind.delta(),
                "Adjusted follow counters"
            );
            Ok(())
        }
        Err(CounterError::UserNotFound { uid }) => {
            tracing::error!(
                event = kind.as_str(),
                target_uid = %edge.target_uid,
                follower_uid = %edge.follower_uid,
                missing_uid = %uid,
                "Follow edge references a missing user record; counters left untouched"
            );
            Err(CounterError::UserNotFound { uid })
        }
        Err(CounterError::OutcomeUnknown(message)) => {
            tracing::error!(
                event = kind.as_str(),
                target_uid = %edge.target_uid,
                follower_uid = %edge.follower_uid,
                error = %message,
                "Counter write timed out and may have been applied; needs reconciliation"
            );
            Err(CounterError::OutcomeUnknown(message))
        }
        Err(error) => {
            tracing::error!(
                event = kind.as_str(),
                target_uid = %edge.target_uid,
                follower_uid = %edge.follower_uid,
                error = %error,
                reason = error.reason(),
                "Counter transaction failed"
            );
            Err(error)
        }
    }
}

/// Explicit subscription point: routes edge lifecycle events to their handler
pub struct FollowEdgeHandlers {
    created: EdgeCreatedHandler,
    deleted: EdgeDeletedHandler,
}

impl FollowEdgeHandlers {
    pub fn new(updater: Arc<dyn CounterUpdater>) -> Self {
        Self {
            created: EdgeCreatedHandler::new(updater.clone()),
            deleted: EdgeDeletedHandler::new(updater),
        }
    }

    pub async fn dispatch(&self, event: &FollowEdgeEvent) -> Result<(), CounterError> {
        match event.kind {
            EdgeEventKind::Created => self.created.handle(&event.edge).await,
            EdgeEventKind::Deleted => self.deleted.handle(&event.edge).await,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::InMemoryCounterStore;
    use futures_util::future::join_all;

    fn edge(target: &str, follower: &str) -> FollowEdge {
        FollowEdge::parse(target, follower).unwrap()
    }

    fn setup(uids: &[&str]) -> (Arc<InMemoryCounterStore>, FollowEdgeHandlers) {
        let store = Arc::new(InMemoryCounterStore::with_users(uids));
        let handlers = FollowEdgeHandlers::new(store.clone());
        (store, handlers)
    }

    #[tokio::test]
    async fn test_created_edge_increments_both_counters() {
        let (store, handlers) = setup(&["U1", "U2"]);

        handlers
            .dispatch(&FollowEdgeEvent::created(edge("U1", "U2")))
            .await
            .unwrap();

        assert_eq!(store.followers("U1"), 1);
        assert_eq!(store.following("U2"), 1);
        // Nothing else moved
        assert_eq!(store.following("U1"), 0);
        assert_eq!(store.followers("U2"), 0);
    }

    #[tokio::test]
    async fn test_deleted_edge_returns_counters_to_zero() {
        let (store, handlers) = setup(&["U1", "U2"]);

        handlers.dispatch(&FollowEdgeEvent::created(edge("U1", "U2"))).await.unwrap();
        handlers.dispatch(&FollowEdgeEvent::deleted(edge("U1", "U2"))).await.unwrap();

        assert_eq!(store.followers("U1"), 0);
        assert_eq!(store.following("U2"), 0);
    }

    #[tokio::test]
    async fn test_concurrent_edges_on_same_target() {
        let (store, handlers) = setup(&["U1", "U2", "U3"]);
        let handlers = Arc::new(handlers);

        let tasks = [edge("U1", "U2"), edge("U1", "U3")].into_iter().map(|e| {
            let handlers = handlers.clone();
            tokio::spawn(async move { handlers.dispatch(&FollowEdgeEvent::created(e)).await })
        });

        for result in join_all(tasks).await {
            result.unwrap().unwrap();
        }

        assert_eq!(store.followers("U1"), 2);
        assert_eq!(store.following("U2"), 1);
        assert_eq!(store.following("U3"), 1);
    }

    #[tokio::test]
    async fn test_each_success_commits_exactly_two_deltas() {
        let (store, handlers) = setup(&["U1", "U2", "U3"]);

        handlers.dispatch(&FollowEdgeEvent::created(edge("U1", "U2"))).await.unwrap();
        assert_eq!(store.committed_mutations().len(), 2);

        handlers.dispatch(&FollowEdgeEvent::deleted(edge("U1", "U2"))).await.unwrap();
        handlers.dispatch(&FollowEdgeEvent::created(edge("U3", "U1"))).await.unwrap();
        assert_eq!(store.committed_mutations().len(), 6);
    }

    #[tokio::test]
    async fn test_failed_transaction_leaves_counters_untouched() {
        let (store, handlers) = setup(&["U1", "U2"]);
        handlers.dispatch(&FollowEdgeEvent::created(edge("U1", "U2"))).await.unwrap();

        store.fail_next(CounterError::Contention("concurrent transaction".into()));
        let result = handlers.dispatch(&FollowEdgeEvent::deleted(edge("U1", "U2"))).await;

        assert_eq!(result, Err(CounterError::Contention("concurrent transaction".into())));
        assert_eq!(store.followers("U1"), 1);
        assert_eq!(store.following("U2"), 1);
        assert_eq!(store.committed_mutations().len(), 2);
    }

    #[tokio::test]
    async fn test_transient_failure_is_returned_unchanged_without_retry() {
        let (store, handlers) = setup(&["U1", "U2"]);
        store.fail_next(CounterError::Unavailable("connection reset".into()));

        let result = handlers.dispatch(&FollowEdgeEvent::created(edge("U1", "U2"))).await;

        assert_eq!(result, Err(CounterError::Unavailable("connection reset".into())));
        assert_eq!(store.followers("U1"), 0);
        assert!(store.committed_mutations().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_outcome_is_returned_unchanged() {
        let (store, handlers) = setup(&["U1", "U2"]);
        store.fail_next(CounterError::OutcomeUnknown("write timeout".into()));

        let result = handlers.dispatch(&FollowEdgeEvent::created(edge("U1", "U2"))).await;

        assert_eq!(result, Err(CounterError::OutcomeUnknown("write timeout".into())));
        assert!(store.committed_mutations().is_empty());
    }

    #[tokio::test]
    async fn test_missing_target_is_reported_distinctly() {
        let (store, handlers) = setup(&["U2"]);

        let result = handlers.dispatch(&FollowEdgeEvent::created(edge("U1", "U2"))).await;

        assert_eq!(result, Err(CounterError::UserNotFound { uid: "U1".into() }));
        assert_eq!(store.following("U2"), 0);
    }

    #[tokio::test]
    async fn test_self_follow_moves_both_fields_of_one_user() {
        let (store, handlers) = setup(&["U1"]);

        handlers.dispatch(&FollowEdgeEvent::created(edge("U1", "U1"))).await.unwrap();

        assert_eq!(store.followers("U1"), 1);
        assert_eq!(store.following("U1"), 1);
    }

    #[tokio::test]
    async fn test_interleaved_creates_and_deletes_sum_to_net_delta() {
        let (store, handlers) = setup(&["T", "F"]);
        let handlers = Arc::new(handlers);

        // 12 creations and 5 deletions for the same edge pair, shuffled
        let mut events: Vec<FollowEdgeEvent> = (0..12)
            .map(|_| FollowEdgeEvent::created(edge("T", "F")))
            .chain((0..5).map(|_| FollowEdgeEvent::deleted(edge("T", "F"))))
            .collect();

        let mut seed: u64 = 0x5eed;
        for i in (1..events.len()).rev() {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let j = (seed >> 33) as usize % (i + 1);
            events.swap(i, j);
        }

        let tasks = events.into_iter().map(|event| {
            let handlers = handlers.clone();
            tokio::spawn(async move { handlers.dispatch(&event).await })
        });

        for result in join_all(tasks).await {
            result.unwrap().unwrap();
        }

        assert_eq!(store.followers("T"), 7);
        assert_eq!(store.following("F"), 7);
    }

    #[tokio::test]
    async fn test_handlers_can_be_used_directly() {
        let store = Arc::new(InMemoryCounterStore::with_users(&["U1", "U2"]));
        let created = EdgeCreatedHandler::new(store.clone());
        let deleted = EdgeDeletedHandler::new(store.clone());

        created.handle(&edge("U1", "U2")).await.unwrap();
        created.handle(&edge("U2", "U1")).await.unwrap();
        deleted.handle(&edge("U1", "U2")).await.unwrap();

        assert_eq!(store.followers("U1"), 0);
        assert_eq!(store.following("U2"), 0);
        assert_eq!(store.followers("U2"), 1);
        assert_eq!(store.following("U1"), 1);
    }
}
