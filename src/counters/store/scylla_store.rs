use async_trait::async_trait;
use scylla::client::session::Session;
use scylla::errors::{DbError, ExecutionError, RequestAttemptError};
use scylla::statement::batch::{Batch, BatchType};
use scylla::value::Counter;
use std::collections::HashSet;
use std::sync::Arc;

use crate::counters::core::{CounterMutation, CounterTransaction, CounterUpdater};
use crate::domain::follow::CounterError;

// ============================================================================
// ScyllaDB Counter Store
// ============================================================================
//
// Tables:
// - users          (uid PRIMARY KEY)             existence of a user record
// - user_counters  (uid PRIMARY KEY, counters)   relative increments only
//
// A transaction is:
// 1. One existence lookup for both users (counter UPDATEs would otherwise
//    silently create rows for unknown users)
// 2. One COUNTER batch holding both `col = col + ?` statements
//
// The batch is UNLOGGED: across two partitions it can land partially, and
// a timed-out batch may have landed. Timeouts on it surface as
// `OutcomeUnknown` and are never retried.
//
// ============================================================================

pub struct ScyllaCounterStore {
    session: Arc<Session>,
}

impl ScyllaCounterStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    async fn ensure_users_exist(&self, transaction: &CounterTransaction) -> Result<(), CounterError> {
        let uids: Vec<String> = transaction
            .mutations()
            .iter()
            .map(|m| m.user.as_str().to_string())
            .collect();

        let result = self
            .session
            .query_unpaged("SELECT uid FROM users WHERE uid IN ?", (uids.clone(),))
            .await
            .map_err(classify_read_error)?;

        let rows_result = result
            .into_rows_result()
            .map_err(|e| CounterError::Store(format!("Result conversion error: {}", e)))?;

        let mut found = HashSet::new();
        for row in rows_result
            .rows::<(String,)>()
            .map_err(|e| CounterError::Store(e.to_string()))?
        {
            let (uid,) = row.map_err(|e| CounterError::Store(e.to_string()))?;
            found.insert(uid);
        }

        // Target first so a missing target is reported before a missing follower
        match uids.into_iter().find(|uid| !found.contains(uid)) {
            Some(uid) => Err(CounterError::UserNotFound { uid }),
            None => Ok(()),
        }
    }
}

fn increment_statement(mutation: &CounterMutation) -> String {
    let column = mutation.field.column();
    format!(
        "UPDATE user_counters SET {column} = {column} + ? WHERE uid = ?",
        column = column
    )
}

#[async_trait]
impl CounterUpdater for ScyllaCounterStore {
    async fn apply(&self, transaction: &CounterTransaction) -> Result<(), CounterError> {
        self.ensure_users_exist(transaction).await?;

        let target_query = increment_statement(&transaction.target);
        let follower_query = increment_statement(&transaction.follower);

        let mut batch = Batch::new(BatchType::Counter);
        batch.append_statement(target_query.as_str());
        batch.append_statement(follower_query.as_str());

        let values = (
            (
                Counter(transaction.target.delta),
                transaction.target.user.as_str().to_string(),
            ),
            (
                Counter(transaction.follower.delta),
                transaction.follower.user.as_str().to_string(),
            ),
        );

        self.session
            .batch(&batch, values)
            .await
            .map_err(classify_batch_error)?;

        tracing::debug!(
            target_uid = %transaction.target.user,
            follower_uid = %transaction.follower.user,
            delta = transaction.target.delta,
            "Committed counter batch"
        );

        Ok(())
    }
}

/// Existence lookups are reads, so a timeout there is safe to retry
fn classify_read_error(error: ExecutionError) -> CounterError {
    classify_execution_error(error, CounterError::Unavailable)
}

/// A timed-out counter batch may already be applied on some replicas
fn classify_batch_error(error: ExecutionError) -> CounterError {
    classify_execution_error(error, CounterError::OutcomeUnknown)
}

/// Map driver errors onto the retryable / non-retryable taxonomy
fn classify_execution_error(
    error: ExecutionError,
    on_timeout: fn(String) -> CounterError,
) -> CounterError {
    let message = error.to_string();

    match error {
        ExecutionError::LastAttemptError(RequestAttemptError::DbError(db_error, _)) => {
            match db_error {
                DbError::WriteTimeout { .. } | DbError::ReadTimeout { .. } => on_timeout(message),
                // Hot partition throttled by the coordinator, nothing written
                DbError::RateLimitReached { rejected_by_coordinator: true, .. } => {
                    CounterError::Contention(message)
                }
                // Rejected by the coordinator before any replica wrote
                DbError::Unavailable { .. }
                | DbError::Overloaded
                | DbError::IsBootstrapping => CounterError::Unavailable(message),
                _ => CounterError::Store(message),
            }
        }
        ExecutionError::RequestTimeout(_) => on_timeout(message),
        ExecutionError::ConnectionPoolError(_)
        | ExecutionError::EmptyPlan => CounterError::Unavailable(message),
        _ => CounterError::Store(message),
    }
}
