use crate::utils::IsTransient;

// ============================================================================
// Counter Update Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CounterError {
    #[error("Transaction aborted by a concurrent update: {0}")]
    Contention(String),

    #[error("Counter store unavailable: {0}")]
    Unavailable(String),

    #[error("User record not found: {uid}")]
    UserNotFound { uid: String },

    #[error("Invalid follow edge: {0}")]
    InvalidEdge(String),

    /// The write timed out and may or may not have been applied. Counter
    /// increments are not idempotent, so this is never retried.
    #[error("Counter write outcome unknown: {0}")]
    OutcomeUnknown(String),

    #[error("Counter store error: {0}")]
    Store(String),
}

impl CounterError {
    /// Short label used for metrics and structured logs
    pub fn reason(&self) -> &'static str {
        match self {
            CounterError::Contention(_) => "contention",
            CounterError::Unavailable(_) => "unavailable",
            CounterError::UserNotFound { .. } => "user_not_found",
            CounterError::InvalidEdge(_) => "invalid_edge",
            CounterError::OutcomeUnknown(_) => "outcome_unknown",
            CounterError::Store(_) => "store_error",
        }
    }
}

impl IsTransient for CounterError {
    fn is_transient(&self) -> bool {
        matches!(self, CounterError::Contention(_) | CounterError::Unavailable(_))
    }
}
