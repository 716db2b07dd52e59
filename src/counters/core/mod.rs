// ============================================================================
// Counter Core - Store-agnostic abstractions
// ============================================================================
//
// Nothing here knows about ScyllaDB. Stores implement `CounterUpdater`.
//
// ============================================================================

pub mod updater;

pub use updater::{CounterMutation, CounterTransaction, CounterUpdater};
