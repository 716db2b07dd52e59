// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each domain has its own subdirectory with:
// - Value objects
// - Events
// - Errors
// - Handlers
//
// This layer knows nothing about ScyllaDB or CDC; stores are reached through
// the `counters::CounterUpdater` trait.
//
// ============================================================================

pub mod follow;
