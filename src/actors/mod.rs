// ============================================================================
// Actors Module
// ============================================================================
//
// Actor-based infrastructure around the follow counter handlers.
//
// Structure:
// - core/           - Health types shared by the actors
// - infrastructure/ - Concrete actors (edge stream, DLQ, health, coordinator)
//
// Note: Counter logic lives in domain::follow and is plain async code.
//       Actors are reserved for infrastructure concerns only.
//
// ============================================================================

// Private module declarations
mod core;
mod infrastructure;

// Re-export only what's needed in the public API
pub use infrastructure::{CoordinatorActor, EdgeDispatcher, Shutdown};
