// ============================================================================
// Infrastructure Actors
// ============================================================================
//
// Infrastructure actors for system concerns:
// - Follow edge CDC stream and dispatch
// - Dead letter queue
// - Health monitoring
// - Coordination and shutdown
//
// ============================================================================

// Private module declarations
mod edge_stream;
mod dlq;
mod health_monitor;
mod coordinator;

// Re-export for public API
pub use edge_stream::{EdgeDispatcher, EdgeStreamProcessor};
pub use dlq::{AddToDlq, DlqActor, GetDlqMessages, GetDlqStats};
pub use health_monitor::{GetSystemHealth, HealthMonitorActor, UpdateHealth};
pub use coordinator::{CoordinatorActor, Shutdown};
