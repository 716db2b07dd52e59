// ============================================================================
// Follow Domain - Follower/following counter maintenance
// ============================================================================
//
// - Value objects (UserId, CounterField)
// - Events (FollowEdge, FollowEdgeEvent)
// - Errors (CounterError)
// - Handlers (EdgeCreatedHandler, EdgeDeletedHandler, FollowEdgeHandlers)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod errors;
pub mod handlers;

pub use value_objects::*;
pub use events::*;
pub use errors::*;
pub use handlers::*;
