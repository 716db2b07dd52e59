// ============================================================================
// Counter Maintenance Infrastructure
// ============================================================================
//
// Generic transactional counter updates. Follow-specific logic lives in
// src/domain/follow/
//
// ============================================================================

mod core;
mod store;

pub use self::core::*;
pub use self::store::*;
