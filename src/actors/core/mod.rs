// ============================================================================
// Core Actor Abstractions
// ============================================================================
//
// Generic health types shared by the infrastructure actors.
//
// ============================================================================

pub mod health;

pub use health::*;
