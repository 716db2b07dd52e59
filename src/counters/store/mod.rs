// ============================================================================
// Counter Stores - Persistence for denormalized counters
// ============================================================================

pub mod scylla_store;
#[cfg(test)]
pub mod memory_store;

pub use scylla_store::ScyllaCounterStore;
#[cfg(test)]
pub use memory_store::InMemoryCounterStore;
