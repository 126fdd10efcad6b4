//! # stratus_state
//!
//! Last-known resource state for Stratus.
//!
//! State records are the diff baseline: one snapshot per logical name,
//! written only by the executor after a successful apply. The file
//! store persists each record atomically so partial runs never lose a
//! completed entry.

pub mod error;
pub mod file;
pub mod memory;
pub mod record;
pub mod store;

// Re-export main types for convenience
pub use error::{StateError, StateResult};
pub use file::FileStateStore;
pub use memory::MemoryStateStore;
pub use record::StateRecord;
pub use store::StateStore;
