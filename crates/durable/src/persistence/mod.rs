//! Instance state for the in-process engine
//!
//! This module provides:
//! - [`RuntimeStatus`] with the sidecar's status names
//! - [`InstanceRecord`] snapshots of an instance
//! - [`InMemoryInstanceStore`] holding status, output and history

mod memory;
mod store;

pub use memory::InMemoryInstanceStore;
pub use store::{InstanceRecord, RuntimeStatus, StoreError};
