//! Coordination store adapters
//!
//! [`InMemoryEnsemble`] backs standalone mode and every integration test.
//! A networked client plugs into the same
//! [`CoordinationStore`](blacknight_application::CoordinationStore) port.

mod memory;
mod tree;

pub use memory::{InMemoryEnsemble, InMemorySession};
