//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod action_journal;
pub mod coordination;
pub mod service_controller;
