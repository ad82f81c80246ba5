//! Use cases of the leader-elected control loop.
//!
//! - [`election_controller`] - Candidate → Leader → Candidate loop
//! - [`membership_watcher`] - debounced `/services` watch driving reconciliation
//! - [`ensemble_monitor`] - debounced `/ensemble` watch driving reconfiguration
//! - [`load_spec`] - startup read of the specification
//! - [`query_state`] - observed state reads
//! - [`reconcile`] / [`apply_actions`] - diff and lock-guarded remediation
//! - [`admin`] - administrative commands served while leading

pub mod admin;
pub mod apply_actions;
pub mod election_controller;
pub mod election_role;
pub mod ensemble_monitor;
pub mod load_spec;
pub mod membership_watcher;
pub mod query_state;
pub mod reconcile;

#[cfg(test)]
pub(crate) mod test_support;
