//! Domain layer for blacknight
//!
//! This crate contains the core model of a reconciled deployment: what the
//! operator declared, what the coordination store says is running, and the
//! pure function that turns the difference into remediation actions.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Specification vs. Observed State
//!
//! - **Specification**: desired members per role, loaded once at startup
//! - **Observed State**: role → member roster plus configuration arguments,
//!   rebuilt from the store on every query
//!
//! ## Diff
//!
//! [`diff`] compares the two and yields an ordered list of
//! [`RemediationAction`]s (stops before starts, declared role order).

pub mod cluster;
pub mod core;
pub mod spec;

// Re-export commonly used types
pub use cluster::{
    election::ElectionState,
    ensemble::Ensemble,
    member::MemberId,
    observed::ObservedState,
    role::Role,
};
pub use core::{error::DomainError, paths::StorePaths};
pub use spec::{
    action::RemediationAction,
    diff::diff,
    specification::{RoleSpec, Specification},
};
