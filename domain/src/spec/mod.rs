//! Desired state and the path from observed to desired.
//!
//! - [`specification::Specification`]: operator-owned desired state
//! - [`action::RemediationAction`]: one unit of remediation work
//! - [`diff::diff`]: pure diff engine

pub mod action;
pub mod diff;
pub mod specification;
