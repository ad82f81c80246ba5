//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`]: specification and identifier errors
//! - [`paths::StorePaths`]: the coordination store key layout

pub mod error;
pub mod paths;
