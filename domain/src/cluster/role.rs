//! Role tags

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Reserved pool of idle hosts kept under `/services`
pub const UNUSED_HOSTS: &str = "unused_hosts";

/// Role a member serves (e.g. `primary_head`, `secondary_head`, `nc`).
///
/// Roles are sourced from the specification and from registration data;
/// they are a single store path segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Role(String);

impl Role {
    /// Parse a role name, rejecting empty names and path separators
    pub fn parse(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.contains('/') {
            return Err(DomainError::InvalidRole(name));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The idle-host pool role
    pub fn unused_hosts() -> Self {
        Self(UNUSED_HOSTS.to_string())
    }

    /// Check if this role is reserved by the control loop itself
    pub fn is_reserved(&self) -> bool {
        self.0 == UNUSED_HOSTS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Role {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.0
    }
}
