//! Deployment specification
//!
//! The specification is a TOML document stored at `/spec`:
//!
//! ```toml
//! [[role]]
//! name = "primary_head"
//! members = ["10.0.0.1:2181"]
//!
//! [[role]]
//! name = "nc"
//! count = 3
//!
//! [role.args]
//! hypervisor = "kvm"
//! ```
//!
//! Declaration order matters: it is the order in which the diff engine
//! emits remediation actions.

use crate::cluster::member::MemberId;
use crate::cluster::role::Role;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Desired state of one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    /// Role name
    pub name: Role,
    /// Desired number of members (defaults to the number of pinned members)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Members that must serve this role
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<MemberId>,
    /// Role-specific configuration arguments passed to started members
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,
}

impl RoleSpec {
    /// A role sized by count only
    pub fn with_count(name: Role, count: usize) -> Self {
        Self {
            name,
            count: Some(count),
            members: Vec::new(),
            args: BTreeMap::new(),
        }
    }

    /// A role with pinned members
    pub fn with_members<I>(name: Role, members: I) -> Self
    where
        I: IntoIterator<Item = MemberId>,
    {
        Self {
            name,
            count: None,
            members: members.into_iter().collect(),
            args: BTreeMap::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Number of members this role should have
    pub fn desired_size(&self) -> usize {
        self.count.unwrap_or(0).max(self.members.len())
    }
}

/// Operator-owned desired state, immutable for the process lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specification {
    #[serde(default, rename = "role")]
    roles: Vec<RoleSpec>,
}

impl Specification {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: declare another role
    pub fn with_role(mut self, role: RoleSpec) -> Self {
        self.roles.push(role);
        self
    }

    /// Parse and validate the raw bytes stored at `/spec`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DomainError> {
        let text = std::str::from_utf8(bytes).map_err(|_| DomainError::SpecNotUtf8)?;
        Self::from_toml(text)
    }

    /// Parse and validate a TOML specification
    pub fn from_toml(text: &str) -> Result<Self, DomainError> {
        let spec: Specification =
            toml::from_str(text).map_err(|e| DomainError::MalformedSpec(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Serialize back to TOML (used to seed a store)
    pub fn to_toml(&self) -> Result<String, DomainError> {
        toml::to_string(self).map_err(|e| DomainError::MalformedSpec(e.to_string()))
    }

    /// Check role uniqueness, reserved names and pinned member uniqueness
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut seen = BTreeSet::new();
        for role in &self.roles {
            if role.name.is_reserved() {
                return Err(DomainError::ReservedRole(role.name.to_string()));
            }
            if !seen.insert(&role.name) {
                return Err(DomainError::DuplicateRole(role.name.to_string()));
            }
            let mut pinned = BTreeSet::new();
            for member in &role.members {
                if !pinned.insert(member) {
                    return Err(DomainError::DuplicateMember {
                        role: role.name.to_string(),
                        member: member.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Roles in declaration order
    pub fn roles(&self) -> &[RoleSpec] {
        &self.roles
    }

    pub fn role(&self, name: &Role) -> Option<&RoleSpec> {
        self.roles.iter().find(|r| &r.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}
