//! Coordination store key layout
//!
//! Every path used by the control loop hangs off a deployment-specific root:
//!
//! | Suffix | Purpose |
//! |---|---|
//! | `/spec` | serialized desired specification |
//! | `/elect` | election bookkeeping |
//! | `/lock` | cluster lock bookkeeping |
//! | `/ensemble` | one ephemeral child per live coordination server |
//! | `/services/<role>` | one child per member serving that role |
//! | `/args/<key>` | one value node per configuration argument |

use crate::cluster::member::MemberId;
use crate::cluster::role::Role;
use serde::{Deserialize, Serialize};

/// Default deployment root
pub const DEFAULT_ROOT: &str = "/blacknight";

/// Path builder for a single deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorePaths {
    root: String,
}

impl StorePaths {
    /// Create a layout under `root`. A trailing slash is ignored.
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let trimmed = root.trim_end_matches('/');
        Self {
            root: trimmed.to_string(),
        }
    }

    pub fn root(&self) -> &str {
        if self.root.is_empty() { "/" } else { &self.root }
    }

    pub fn spec(&self) -> String {
        self.child("spec")
    }

    pub fn elect(&self) -> String {
        self.child("elect")
    }

    pub fn lock(&self) -> String {
        self.child("lock")
    }

    pub fn ensemble(&self) -> String {
        self.child("ensemble")
    }

    pub fn ensemble_member(&self, address: &str) -> String {
        format!("{}/{}", self.ensemble(), address)
    }

    pub fn services(&self) -> String {
        self.child("services")
    }

    pub fn service_role(&self, role: &Role) -> String {
        format!("{}/{}", self.services(), role)
    }

    pub fn service_member(&self, role: &Role, member: &MemberId) -> String {
        format!("{}/{}", self.service_role(role), member)
    }

    /// Pool of idle hosts that can be assigned to under-staffed roles
    pub fn unused_hosts(&self) -> String {
        self.service_role(&Role::unused_hosts())
    }

    pub fn args(&self) -> String {
        self.child("args")
    }

    pub fn arg(&self, key: &str) -> String {
        format!("{}/{}", self.args(), key)
    }

    fn child(&self, name: &str) -> String {
        format!("{}/{}", self.root, name)
    }
}

impl Default for StorePaths {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}
