//! Coordination ensemble membership

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ordered set of coordination-server addresses forming the quorum
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ensemble {
    servers: BTreeSet<String>,
}

impl Ensemble {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the children of the ensemble path
    pub fn from_children<I, S>(children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            servers: children.into_iter().map(Into::into).collect(),
        }
    }

    /// Comma-joined server list submitted as the new quorum configuration
    pub fn to_server_list(&self) -> String {
        self.servers.iter().map(String::as_str).collect::<Vec<_>>().join(",")
    }

    pub fn servers(&self) -> impl Iterator<Item = &str> {
        self.servers.iter().map(String::as_str)
    }

    pub fn contains(&self, server: &str) -> bool {
        self.servers.contains(server)
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl std::fmt::Display for Ensemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_server_list())
    }
}
