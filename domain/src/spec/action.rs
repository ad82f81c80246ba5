//! Remediation actions

use crate::cluster::ensemble::Ensemble;
use crate::cluster::member::MemberId;
use crate::cluster::role::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One unit of work moving the observed state toward the specification.
///
/// Produced fresh on every reconciliation pass and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RemediationAction {
    /// Start a member serving `role`.
    ///
    /// `member` is `None` when no identity is pinned and no idle host was
    /// available; the service controller provisions one.
    Start {
        role: Role,
        member: Option<MemberId>,
        args: BTreeMap<String, String>,
    },
    /// Stop `member` from serving `role`
    Stop { role: Role, member: MemberId },
    /// Submit a new quorum configuration
    Reconfigure { ensemble: Ensemble },
}

impl RemediationAction {
    pub fn start(role: Role, member: Option<MemberId>, args: BTreeMap<String, String>) -> Self {
        RemediationAction::Start { role, member, args }
    }

    pub fn stop(role: Role, member: MemberId) -> Self {
        RemediationAction::Stop { role, member }
    }

    pub fn reconfigure(ensemble: Ensemble) -> Self {
        RemediationAction::Reconfigure { ensemble }
    }

    /// Short name used in logs and journals
    pub fn kind(&self) -> &'static str {
        match self {
            RemediationAction::Start { .. } => "start",
            RemediationAction::Stop { .. } => "stop",
            RemediationAction::Reconfigure { .. } => "reconfigure",
        }
    }

    /// Role this action touches, if any
    pub fn role(&self) -> Option<&Role> {
        match self {
            RemediationAction::Start { role, .. } | RemediationAction::Stop { role, .. } => {
                Some(role)
            }
            RemediationAction::Reconfigure { .. } => None,
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self, RemediationAction::Start { .. })
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, RemediationAction::Stop { .. })
    }
}

impl std::fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemediationAction::Start {
                role,
                member: Some(member),
                ..
            } => write!(f, "start {}/{}", role, member),
            RemediationAction::Start { role, member: None, .. } => {
                write!(f, "start {}/<new>", role)
            }
            RemediationAction::Stop { role, member } => write!(f, "stop {}/{}", role, member),
            RemediationAction::Reconfigure { ensemble } => write!(f, "reconfigure [{}]", ensemble),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let nc = Role::parse("nc").unwrap();
        let a = MemberId::parse("a").unwrap();
        assert_eq!(RemediationAction::stop(nc.clone(), a.clone()).to_string(), "stop nc/a");
        assert_eq!(
            RemediationAction::start(nc.clone(), Some(a), BTreeMap::new()).to_string(),
            "start nc/a"
        );
        assert_eq!(
            RemediationAction::start(nc, None, BTreeMap::new()).to_string(),
            "start nc/<new>"
        );
        assert_eq!(
            RemediationAction::reconfigure(Ensemble::from_children(["x:1", "y:2"])).to_string(),
            "reconfigure [x:1,y:2]"
        );
    }

    #[test]
    fn test_serialized_tag() {
        let action = RemediationAction::stop(Role::parse("nc").unwrap(), MemberId::parse("a").unwrap());
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "stop");
        assert_eq!(json["role"], "nc");
        assert_eq!(json["member"], "a");
    }
}
