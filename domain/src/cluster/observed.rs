//! Observed deployment state

use super::member::MemberId;
use super::role::Role;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Snapshot of the deployment as recorded in the coordination store.
///
/// Each query produces a fresh value; snapshots are never patched in place
/// by the control loop. Ordered collections keep iteration (and therefore
/// the diff output) deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedState {
    /// Role → members currently registered under `/services/<role>`
    pub services: BTreeMap<Role, BTreeSet<MemberId>>,
    /// Configuration arguments from `/args/<key>`
    pub args: BTreeMap<String, String>,
}

impl ObservedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add members under a role
    pub fn with_members<I>(mut self, role: Role, members: I) -> Self
    where
        I: IntoIterator<Item = MemberId>,
    {
        self.services.entry(role).or_default().extend(members);
        self
    }

    /// Builder: add a configuration argument
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Members serving `role` (empty if the role has no subtree)
    pub fn members(&self, role: &Role) -> impl Iterator<Item = &MemberId> {
        self.services.get(role).into_iter().flatten()
    }

    pub fn member_count(&self, role: &Role) -> usize {
        self.services.get(role).map_or(0, BTreeSet::len)
    }

    /// Idle hosts available for assignment
    pub fn unused_hosts(&self) -> impl Iterator<Item = &MemberId> {
        self.services
            .iter()
            .filter(|(role, _)| role.is_reserved())
            .flat_map(|(_, members)| members.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.args.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(name: &str) -> Role {
        Role::parse(name).unwrap()
    }

    fn member(id: &str) -> MemberId {
        MemberId::parse(id).unwrap()
    }

    #[test]
    fn test_empty_state_serializes_to_empty_maps() {
        let json = serde_json::to_value(ObservedState::new()).unwrap();
        assert_eq!(json, serde_json::json!({"services": {}, "args": {}}));
    }

    #[test]
    fn test_members_of_missing_role_is_empty() {
        let state = ObservedState::new();
        assert_eq!(state.members(&role("nc")).count(), 0);
        assert_eq!(state.member_count(&role("nc")), 0);
    }

    #[test]
    fn test_unused_hosts_only_reads_pool() {
        let state = ObservedState::new()
            .with_members(role("nc"), [member("a")])
            .with_members(Role::unused_hosts(), [member("spare")]);
        let spare: Vec<_> = state.unused_hosts().collect();
        assert_eq!(spare, vec![&member("spare")]);
    }
}
