//! Specification diff engine
//!
//! [`diff`] is a total, side-effect-free function of its two inputs. For
//! each declared role, in declaration order, it emits every `Stop` for that
//! role before any `Start`, so a role never transiently runs over capacity.
//!
//! Surplus members are chosen deterministically: unpinned members are kept
//! in sorted order while free slots remain, the rest are stopped. Deficits
//! are filled first from pinned identities, then from the idle-host pool,
//! then with anonymous starts.

use super::action::RemediationAction;
use super::specification::{RoleSpec, Specification};
use crate::cluster::member::MemberId;
use crate::cluster::observed::ObservedState;
use std::collections::BTreeSet;

/// Compute the ordered remediation actions that take `observed` to `spec`
pub fn diff(spec: &Specification, observed: &ObservedState) -> Vec<RemediationAction> {
    // Pinned members are never handed out from the idle pool.
    let pinned_anywhere: BTreeSet<&MemberId> =
        spec.roles().iter().flat_map(|r| r.members.iter()).collect();
    let mut pool: Vec<&MemberId> = observed
        .unused_hosts()
        .filter(|host| !pinned_anywhere.contains(host))
        .collect();

    let mut actions = Vec::new();
    for role_spec in spec.roles() {
        diff_role(role_spec, observed, &mut pool, &mut actions);
    }
    actions
}

fn diff_role<'a>(
    role_spec: &RoleSpec,
    observed: &'a ObservedState,
    pool: &mut Vec<&'a MemberId>,
    actions: &mut Vec<RemediationAction>,
) {
    let role = &role_spec.name;
    let current: BTreeSet<&MemberId> = observed.members(role).collect();
    let pinned: BTreeSet<&MemberId> = role_spec.members.iter().collect();
    let free_slots = role_spec.desired_size().saturating_sub(pinned.len());

    let unpinned: Vec<&MemberId> = current
        .iter()
        .copied()
        .filter(|m| !pinned.contains(m))
        .collect();
    let kept = unpinned.len().min(free_slots);

    for member in unpinned.iter().skip(kept) {
        actions.push(RemediationAction::stop(role.clone(), (*member).clone()));
    }

    for member in role_spec.members.iter().filter(|m| !current.contains(m)) {
        actions.push(RemediationAction::start(
            role.clone(),
            Some(member.clone()),
            role_spec.args.clone(),
        ));
    }

    for _ in kept..free_slots {
        let host = pool
            .iter()
            .position(|h| !current.contains(h))
            .map(|idx| pool.remove(idx).clone());
        actions.push(RemediationAction::start(role.clone(), host, role_spec.args.clone()));
    }
}
