//! Cluster model: who is running what, and who leads.
//!
//! - [`role::Role`]: tag assigned to a member from its registration
//! - [`member::MemberId`]: identifier of a registered member
//! - [`observed::ObservedState`]: snapshot read from the coordination store
//! - [`ensemble::Ensemble`]: coordination quorum addresses
//! - [`election::ElectionState`]: process-local Candidate/Leader tag

pub mod election;
pub mod ensemble;
pub mod member;
pub mod observed;
pub mod role;
