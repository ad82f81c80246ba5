//! Service controller port
//!
//! Defines how remediation actions reach the physical deployment. The
//! semantics of starting or stopping a member are the adapter's business;
//! the control loop only relies on each call being independently
//! idempotent.

use crate::ports::coordination::StoreError;
use async_trait::async_trait;
use blacknight_domain::{MemberId, Role};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from applying a single remediation action
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Action rejected: {0}")]
    Rejected(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ActionError {
    /// True if the action failed because the coordination session ended
    pub fn is_session_fault(&self) -> bool {
        matches!(self, ActionError::Store(e) if e.is_session_fault())
    }
}

/// Port for starting and stopping members
#[async_trait]
pub trait ServiceController: Send + Sync {
    /// Start a member serving `role`. `member` is `None` when a new member
    /// must be provisioned.
    async fn start(
        &self,
        role: &Role,
        member: Option<&MemberId>,
        args: &BTreeMap<String, String>,
    ) -> Result<(), ActionError>;

    /// Stop `member` from serving `role`
    async fn stop(&self, role: &Role, member: &MemberId) -> Result<(), ActionError>;
}
