//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Specification is not valid UTF-8")]
    SpecNotUtf8,

    #[error("Malformed specification: {0}")]
    MalformedSpec(String),

    #[error("Role declared more than once: {0}")]
    DuplicateRole(String),

    #[error("Role name is reserved: {0}")]
    ReservedRole(String),

    #[error("Invalid role name: {0:?}")]
    InvalidRole(String),

    #[error("Invalid member identifier: {0:?}")]
    InvalidMember(String),

    #[error("Member {member} pinned more than once in role {role}")]
    DuplicateMember { role: String, member: String },
}

impl DomainError {
    /// Check if this error came from the specification document itself
    pub fn is_spec_fault(&self) -> bool {
        !matches!(self, DomainError::InvalidMember(_))
    }
}
