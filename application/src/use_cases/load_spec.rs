//! Startup specification load
//!
//! The specification is read once, before the process joins the election.
//! Any failure here is fatal to startup.

use crate::ports::coordination::{CoordinationStore, StoreError};
use blacknight_domain::{DomainError, Specification, StorePaths};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum SpecificationError {
    #[error("No specification stored at {0}")]
    Missing(String),

    #[error("Cannot read specification: {0}")]
    Unreadable(StoreError),

    #[error("Invalid specification: {0}")]
    Invalid(#[from] DomainError),
}

/// Read and validate the specification stored at `/spec`
pub async fn load_specification(
    store: &dyn CoordinationStore,
    paths: &StorePaths,
) -> Result<Specification, SpecificationError> {
    let path = paths.spec();
    let bytes = store.read(&path).await.map_err(|e| match e {
        StoreError::NotFound(_) => SpecificationError::Missing(path.clone()),
        other => SpecificationError::Unreadable(other),
    })?;
    let spec = Specification::from_bytes(&bytes)?;
    info!(path = %path, roles = spec.roles().len(), "Loaded specification");
    Ok(spec)
}
