//! Raw TOML configuration data types
//!
//! These structs mirror the TOML file exactly. Conversion into application
//! types happens after [`FileConfig::validate`] has passed.

mod node;
mod output;
mod reconcile;
mod services;

pub use node::{FileNodeConfig, FileStoreConfig};
pub use output::{FileJournalConfig, FileLoggingConfig};
pub use reconcile::FileReconcileConfig;
pub use services::FileServicesConfig;

use blacknight_application::NodeIdentity;
use blacknight_domain::{MemberId, Role, StorePaths};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{0} cannot be 0")]
    ZeroValue(&'static str),

    #[error("node.id is not a valid member id: '{0}'")]
    InvalidNodeId(String),

    #[error("store.root must be an absolute path, got '{0}'")]
    InvalidRoot(String),

    #[error("node.services contains an invalid role: '{0}'")]
    InvalidService(String),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub node: FileNodeConfig,
    pub store: FileStoreConfig,
    pub reconcile: FileReconcileConfig,
    pub services: FileServicesConfig,
    pub journal: FileJournalConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the whole configuration, stopping at the first problem
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let reconcile = &self.reconcile;
        for (field, value) in [
            ("reconcile.debounce_ms", reconcile.debounce_ms),
            ("reconcile.ensemble_debounce_ms", reconcile.ensemble_debounce_ms),
            (
                "reconcile.reconfig_max_attempts",
                u64::from(reconcile.reconfig_max_attempts),
            ),
            ("reconcile.session_retry_ms", reconcile.session_retry_ms),
            ("services.timeout_secs", self.services.timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::ZeroValue(field));
            }
        }

        if MemberId::parse(self.node.id.as_str()).is_err() {
            return Err(ConfigValidationError::InvalidNodeId(self.node.id.clone()));
        }

        let root = self.store.root.trim_end_matches('/');
        if !self.store.root.starts_with('/') || root.is_empty() {
            return Err(ConfigValidationError::InvalidRoot(self.store.root.clone()));
        }

        self.node_services().map(|_| ())
    }

    pub fn store_paths(&self) -> StorePaths {
        StorePaths::new(self.store.root.as_str())
    }

    pub fn node_identity(&self) -> Result<NodeIdentity, ConfigValidationError> {
        let identity = NodeIdentity::new(self.node.id.as_str()).with_tags(self.node.tags.as_str());
        Ok(self
            .node_services()?
            .into_iter()
            .fold(identity, NodeIdentity::with_service))
    }

    fn node_services(&self) -> Result<Vec<Role>, ConfigValidationError> {
        self.node
            .services
            .iter()
            .map(|name| {
                Role::parse(name.as_str())
                    .map_err(|_| ConfigValidationError::InvalidService(name.clone()))
            })
            .collect()
    }
}
