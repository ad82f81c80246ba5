//! Node identity and store layout from TOML (`[node]` and `[store]`)

use blacknight_domain::core::paths::DEFAULT_ROOT;
use serde::{Deserialize, Serialize};

/// Raw node configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileNodeConfig {
    /// This process' coordination-server address
    pub id: String,
    /// Roles this node registers under `/services` (`unused_hosts` offers it as an idle host)
    pub services: Vec<String>,
    /// Registration data written to `/ensemble/<id>`
    pub tags: String,
}

impl Default for FileNodeConfig {
    fn default() -> Self {
        Self {
            id: "localhost:2181".to_string(),
            services: Vec::new(),
            tags: String::new(),
        }
    }
}

/// Raw store configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStoreConfig {
    /// Deployment root; every path hangs off it
    pub root: String,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            root: DEFAULT_ROOT.to_string(),
        }
    }
}
