//! Configuration file loading for blacknight
//!
//! This module handles file I/O and merging of configuration from multiple
//! sources. The priority order (highest to lowest):
//!
//! 1. `BLACKNIGHT_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./blacknight.toml` or `./.blacknight.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/blacknight/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileJournalConfig, FileLoggingConfig, FileNodeConfig,
    FileReconcileConfig, FileServicesConfig, FileStoreConfig,
};
pub use loader::ConfigLoader;
