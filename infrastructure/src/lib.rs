//! Infrastructure layer for blacknight
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, plus configuration file loading.

pub mod config;
pub mod coordination;
pub mod logging;
pub mod services;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use coordination::{InMemoryEnsemble, InMemorySession};
pub use logging::JsonlActionJournal;
pub use services::{CommandServiceController, CommandTemplates};
