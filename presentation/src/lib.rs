//! Presentation layer for blacknight
//!
//! This crate contains the CLI definition, the line-oriented admin console
//! and formatters for deployment state.

pub mod cli;
pub mod console;
pub mod output;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputFormat};
pub use console::AdminConsole;
pub use output::console::ConsoleFormatter;
pub use output::formatter::{JsonFormatter, ResponseFormatter};
