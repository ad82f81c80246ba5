//! Service control adapters
//!
//! Provides [`CommandServiceController`], which starts and stops members
//! by running configured shell commands.

mod command;

pub use command::{CommandServiceController, CommandTemplates};
