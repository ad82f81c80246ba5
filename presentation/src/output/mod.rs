//! Formatting of admin replies

pub mod console;
pub mod formatter;
