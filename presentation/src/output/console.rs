//! Console output formatter for admin replies

use crate::output::formatter::ResponseFormatter;
use blacknight_application::{AdminResponse, EnsembleView};
use blacknight_domain::ObservedState;
use colored::Colorize;

/// Formats admin replies for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    pub fn format_help(entries: &[(&str, &str)]) -> String {
        let width = entries.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        entries
            .iter()
            .map(|(name, description)| {
                let padded = format!("{:<width$}", name, width = width);
                format!("\t{} -- {}", padded.bold(), description)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn format_state(state: &ObservedState) -> String {
        let mut output = String::new();
        output.push_str(&Self::section_header("Current deployment state"));

        output.push_str(&format!("{}\n", "Services:".cyan().bold()));
        if state.services.is_empty() {
            output.push_str(&format!("  {}\n", "(none)".dimmed()));
        }
        for (role, members) in &state.services {
            let members = members
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let label = if role.is_reserved() {
                role.to_string().dimmed()
            } else {
                role.to_string().yellow().bold()
            };
            output.push_str(&format!("  {}: {}\n", label, members));
        }

        output.push_str(&format!("{}\n", "Arguments:".cyan().bold()));
        if state.args.is_empty() {
            output.push_str(&format!("  {}\n", "(none)".dimmed()));
        }
        for (key, value) in &state.args {
            output.push_str(&format!("  {} = {}\n", key.bold(), value));
        }

        output
    }

    pub fn format_ensemble(view: &EnsembleView) -> String {
        let mut output = String::new();
        output.push_str(&Self::section_header("Ensemble"));
        if view.is_empty() {
            output.push_str(&format!("  {}\n", "(no live members)".dimmed()));
        }
        for (address, tags) in view {
            output.push_str(&format!("  {} {}\n", address.yellow().bold(), tags.join(" ")));
        }
        output
    }

    fn section_header(title: &str) -> String {
        format!("{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }
}

impl ResponseFormatter for ConsoleFormatter {
    fn format(&self, response: &AdminResponse) -> String {
        match response {
            AdminResponse::Help(entries) => Self::format_help(entries),
            AdminResponse::State(state) => Self::format_state(state),
            AdminResponse::Ensemble(view) => Self::format_ensemble(view),
            AdminResponse::SteppingDown => "Simulating failover".yellow().to_string(),
            AdminResponse::Error(message) => format!("{} {}", "Error:".red().bold(), message),
        }
    }

    fn format_error(&self, message: &str) -> String {
        message.red().to_string()
    }
}
