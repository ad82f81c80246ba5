//! Output formatter trait

use blacknight_application::AdminResponse;
use serde_json::json;

/// Trait for rendering admin replies
pub trait ResponseFormatter: Send + Sync {
    fn format(&self, response: &AdminResponse) -> String;

    /// Render a refusal or transport failure
    fn format_error(&self, message: &str) -> String;
}

/// Formats replies as JSON documents
pub struct JsonFormatter;

impl ResponseFormatter for JsonFormatter {
    fn format(&self, response: &AdminResponse) -> String {
        let value = match response {
            AdminResponse::Help(entries) => json!({
                "commands": entries
                    .iter()
                    .map(|(name, description)| json!({"name": name, "description": description}))
                    .collect::<Vec<_>>(),
            }),
            AdminResponse::State(state) => json!({ "state": state }),
            AdminResponse::Ensemble(view) => json!({ "ensemble": view }),
            AdminResponse::SteppingDown => json!({ "status": "stepping_down" }),
            AdminResponse::Error(message) => json!({ "error": message }),
        };
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_error(&self, message: &str) -> String {
        json!({ "error": message }).to_string()
    }
}
