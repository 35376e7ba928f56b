pub mod backend;
pub mod catalog;
pub mod clients;
pub mod config;
pub mod migrate;
pub mod quote;
pub mod seed;

use serde::Serialize;
use serde_json::Value;
use tempo_core::config::{AppConfig, LoadOptions};
use tempo_core::errors::{ApplicationError, InterfaceErrorKind};

/// `(error_class, message, exit_code)` carried out of a command's async block.
pub type CommandFailure = (&'static str, String, u8);

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

#[derive(Debug, Serialize)]
struct CommandData {
    command: String,
    status: String,
    data: Value,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(&payload) }
    }

    /// Successful result whose payload is structured data rather than a message.
    pub fn data(command: &str, data: Value) -> Self {
        let payload =
            CommandData { command: command.to_string(), status: "ok".to_string(), data };
        Self { exit_code: 0, output: serialize_payload(&payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }

    fn from_failure(command: &str, (error_class, message, exit_code): CommandFailure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }
}

fn serialize_payload(payload: &impl Serialize) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

fn runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

/// Maps a session error onto the CLI's error classes and exit codes.
fn application_failure(error: ApplicationError, correlation_id: &str) -> CommandFailure {
    let interface = error.into_interface(correlation_id);
    let (error_class, exit_code) = match interface.kind {
        InterfaceErrorKind::BadRequest => ("quote_rejected", 8),
        InterfaceErrorKind::NotFound => ("not_found", 7),
        InterfaceErrorKind::ServiceUnavailable => ("collaborator", 9),
        InterfaceErrorKind::Internal => ("internal", 10),
    };
    let message = format!(
        "{} {interface} (correlation_id: {})",
        interface.user_message(),
        interface.correlation_id
    );
    (error_class, message, exit_code)
}

fn to_value(value: &impl Serialize) -> Result<Value, CommandFailure> {
    serde_json::to_value(value).map_err(|error| ("serialization", error.to_string(), 10u8))
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use tempo_core::domain::quote::QuoteStatus;
    use tempo_core::errors::{ApplicationError, DomainError, TransitionBlocker};

    use super::{application_failure, CommandResult};

    #[test]
    fn failure_payload_carries_error_class() {
        let result = CommandResult::failure("seed", "migration", "boom", 5);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 5);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "migration");
        assert_eq!(payload["message"], "boom");
    }

    #[test]
    fn data_payload_nests_under_data() {
        let result = CommandResult::data("catalog", json!({ "services": [] }));
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 0);
        assert_eq!(payload["status"], "ok");
        assert!(payload["data"]["services"].as_array().expect("array").is_empty());
    }

    #[test]
    fn application_errors_map_to_distinct_exit_codes() {
        let missing = application_failure(
            ApplicationError::NotFound { entity: "client", id: "9".to_string() },
            "cli-1",
        );
        assert_eq!((missing.0, missing.2), ("not_found", 7));
        assert!(missing.1.ends_with("(correlation_id: cli-1)"));

        let locked = application_failure(
            ApplicationError::Domain(DomainError::InvalidTransition {
                from: QuoteStatus::Sent,
                to: QuoteStatus::Sent,
                blocker: TransitionBlocker::WrongStatus(QuoteStatus::Sent),
            }),
            "cli-2",
        );
        assert_eq!((locked.0, locked.2), ("quote_rejected", 8));
    }
}
