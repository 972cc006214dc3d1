use std::fmt::Display;

use gb_core::BridgeError;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub(crate) struct CliError {
    pub(crate) code: String,
    pub(crate) message: String,
}

impl CliError {
    pub(crate) fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<BridgeError> for CliError {
    fn from(error: BridgeError) -> Self {
        let mut message = error.to_string();
        let trace = error.trace_text();
        if !trace.is_empty() {
            message.push('\n');
            message.push_str(&trace);
        }
        Self::new(error.code(), message)
    }
}

fn map_error(code: &'static str, error: impl Display) -> CliError {
    CliError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: CliError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
    );
    1
}

pub(crate) fn map_cli_global_invalid(raw: &str) -> CliError {
    CliError::new(
        "CLI_GLOBAL_INVALID",
        format!("Expected name=<json>, got \"{}\".", raw),
    )
}

pub(crate) fn map_cli_json_invalid(error: serde_json::Error) -> CliError {
    map_error("CLI_JSON_INVALID", error)
}
