use std::path::PathBuf;

use thiserror::Error;

use crate::types::{SourceLocation, TraceFrame};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Interpreter is not initialized.")]
    NotInitialized,
    #[error("Interpreter is already initialized.")]
    AlreadyInitialized,
    #[error("Interpreter is busy running guest code and cannot {operation}.")]
    Busy { operation: String },
    #[error("Scope \"{scope}\" belongs to an interpreter that has been shut down.")]
    StaleScope { scope: String },
    #[error("Failed to read script {path}: {source}")]
    ReadScript {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Syntax error in {label} at {location}: {message}")]
    Syntax {
        label: String,
        location: SourceLocation,
        message: String,
    },
    #[error("Runtime error in {label}: {message}")]
    Runtime {
        label: String,
        message: String,
        trace: Vec<TraceFrame>,
    },
    #[error("Call to \"{function}\" failed: {message}")]
    Call { function: String, message: String },
    #[error("Global \"{name}\" is not bound in scope \"{scope}\".")]
    UnknownGlobal { scope: String, name: String },
    #[error("Global \"{name}\" in scope \"{scope}\" is a constant.")]
    ReadOnlyGlobal { scope: String, name: String },
    #[error("Cannot convert {type_name} value: {message}")]
    Conversion { type_name: String, message: String },
}

impl BridgeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInitialized => "BRIDGE_NOT_INITIALIZED",
            Self::AlreadyInitialized => "BRIDGE_ALREADY_INITIALIZED",
            Self::Busy { .. } => "BRIDGE_BUSY",
            Self::StaleScope { .. } => "BRIDGE_STALE_SCOPE",
            Self::ReadScript { .. } => "BRIDGE_READ_SCRIPT",
            Self::Syntax { .. } => "GUEST_SYNTAX",
            Self::Runtime { .. } => "GUEST_RUNTIME",
            Self::Call { .. } => "GUEST_CALL",
            Self::UnknownGlobal { .. } => "GUEST_UNKNOWN_GLOBAL",
            Self::ReadOnlyGlobal { .. } => "GUEST_READONLY_GLOBAL",
            Self::Conversion { .. } => "BRIDGE_CONVERSION",
        }
    }

    pub fn busy(operation: impl Into<String>) -> Self {
        Self::Busy {
            operation: operation.into(),
        }
    }

    pub fn conversion(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Renders the guest trace, innermost frame last. Empty for non-runtime errors.
    pub fn trace_text(&self) -> String {
        match self {
            Self::Runtime { trace, .. } => trace
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
            _ => String::new(),
        }
    }

    pub fn is_guest_fault(&self) -> bool {
        matches!(
            self,
            Self::Syntax { .. } | Self::Runtime { .. } | Self::Call { .. }
        )
    }
}
