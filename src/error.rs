//! Error taxonomy for an instrumentation session
//!
//! Fatal conditions abort the remaining pipeline steps and surface as
//! [`TrimError`]. Non-fatal conditions never abort: they degrade to an
//! empty or partial result and are recorded as a [`Diagnostic`] that
//! travels with the final report.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::engine::EngineError;

/// Fatal errors raised while instrumenting and analyzing a workload
#[derive(Error, Debug)]
pub enum TrimError {
    /// The image declares no entrypoint and no default command
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The image could not be found or the engine rejected the create/run call
    #[error("Startup error: {message}")]
    Startup {
        message: String,
        #[source]
        source: Option<EngineError>,
        /// Non-fatal conditions recorded before the session aborted
        diagnostics: Vec<Diagnostic>,
    },

    /// The instance never reached the running state within the readiness window
    #[error("Instance {instance} not ready (status: {status})")]
    NotReady {
        instance: String,
        status: String,
        /// stdout/stderr captured from the instance for diagnosis
        logs: String,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrimError {
    pub(crate) fn startup(message: impl Into<String>, source: EngineError) -> Self {
        Self::Startup {
            message: message.into(),
            source: Some(source),
            diagnostics: Vec::new(),
        }
    }

    /// Diagnostics carried by a session failure
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Startup { diagnostics, .. } | Self::NotReady { diagnostics, .. } => {
                diagnostics.as_slice()
            }
            _ => &[],
        }
    }

    /// Attach teardown and retrieval diagnostics to a session failure
    ///
    /// Errors raised before an instance exists carry none; anything
    /// passed for them is only logged.
    pub(crate) fn with_diagnostics(mut self, extra: Vec<Diagnostic>) -> Self {
        match &mut self {
            Self::Startup { diagnostics, .. } | Self::NotReady { diagnostics, .. } => {
                diagnostics.extend(extra);
            }
            _ => {
                for diagnostic in &extra {
                    tracing::warn!("not attached to error: {}", diagnostic);
                }
            }
        }
        self
    }
}

/// Result type for docktrim operations
pub type Result<T> = std::result::Result<T, TrimError>;

/// Category of a non-fatal condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Trace log or file listing missing/unreadable
    RetrievalWarning,
    /// stop/remove/file-delete failure during cleanup
    TeardownWarning,
    /// Workload invocation returned a non-success status
    InvocationWarning,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RetrievalWarning => "retrieval",
            Self::TeardownWarning => "teardown",
            Self::InvocationWarning => "invocation",
        };
        f.write_str(name)
    }
}

/// A recorded non-fatal condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    /// Record a diagnostic and emit it as a warning at the same time
    pub fn warn(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(kind = %kind, "{}", message);
        Self { kind, message }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_message_includes_status() {
        let err = TrimError::NotReady {
            instance: "abc123".to_string(),
            status: "exited".to_string(),
            logs: "boom".to_string(),
            diagnostics: Vec::new(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("exited"));
    }

    #[test]
    fn test_with_diagnostics_extends_startup() {
        let err = TrimError::startup("boom", EngineError::NotFound("x".to_string()))
            .with_diagnostics(vec![Diagnostic::warn(DiagnosticKind::TeardownWarning, "rm failed")]);
        assert_eq!(err.diagnostics().len(), 1);
        assert_eq!(err.diagnostics()[0].kind, DiagnosticKind::TeardownWarning);
    }

    #[test]
    fn test_configuration_error_carries_no_diagnostics() {
        let err = TrimError::Configuration("no command".to_string())
            .with_diagnostics(vec![Diagnostic::warn(DiagnosticKind::TeardownWarning, "x")]);
        assert!(err.diagnostics().is_empty());
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::warn(DiagnosticKind::TeardownWarning, "remove failed");
        assert_eq!(diag.to_string(), "[teardown] remove failed");
    }

    #[test]
    fn test_diagnostic_kind_serializes_snake_case() {
        let json = serde_json::to_string(&DiagnosticKind::RetrievalWarning).unwrap();
        assert_eq!(json, "\"retrieval_warning\"");
    }
}
