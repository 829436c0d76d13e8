//! Error taxonomy for provisioning, execution and teardown.

use std::path::PathBuf;

use thiserror::Error;

use crate::execution::ExecutionRecord;

/// Failure reported by the remote manager client.
///
/// `NotFound` is the only classification the orchestration layer branches on;
/// everything else is surfaced as-is.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} '{id}' already exists")]
    Conflict { kind: &'static str, id: String },

    #[error("remote request failed: {message}")]
    Request {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RemoteError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
            source: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// One tolerated or fatal failure observed while tearing an environment down.
#[derive(Debug)]
pub struct TeardownStepFailure {
    pub step: TeardownStep,
    pub error: OrchestrationError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    Uninstall,
    DeleteDeployment,
    DeleteBlueprint,
}

impl std::fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninstall => write!(f, "uninstall"),
            Self::DeleteDeployment => write!(f, "delete deployment"),
            Self::DeleteBlueprint => write!(f, "delete blueprint"),
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("invalid input format: {message}")]
    InvalidInputFormat { message: String },

    #[error("failed to read inputs file {}", path.display())]
    InputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid mapping: {message}")]
    InvalidMapping { message: String },

    #[error("invalid blueprint source: {message}")]
    InvalidBlueprintSource { message: String },

    #[error(
        "blueprint '{blueprint_id}' requires packages that are not installed: {}",
        missing.join(", ")
    )]
    MissingPrerequisites {
        blueprint_id: String,
        missing: Vec<String>,
    },

    #[error("failed to upload blueprint '{blueprint_id}'")]
    BlueprintUploadFailed {
        blueprint_id: String,
        #[source]
        source: RemoteError,
    },

    #[error("failed to create environment '{deployment_id}'")]
    EnvironmentCreationFailed {
        deployment_id: String,
        #[source]
        source: Box<OrchestrationError>,
    },

    #[error("{message}; execution {} of '{}' ended as {}", record.id, record.workflow_id, record.state)]
    WorkflowExecutionFailed {
        message: String,
        record: Box<ExecutionRecord>,
    },

    #[error("execution {execution_id} interrupted before reaching a terminal state")]
    Interrupted { execution_id: String },

    #[error("teardown failed ({} step(s)): {}", failures.len(), summarize(failures))]
    TeardownFailed { failures: Vec<TeardownStepFailure> },

    #[error("failed to {operation}")]
    Remote {
        operation: String,
        #[source]
        source: RemoteError,
    },

    #[error("failed to {action} document {}", path.display())]
    Document {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl OrchestrationError {
    pub(crate) fn remote(operation: impl Into<String>, source: RemoteError) -> Self {
        Self::Remote {
            operation: operation.into(),
            source,
        }
    }

    /// True when the failure was caused by cancellation, including an
    /// install that was interrupted while creating an environment.
    pub fn is_interrupted(&self) -> bool {
        match self {
            Self::Interrupted { .. } => true,
            Self::EnvironmentCreationFailed { source, .. } => source.is_interrupted(),
            _ => false,
        }
    }
}

fn summarize(failures: &[TeardownStepFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.step, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T, E = OrchestrationError> = std::result::Result<T, E>;
