use crate::traits::Role;
use thiserror::Error;

/// Fatal errors that abort a run.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("step budget must be greater than zero")]
    InvalidBudget,

    #[error("router after {phase} expected {expected} message, found {found}")]
    MalformedRouterInput {
        phase: String,
        expected: Role,
        found: String,
    },

    #[error("generation backend failed during {phase}")]
    BackendUnavailable {
        phase: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("agent message repeats tool request id '{id}'")]
    DuplicateToolRequest { id: String },

    #[error("phase {phase} is not part of the phase plan")]
    UnknownPhase { phase: String },
}

impl LoopError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidBudget => "invalid_budget",
            Self::MalformedRouterInput { .. } => "malformed_router_input",
            Self::BackendUnavailable { .. } => "backend_unavailable",
            Self::DuplicateToolRequest { .. } => "duplicate_tool_request",
            Self::UnknownPhase { .. } => "unknown_phase",
        }
    }
}

/// Per-request failures. These are written into the conversation, not raised.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ToolFailure {
    #[error("ToolNotFound: {name}")]
    NotFound { name: String },

    #[error("ToolExecutionFailure: {reason}")]
    Execution { reason: String },

    #[error("ToolTimeout: {name} after {secs}s")]
    Timeout { name: String, secs: f64 },
}
