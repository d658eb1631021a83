//! Domain errors for the sleuth research engine.

use thiserror::Error;

use super::models::{SearchResult, SubtaskId};

/// Failure of an external collaborator (LLM or search provider).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Network failure, rate limiting or a server-side error. Callers may retry.
    #[error("Transient collaborator error: {0}")]
    Transient(String),

    /// The collaborator answered, but the output could not be used.
    #[error("Malformed collaborator output: {0}")]
    MalformedOutput(String),

    /// The collaborator refused the request (bad credentials, invalid request).
    #[error("Collaborator rejected request: {0}")]
    Rejected(String),
}

impl CollaboratorError {
    /// Returns true if retrying the same call may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Terminal failure of a single subtask.
#[derive(Debug, Clone, Error)]
pub enum SubtaskError {
    /// Every retry edge was taken and no usable answer exists.
    #[error("Subtask {subtask_id} exhausted {retries} retries without a usable answer: {reason}")]
    Exhausted {
        /// Subtask that gave up
        subtask_id: SubtaskId,
        /// Retry budget that ran out
        retries: u32,
        /// Last rejection reason
        reason: String,
        /// Everything accumulated before giving up
        partial_results: Vec<SearchResult>,
    },

    /// The run panicked or was cancelled.
    #[error("Subtask {subtask_id} aborted: {reason}")]
    Aborted {
        /// Subtask whose run ended abnormally
        subtask_id: SubtaskId,
        /// Panic message or cancellation cause
        reason: String,
    },
}

impl SubtaskError {
    /// Subtask the error belongs to.
    pub const fn subtask_id(&self) -> SubtaskId {
        match self {
            Self::Exhausted { subtask_id, .. } | Self::Aborted { subtask_id, .. } => *subtask_id,
        }
    }

    /// Search results gathered before the subtask gave up.
    pub fn partial_results(&self) -> &[SearchResult] {
        match self {
            Self::Exhausted {
                partial_results, ..
            } => partial_results,
            Self::Aborted { .. } => &[],
        }
    }
}

/// Errors that prevent the planner from producing any answer at all.
#[derive(Debug, Error)]
pub enum PlanningError {
    /// The question was blank after trimming.
    #[error("Question must not be empty")]
    EmptyQuestion,

    /// The decomposer failed; nothing was dispatched.
    #[error("Failed to decompose question: {0}")]
    Decomposition(#[source] CollaboratorError),

    /// Every subtask failed, in declaration order.
    #[error("All {} subtasks failed: {}", .0.len(), format_failures(.0))]
    AllSubtasksFailed(Vec<SubtaskError>),

    /// The final synthesizer failed after at least one subtask resolved.
    #[error("Failed to synthesize final answer: {0}")]
    Synthesis(#[source] CollaboratorError),
}

fn format_failures(failures: &[SubtaskError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result of planner operations.
pub type PlanningResult<T> = Result<T, PlanningError>;
