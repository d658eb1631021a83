//! Terminal artifacts of subtask runs and of the whole question.

use serde::{Deserialize, Serialize};

use super::search::SearchResult;
use super::subtask::SubtaskId;
use crate::domain::errors::SubtaskError;

/// Final output of one orchestrator run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskResult {
    /// Subtask this result resolves
    pub subtask_id: SubtaskId,
    /// Subtask description, as decomposed
    pub description: String,
    /// Synthesized answer to the subtask
    pub answer_text: String,
    /// Deduplicated results the answer was written from
    pub supporting_results: Vec<SearchResult>,
    /// Answer-level retries taken, within [0, max_retries]
    pub retry_count: u32,
    /// Search rounds executed, across all answer-level cycles
    pub search_rounds: u32,
    /// False when the answer was accepted only because retries ran out
    pub accepted: bool,
}

/// A subtask the final answer could not draw on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedSubtask {
    /// Subtask that failed
    pub subtask_id: SubtaskId,
    /// Subtask description, as decomposed
    pub description: String,
    /// Why the subtask failed
    pub reason: String,
}

impl UnresolvedSubtask {
    /// Record `error` against the subtask it belongs to.
    pub fn from_error(description: impl Into<String>, error: &SubtaskError) -> Self {
        Self {
            subtask_id: error.subtask_id(),
            description: description.into(),
            reason: error.to_string(),
        }
    }
}

/// The answer returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalAnswer {
    /// Final answer text, including the unresolved note when some subtasks failed
    pub text: String,
    /// Successful subtask results in subtask declaration order
    pub contributing_subtask_results: Vec<SubtaskResult>,
    /// Subtasks that failed, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved_subtasks: Vec<UnresolvedSubtask>,
}

impl FinalAnswer {
    /// True when some subtasks could not be resolved.
    pub fn is_partial(&self) -> bool {
        !self.unresolved_subtasks.is_empty()
    }
}

/// Deterministic note listing subtasks that could not be resolved.
pub fn unresolved_note(unresolved: &[UnresolvedSubtask]) -> Option<String> {
    if unresolved.is_empty() {
        return None;
    }
    let lines = unresolved
        .iter()
        .map(|u| format!("- Subtask {} \"{}\": {}", u.subtask_id, u.description, u.reason))
        .collect::<Vec<_>>()
        .join("\n");
    Some(format!(
        "Note: {} of the subtasks could not be resolved, so this answer may be incomplete.\n{lines}",
        unresolved.len()
    ))
}
