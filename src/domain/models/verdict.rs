//! Quality verdicts returned by the judges.

use serde::{Deserialize, Serialize};

/// Outcome of a quality evaluation.
///
/// Consumed immediately by the orchestrator to choose between retrying and proceeding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityVerdict {
    /// Whether the orchestrator may proceed
    pub is_sufficient: bool,
    /// Short justification, shown in logs and progress
    pub reason: String,
    /// What to search for or fix next, when insufficient
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_refinement: Option<String>,
}

impl QualityVerdict {
    /// A passing verdict.
    pub fn sufficient(reason: impl Into<String>) -> Self {
        Self {
            is_sufficient: true,
            reason: reason.into(),
            suggested_refinement: None,
        }
    }

    /// A failing verdict, optionally naming what to try next.
    pub fn insufficient(reason: impl Into<String>, refinement: Option<String>) -> Self {
        Self {
            is_sufficient: false,
            reason: reason.into(),
            suggested_refinement: refinement,
        }
    }

    /// The hint to carry into the next round: the suggested refinement, else the reason.
    pub fn retry_hint(&self) -> Option<String> {
        self.suggested_refinement
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| Some(self.reason.trim()).filter(|s| !s.is_empty()))
            .map(ToString::to_string)
    }
}
