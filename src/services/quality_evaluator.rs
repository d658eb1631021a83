//! Quality gate shared by the search level and the answer level.

use std::sync::Arc;

use tracing::warn;

use crate::domain::models::QualityVerdict;
use crate::domain::ports::Prompted;

/// Which level of the orchestrator a verdict is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationLevel {
    /// Coverage of accumulated search results
    Search,
    /// Quality of a synthesized answer
    Answer,
}

impl EvaluationLevel {
    /// Name used in log fields.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Answer => "answer",
        }
    }
}

/// Wraps a judging call site so that it always yields a verdict.
///
/// A failing judge is read as "insufficient", which drives the retry loop instead of failing
/// the subtask.
pub struct QualityEvaluator<I> {
    judge: Arc<dyn Prompted<I, QualityVerdict>>,
    level: EvaluationLevel,
}

impl<I> Clone for QualityEvaluator<I> {
    fn clone(&self) -> Self {
        Self {
            judge: Arc::clone(&self.judge),
            level: self.level,
        }
    }
}

impl<I> QualityEvaluator<I>
where
    I: Send + Sync,
{
    /// Judge with `judge`, logging verdicts under `level`.
    pub fn new(judge: Arc<dyn Prompted<I, QualityVerdict>>, level: EvaluationLevel) -> Self {
        Self { judge, level }
    }

    /// Which transition this evaluator guards.
    pub const fn level(&self) -> EvaluationLevel {
        self.level
    }

    /// Judge `input`. A judge error comes back as an insufficient verdict.
    pub async fn evaluate(&self, input: &I) -> QualityVerdict {
        match self.judge.invoke(input).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(level = self.level.as_str(), error = %e, "Evaluation failed, treating as insufficient");
                QualityVerdict::insufficient(format!("Evaluation failed: {e}"), None)
            }
        }
    }
}
