//! Per-subtask orchestration state machine.
//!
//! ```text
//! ExpandingQueries -> Searching -> EvaluatingSearch -> Synthesizing | ExpandingQueries
//! Synthesizing -> EvaluatingAnswer | ExpandingQueries | Done(exhausted) | Failed
//! EvaluatingAnswer -> Done(accepted) | ExpandingQueries | Done(exhausted)
//! ```
//!
//! Both retry edges draw from their own budget of `max_retries`, so a subtask runs at most
//! `1 + 2 * max_retries` search rounds.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::search::SearchQuery;

/// How a finished run reached `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Completion {
    /// The answer evaluator judged the last answer sufficient
    Accepted,
    /// Retries ran out; the last synthesized answer was kept anyway
    Exhausted,
}

/// Orchestrator state. Data a step needs travels inside the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Generate this round's queries
    ExpandingQueries,
    /// Run the queries and merge their results
    Searching(Vec<SearchQuery>),
    /// Judge the accumulated results
    EvaluatingSearch,
    /// Write a candidate answer
    Synthesizing,
    /// Judge the candidate answer
    EvaluatingAnswer(String),
    /// Finished with an answer
    Done(Completion),
    /// Retries ran out before any usable answer was synthesized
    Failed(String),
}

impl OrchestratorState {
    /// Stable name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ExpandingQueries => "expanding_queries",
            Self::Searching(_) => "searching",
            Self::EvaluatingSearch => "evaluating_search",
            Self::Synthesizing => "synthesizing",
            Self::EvaluatingAnswer(_) => "evaluating_answer",
            Self::Done(Completion::Accepted) => "done",
            Self::Done(Completion::Exhausted) => "done_exhausted",
            Self::Failed(_) => "failed",
        }
    }

    /// True for `Done` and `Failed`.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Retry counters for one subtask. Decides every branching edge of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryLedger {
    max_retries: u32,
    search_retries: u32,
    answer_retries: u32,
    rounds: u32,
}

impl RetryLedger {
    /// A ledger allowing `max_retries` retries on each edge.
    pub const fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            search_retries: 0,
            answer_retries: 0,
            rounds: 0,
        }
    }

    /// Record the start of a search round and return its zero-based index.
    pub fn begin_round(&mut self) -> u32 {
        let round = self.rounds;
        self.rounds += 1;
        round
    }

    /// Edge out of `EvaluatingSearch`.
    pub fn after_search(&mut self, sufficient: bool) -> OrchestratorState {
        if sufficient {
            return OrchestratorState::Synthesizing;
        }
        if self.search_retries < self.max_retries {
            self.search_retries += 1;
            OrchestratorState::ExpandingQueries
        } else {
            OrchestratorState::Synthesizing
        }
    }

    /// Edge out of `EvaluatingAnswer`, or out of `Synthesizing` when synthesis produced nothing.
    ///
    /// `has_answer` tells whether any usable answer exists so far, including earlier cycles.
    pub fn after_answer(
        &mut self,
        sufficient: bool,
        has_answer: bool,
        reason: &str,
    ) -> OrchestratorState {
        if sufficient && has_answer {
            return OrchestratorState::Done(Completion::Accepted);
        }
        if self.answer_retries < self.max_retries {
            self.answer_retries += 1;
            OrchestratorState::ExpandingQueries
        } else if has_answer {
            OrchestratorState::Done(Completion::Exhausted)
        } else {
            OrchestratorState::Failed(reason.to_string())
        }
    }

    /// Retry budget per edge.
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Search-level retries taken.
    pub const fn search_retries(&self) -> u32 {
        self.search_retries
    }

    /// Answer-level retries taken.
    pub const fn answer_retries(&self) -> u32 {
        self.answer_retries
    }

    /// Search rounds started so far.
    pub const fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Upper bound on rounds for a given retry budget.
    pub const fn max_rounds(max_retries: u32) -> u32 {
        1 + 2 * max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sufficient_search_goes_straight_to_synthesis() {
        let mut ledger = RetryLedger::new(2);
        assert_eq!(ledger.after_search(true), OrchestratorState::Synthesizing);
        assert_eq!(ledger.search_retries(), 0);
    }

    #[test]
    fn test_search_budget_is_spent_then_synthesis_forced() {
        let mut ledger = RetryLedger::new(2);
        assert_eq!(ledger.after_search(false), OrchestratorState::ExpandingQueries);
        assert_eq!(ledger.after_search(false), OrchestratorState::ExpandingQueries);
        assert_eq!(ledger.after_search(false), OrchestratorState::Synthesizing);
        assert_eq!(ledger.search_retries(), 2);
    }

    #[test]
    fn test_answer_exhaustion_keeps_last_answer() {
        let mut ledger = RetryLedger::new(1);
        assert_eq!(
            ledger.after_answer(false, true, "thin"),
            OrchestratorState::ExpandingQueries
        );
        assert_eq!(
            ledger.after_answer(false, true, "still thin"),
            OrchestratorState::Done(Completion::Exhausted)
        );
    }

    #[test]
    fn test_answer_exhaustion_without_answer_fails() {
        let mut ledger = RetryLedger::new(0);
        assert_eq!(
            ledger.after_answer(false, false, "synthesis returned nothing"),
            OrchestratorState::Failed("synthesis returned nothing".to_string())
        );
    }

    #[test]
    fn test_zero_budget_never_retries() {
        let mut ledger = RetryLedger::new(0);
        assert_eq!(ledger.after_search(false), OrchestratorState::Synthesizing);
        assert_eq!(
            ledger.after_answer(false, true, "meh"),
            OrchestratorState::Done(Completion::Exhausted)
        );
    }

    #[test]
    fn test_state_names() {
        assert_eq!(OrchestratorState::ExpandingQueries.to_string(), "expanding_queries");
        assert!(OrchestratorState::Done(Completion::Accepted).is_terminal());
        assert!(!OrchestratorState::Synthesizing.is_terminal());
    }
}
