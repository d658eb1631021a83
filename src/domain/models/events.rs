//! Progress notifications emitted while a question is being researched.

use serde::Serialize;
use tokio::sync::mpsc;

use super::answer::SubtaskResult;
use super::subtask::SubtaskId;

/// Events emitted by the planner and the orchestrator runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ResearchEvent {
    /// Question decomposed into subtasks.
    Decomposed {
        /// Subtask descriptions in declaration order
        subtasks: Vec<String>,
    },
    /// Orchestrator run started.
    SubtaskStarted {
        /// Subtask being researched
        subtask_id: SubtaskId,
        /// What the subtask asks
        description: String,
    },
    /// One search round joined.
    RoundCompleted {
        /// Subtask the round belongs to
        subtask_id: SubtaskId,
        /// Zero-based round number
        round: u32,
        /// Queries issued this round
        queries: Vec<String>,
        /// Previously unseen URLs found this round
        new_results: usize,
        /// Accumulated results after the merge
        total_results: usize,
    },
    /// Search-level verdict.
    SearchEvaluated {
        /// Subtask being judged
        subtask_id: SubtaskId,
        /// Round whose results were judged
        round: u32,
        /// Verdict
        sufficient: bool,
        /// Judge's justification
        reason: String,
    },
    /// Answer-level verdict.
    AnswerEvaluated {
        /// Subtask being judged
        subtask_id: SubtaskId,
        /// Zero-based synthesis attempt
        attempt: u32,
        /// Verdict
        sufficient: bool,
        /// Judge's justification
        reason: String,
    },
    /// Orchestrator run produced a result.
    SubtaskCompleted {
        /// The finished result
        result: SubtaskResult,
    },
    /// Orchestrator run failed or was aborted.
    SubtaskFailed {
        /// Subtask that failed
        subtask_id: SubtaskId,
        /// Rendered failure
        error: String,
    },
    /// Final answer produced.
    Synthesized {
        /// Subtasks whose answers were merged
        contributing: usize,
        /// Subtasks acknowledged as unresolved
        unresolved: usize,
    },
}

/// Optional, never-blocking sender for [`ResearchEvent`]s.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<ResearchEvent>>,
}

impl EventSink {
    /// Send events to `tx`.
    pub const fn new(tx: mpsc::UnboundedSender<ResearchEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that discards every event.
    pub const fn disabled() -> Self {
        Self { tx: None }
    }

    /// Create a sink together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ResearchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Send `event`. Never blocks; a closed or disabled sink drops it.
    pub fn emit(&self, event: ResearchEvent) {
        if let Some(tx) = &self.tx {
            // Receiver may be gone; progress is best-effort
            let _ = tx.send(event);
        }
    }
}
