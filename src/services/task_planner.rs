//! Top-level planning: decompose a question, run every subtask, merge the results.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{error, info, instrument, warn, Instrument};

use crate::domain::errors::{CollaboratorError, PlanningError, PlanningResult, SubtaskError};
use crate::domain::models::{
    unresolved_note, EventSink, FinalAnswer, OrchestrationConfig, Query, ResearchEvent, Subtask,
    SubtaskId, UnresolvedSubtask,
};
use crate::domain::ports::{Decomposer, DecompositionRequest, FinalSynthesisRequest, FinalSynthesizer};
use crate::services::websearch_orchestrator::{SubtaskRun, WebSearchOrchestrator};

/// Answers a question by decomposing it, running one [`WebSearchOrchestrator`] per subtask, and
/// merging the results.
///
/// Stateless between questions; one planner can answer many questions concurrently.
pub struct TaskPlanner {
    decomposer: Arc<Decomposer>,
    orchestrator: Arc<WebSearchOrchestrator>,
    final_synthesizer: Arc<FinalSynthesizer>,
    max_subtasks: usize,
    /// 0 means every subtask starts at once
    max_concurrent_subtasks: usize,
    events: EventSink,
}

impl TaskPlanner {
    /// Build a planner from its collaborators and the orchestration bounds.
    pub fn new(
        decomposer: Arc<Decomposer>,
        orchestrator: Arc<WebSearchOrchestrator>,
        final_synthesizer: Arc<FinalSynthesizer>,
        config: &OrchestrationConfig,
    ) -> Self {
        Self {
            decomposer,
            orchestrator,
            final_synthesizer,
            max_subtasks: config.max_subtasks.max(1),
            max_concurrent_subtasks: config.max_concurrent_subtasks,
            events: EventSink::disabled(),
        }
    }

    /// Report progress on `events`.
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Answer a question. Returns only once every subtask is terminal.
    #[instrument(skip(self))]
    pub async fn answer(&self, question: &str) -> PlanningResult<FinalAnswer> {
        let query = Query::new(question)?;
        let subtasks = self.decompose(&query).await?;
        let runs = self.dispatch(subtasks).await;
        self.merge(&query, runs).await
    }

    /// Split the question into 1..=max_subtasks independent subtasks.
    ///
    /// A decomposition that yields nothing usable falls back to the question itself.
    pub async fn decompose(&self, query: &Query) -> PlanningResult<Vec<Subtask>> {
        let plan = self
            .decomposer
            .invoke(&DecompositionRequest {
                question: query.as_str().to_string(),
                max_subtasks: self.max_subtasks,
            })
            .await
            .map_err(PlanningError::Decomposition)?;

        if !plan.reason.is_empty() {
            info!(reason = %plan.reason, "Decomposition strategy");
        }

        let mut descriptions: Vec<String> = Vec::new();
        for task in plan.tasks {
            let description = task.description.trim();
            if description.is_empty() || descriptions.iter().any(|d| d == description) {
                continue;
            }
            descriptions.push(description.to_string());
        }
        if descriptions.len() > self.max_subtasks {
            warn!(
                produced = descriptions.len(),
                limit = self.max_subtasks,
                "Decomposition exceeded subtask limit, truncating"
            );
            descriptions.truncate(self.max_subtasks);
        }
        if descriptions.is_empty() {
            info!("Decomposition produced no subtasks, using the question as the only subtask");
            descriptions.push(query.as_str().to_string());
        }

        self.events.emit(ResearchEvent::Decomposed {
            subtasks: descriptions.clone(),
        });

        Ok(descriptions
            .into_iter()
            .enumerate()
            .map(|(index, description)| Subtask::new(SubtaskId::new(index), description))
            .collect())
    }

    /// Run every subtask concurrently and hand the runs back in declaration order.
    ///
    /// A run that panics is recorded as an aborted subtask; the others are unaffected.
    pub async fn dispatch(&self, subtasks: Vec<Subtask>) -> Vec<SubtaskRun> {
        let semaphore = (self.max_concurrent_subtasks > 0)
            .then(|| Arc::new(Semaphore::new(self.max_concurrent_subtasks)));

        let handles: Vec<_> = subtasks
            .into_iter()
            .map(|subtask| {
                let id = subtask.id;
                let description = subtask.description.clone();
                let orchestrator = Arc::clone(&self.orchestrator);
                let semaphore = semaphore.clone();

                let handle = tokio::spawn(
                    async move {
                        let _permit = match semaphore {
                            Some(semaphore) => semaphore.acquire_owned().await.ok(),
                            None => None,
                        };
                        orchestrator.run(subtask).await
                    }
                    .in_current_span(),
                );
                (id, description, handle)
            })
            .collect();

        let mut runs = Vec::with_capacity(handles.len());
        for (id, description, handle) in handles {
            match handle.await {
                Ok(run) => runs.push(run),
                Err(e) => runs.push(self.aborted_run(id, description, e)),
            }
        }
        runs
    }

    fn aborted_run(&self, id: SubtaskId, description: String, join_error: JoinError) -> SubtaskRun {
        let reason = if join_error.is_panic() {
            let payload = join_error.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            format!("orchestrator run panicked: {message}")
        } else {
            "orchestrator run was cancelled".to_string()
        };
        error!(subtask_id = %id, reason = %reason, "Subtask aborted");

        let mut subtask = Subtask::new(id, description);
        if let Err(e) = subtask.abort() {
            warn!(subtask_id = %id, error = %e, "Unexpected subtask status");
        }
        self.events.emit(ResearchEvent::SubtaskFailed {
            subtask_id: id,
            error: reason.clone(),
        });

        SubtaskRun {
            subtask,
            outcome: Err(SubtaskError::Aborted {
                subtask_id: id,
                reason,
            }),
        }
    }

    /// Synthesize the final answer from the successful runs, in declaration order.
    pub async fn merge(&self, query: &Query, runs: Vec<SubtaskRun>) -> PlanningResult<FinalAnswer> {
        let mut results = Vec::new();
        let mut unresolved = Vec::new();
        let mut failures = Vec::new();

        for run in runs {
            match run.outcome {
                Ok(result) => results.push(result),
                Err(e) => {
                    unresolved.push(UnresolvedSubtask::from_error(&run.subtask.description, &e));
                    failures.push(e);
                }
            }
        }

        if results.is_empty() {
            return Err(PlanningError::AllSubtasksFailed(failures));
        }

        let text = self
            .final_synthesizer
            .invoke(&FinalSynthesisRequest {
                question: query.as_str().to_string(),
                subtask_results: results.clone(),
                unresolved: unresolved.clone(),
            })
            .await
            .map_err(PlanningError::Synthesis)?;

        let text = text.trim();
        if text.is_empty() {
            return Err(PlanningError::Synthesis(CollaboratorError::MalformedOutput(
                "final synthesis returned an empty answer".to_string(),
            )));
        }

        let text = match unresolved_note(&unresolved) {
            Some(note) => format!("{text}\n\n{note}"),
            None => text.to_string(),
        };

        info!(
            contributing = results.len(),
            unresolved = unresolved.len(),
            "Final answer synthesized"
        );
        self.events.emit(ResearchEvent::Synthesized {
            contributing: results.len(),
            unresolved: unresolved.len(),
        });

        Ok(FinalAnswer {
            text,
            contributing_subtask_results: results,
            unresolved_subtasks: unresolved,
        })
    }
}
