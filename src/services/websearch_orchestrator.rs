//! Per-subtask web search orchestration.
//!
//! One run owns one subtask and drives it through the [`OrchestratorState`] machine: generate
//! queries, fan them out, judge coverage, synthesize, judge the answer. Every branching edge is
//! decided by a [`RetryLedger`], so a run always terminates.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::SubtaskError;
use crate::domain::models::{
    Completion, EventSink, OrchestrationConfig, OrchestratorState, QualityVerdict, ResearchEvent,
    RetryLedger, SearchAccumulator, SearchQuery, Subtask, SubtaskResult, SubtaskStatus,
};
use crate::domain::ports::{
    AnswerEvaluationRequest, QueryGenerationRequest, QueryGenerator, SearchEvaluationRequest,
    SubtaskSynthesisRequest, SubtaskSynthesizer,
};
use crate::services::quality_evaluator::QualityEvaluator;
use crate::services::search_executor::SearchExecutor;

/// A subtask handed back to the planner together with how it ended.
#[derive(Debug)]
pub struct SubtaskRun {
    /// The subtask in a terminal status
    pub subtask: Subtask,
    /// The result, or why the subtask could not be resolved
    pub outcome: Result<SubtaskResult, SubtaskError>,
}

/// Drives one subtask from queries to an accepted answer.
///
/// A run's mutable state lives in the run itself, so one orchestrator serves every subtask of a
/// question concurrently.
pub struct WebSearchOrchestrator {
    query_generator: Arc<QueryGenerator>,
    search_executor: SearchExecutor,
    search_evaluator: QualityEvaluator<SearchEvaluationRequest>,
    synthesizer: Arc<SubtaskSynthesizer>,
    answer_evaluator: QualityEvaluator<AnswerEvaluationRequest>,
    max_retries: u32,
    max_queries_per_round: usize,
    events: EventSink,
}

/// Mutable state of a single run. Owned by the run; never shared.
struct RunContext {
    ledger: RetryLedger,
    accumulator: SearchAccumulator,
    issued_queries: Vec<String>,
    round: u32,
    /// Guidance for the next query generation
    search_hint: Option<String>,
    /// Guidance for the next synthesis
    answer_feedback: Option<String>,
    last_answer: Option<String>,
}

impl WebSearchOrchestrator {
    /// Build an orchestrator. `config` supplies the retry budget and the per-round query cap.
    pub fn new(
        query_generator: Arc<QueryGenerator>,
        search_executor: SearchExecutor,
        search_evaluator: QualityEvaluator<SearchEvaluationRequest>,
        synthesizer: Arc<SubtaskSynthesizer>,
        answer_evaluator: QualityEvaluator<AnswerEvaluationRequest>,
        config: &OrchestrationConfig,
    ) -> Self {
        Self {
            query_generator,
            search_executor,
            search_evaluator,
            synthesizer,
            answer_evaluator,
            max_retries: config.max_retries,
            max_queries_per_round: config.max_queries_per_round.max(1),
            events: EventSink::disabled(),
        }
    }

    /// Report progress on `events`.
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Resolve one subtask. Always returns the subtask in a terminal status.
    #[instrument(skip(self, subtask), fields(subtask_id = %subtask.id))]
    pub async fn run(&self, mut subtask: Subtask) -> SubtaskRun {
        if let Err(e) = subtask.transition_to(SubtaskStatus::Running) {
            warn!(error = %e, "Subtask was not pending");
        }
        self.events.emit(ResearchEvent::SubtaskStarted {
            subtask_id: subtask.id,
            description: subtask.description.clone(),
        });

        let outcome = self.resolve(&subtask).await;

        let status = match &outcome {
            Ok(result) => {
                info!(
                    rounds = result.search_rounds,
                    retries = result.retry_count,
                    accepted = result.accepted,
                    "Subtask completed"
                );
                self.events.emit(ResearchEvent::SubtaskCompleted {
                    result: result.clone(),
                });
                SubtaskStatus::Completed
            }
            Err(e) => {
                warn!(error = %e, "Subtask failed");
                self.events.emit(ResearchEvent::SubtaskFailed {
                    subtask_id: subtask.id,
                    error: e.to_string(),
                });
                SubtaskStatus::Failed
            }
        };
        if let Err(e) = subtask.transition_to(status) {
            warn!(error = %e, "Unexpected subtask status");
        }

        SubtaskRun { subtask, outcome }
    }

    async fn resolve(&self, subtask: &Subtask) -> Result<SubtaskResult, SubtaskError> {
        let mut ctx = RunContext {
            ledger: RetryLedger::new(self.max_retries),
            accumulator: SearchAccumulator::new(),
            issued_queries: Vec::new(),
            round: 0,
            search_hint: None,
            answer_feedback: None,
            last_answer: None,
        };
        let mut state = OrchestratorState::ExpandingQueries;

        loop {
            debug!(state = %state, round = ctx.round, "Orchestrator step");
            state = match state {
                OrchestratorState::ExpandingQueries => {
                    ctx.round = ctx.ledger.begin_round();
                    OrchestratorState::Searching(self.expand_queries(subtask, &ctx).await)
                }
                OrchestratorState::Searching(queries) => {
                    self.search_round(subtask, &queries, &mut ctx).await;
                    OrchestratorState::EvaluatingSearch
                }
                OrchestratorState::EvaluatingSearch => {
                    let verdict = if ctx.accumulator.is_empty() {
                        QualityVerdict::insufficient("No search results gathered yet", None)
                    } else {
                        self.search_evaluator
                            .evaluate(&SearchEvaluationRequest {
                                subtask: subtask.description.clone(),
                                results: ctx.accumulator.results().to_vec(),
                            })
                            .await
                    };
                    info!(round = ctx.round, verdict = verdict.is_sufficient, reason = %verdict.reason, "Search evaluated");
                    self.events.emit(ResearchEvent::SearchEvaluated {
                        subtask_id: subtask.id,
                        round: ctx.round,
                        sufficient: verdict.is_sufficient,
                        reason: verdict.reason.clone(),
                    });

                    let next = ctx.ledger.after_search(verdict.is_sufficient);
                    if next == OrchestratorState::ExpandingQueries {
                        ctx.search_hint = verdict.retry_hint();
                    }
                    next
                }
                OrchestratorState::Synthesizing => match self.synthesize(subtask, &ctx).await {
                    Ok(candidate) => OrchestratorState::EvaluatingAnswer(candidate),
                    Err(reason) => {
                        warn!(reason = %reason, "Synthesis produced no usable answer");
                        self.events.emit(ResearchEvent::AnswerEvaluated {
                            subtask_id: subtask.id,
                            attempt: ctx.ledger.answer_retries(),
                            sufficient: false,
                            reason: reason.clone(),
                        });
                        ctx.ledger
                            .after_answer(false, ctx.last_answer.is_some(), &reason)
                    }
                },
                OrchestratorState::EvaluatingAnswer(candidate) => {
                    let verdict = self
                        .answer_evaluator
                        .evaluate(&AnswerEvaluationRequest {
                            subtask: subtask.description.clone(),
                            answer: candidate.clone(),
                            results: ctx.accumulator.results().to_vec(),
                        })
                        .await;
                    info!(verdict = verdict.is_sufficient, reason = %verdict.reason, "Answer evaluated");
                    self.events.emit(ResearchEvent::AnswerEvaluated {
                        subtask_id: subtask.id,
                        attempt: ctx.ledger.answer_retries(),
                        sufficient: verdict.is_sufficient,
                        reason: verdict.reason.clone(),
                    });
                    ctx.last_answer = Some(candidate);

                    let next = ctx.ledger.after_answer(verdict.is_sufficient, true, &verdict.reason);
                    if next == OrchestratorState::ExpandingQueries {
                        ctx.search_hint = verdict.retry_hint();
                        ctx.answer_feedback = verdict.retry_hint();
                    }
                    next
                }
                OrchestratorState::Done(completion) => {
                    return self.finish(subtask, ctx, completion);
                }
                OrchestratorState::Failed(reason) => {
                    return Err(SubtaskError::Exhausted {
                        subtask_id: subtask.id,
                        retries: ctx.ledger.answer_retries(),
                        reason,
                        partial_results: ctx.accumulator.into_results(),
                    });
                }
            };
        }
    }

    /// Ask for this round's queries, falling back to the description so a round always searches.
    async fn expand_queries(&self, subtask: &Subtask, ctx: &RunContext) -> Vec<SearchQuery> {
        let request = QueryGenerationRequest {
            subtask: subtask.description.clone(),
            previous_queries: ctx.issued_queries.clone(),
            refinement: ctx.search_hint.clone(),
            max_queries: self.max_queries_per_round,
        };

        let generated = match self.query_generator.invoke(&request).await {
            Ok(plan) => sanitize_queries(plan.queries, self.max_queries_per_round),
            Err(e) => {
                warn!(round = ctx.round, error = %e, "Query generation failed");
                Vec::new()
            }
        };

        let texts = if generated.is_empty() {
            let fallback = match ctx.search_hint.as_deref() {
                Some(hint) => format!("{} {hint}", subtask.description),
                None => subtask.description.clone(),
            };
            debug!(query = %fallback, "Using fallback query");
            vec![fallback]
        } else {
            generated
        };

        texts
            .into_iter()
            .map(|text| SearchQuery::new(text, ctx.round))
            .collect()
    }

    /// Fan the round's queries out, join them all, then merge into the accumulator.
    async fn search_round(&self, subtask: &Subtask, queries: &[SearchQuery], ctx: &mut RunContext) {
        let outcomes = join_all(queries.iter().map(|q| self.search_executor.execute(q))).await;

        let mut round_results = Vec::new();
        for (query, outcome) in queries.iter().zip(outcomes) {
            match outcome {
                Ok(results) => round_results.extend(results),
                Err(e) => warn!(query = %query.text, error = %e, "Search failed, contributing no results"),
            }
        }

        let new_results = ctx.accumulator.extend(round_results);
        ctx.issued_queries
            .extend(queries.iter().map(|q| q.text.clone()));

        info!(
            round = ctx.round,
            queries = queries.len(),
            new_results,
            total_results = ctx.accumulator.len(),
            "Search round completed"
        );
        self.events.emit(ResearchEvent::RoundCompleted {
            subtask_id: subtask.id,
            round: ctx.round,
            queries: queries.iter().map(|q| q.text.clone()).collect(),
            new_results,
            total_results: ctx.accumulator.len(),
        });
    }

    /// A blank or failed synthesis comes back as the reason it is unusable.
    async fn synthesize(&self, subtask: &Subtask, ctx: &RunContext) -> Result<String, String> {
        let request = SubtaskSynthesisRequest {
            subtask: subtask.description.clone(),
            results: ctx.accumulator.results().to_vec(),
            previous_answer: ctx.last_answer.clone(),
            feedback: ctx.answer_feedback.clone(),
        };

        match self.synthesizer.invoke(&request).await {
            Ok(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Ok(_) => Err("Synthesis returned an empty answer".to_string()),
            Err(e) => Err(format!("Synthesis failed: {e}")),
        }
    }

    fn finish(
        &self,
        subtask: &Subtask,
        ctx: RunContext,
        completion: Completion,
    ) -> Result<SubtaskResult, SubtaskError> {
        let retries = ctx.ledger.answer_retries();
        let Some(answer_text) = ctx.last_answer else {
            return Err(SubtaskError::Exhausted {
                subtask_id: subtask.id,
                retries,
                reason: "Finished without an answer".to_string(),
                partial_results: ctx.accumulator.into_results(),
            });
        };

        Ok(SubtaskResult {
            subtask_id: subtask.id,
            description: subtask.description.clone(),
            answer_text,
            supporting_results: ctx.accumulator.into_results(),
            retry_count: retries,
            search_rounds: ctx.ledger.rounds(),
            accepted: completion == Completion::Accepted,
        })
    }
}

/// Trim, drop blanks and repeats, keep at most `max`.
fn sanitize_queries(queries: Vec<String>, max: usize) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    for query in queries {
        let query = query.trim();
        if query.is_empty() || kept.iter().any(|k| k == query) {
            continue;
        }
        kept.push(query.to_string());
        if kept.len() == max {
            break;
        }
    }
    kept
}
