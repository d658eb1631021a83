//! Wires adapters and services into a runnable research pipeline.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::adapters::llm::{
    AnswerEvaluationPrompt, AnthropicClient, DecompositionPrompt, FinalSynthesisPrompt,
    LlmPrompted, QueryGenerationPrompt, SearchEvaluationPrompt, SubtaskSynthesisPrompt,
};
use crate::adapters::search::GoogleSearchProvider;
use crate::domain::errors::PlanningResult;
use crate::domain::models::{Config, EventSink, FinalAnswer, OrchestrationConfig};
use crate::domain::ports::{
    AnswerJudge, Decomposer, FinalSynthesizer, LlmClient, QueryGenerator, SearchJudge,
    SearchProvider, SubtaskSynthesizer,
};
use crate::services::{
    EvaluationLevel, QualityEvaluator, SearchExecutor, TaskPlanner, WebSearchOrchestrator,
};

/// Every non-deterministic collaborator the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Splits the question into subtasks
    pub decomposer: Arc<Decomposer>,
    /// Produces each round's search queries
    pub query_generator: Arc<QueryGenerator>,
    /// Judges search coverage
    pub search_judge: Arc<SearchJudge>,
    /// Writes subtask answers
    pub subtask_synthesizer: Arc<SubtaskSynthesizer>,
    /// Judges subtask answers
    pub answer_judge: Arc<AnswerJudge>,
    /// Writes the final answer
    pub final_synthesizer: Arc<FinalSynthesizer>,
    /// Runs web searches
    pub search_provider: Arc<dyn SearchProvider>,
}

impl Collaborators {
    /// Anthropic-backed call sites and Google search.
    pub fn from_config(config: &Config) -> Result<Self> {
        let llm: Arc<dyn LlmClient> = Arc::new(
            AnthropicClient::new(&config.llm).context("Failed to create Anthropic client")?,
        );
        let search = GoogleSearchProvider::new(&config.search)
            .context("Failed to create Google search provider")?;

        Ok(Self {
            decomposer: Arc::new(LlmPrompted::new(Arc::clone(&llm), DecompositionPrompt)),
            query_generator: Arc::new(LlmPrompted::new(Arc::clone(&llm), QueryGenerationPrompt)),
            search_judge: Arc::new(LlmPrompted::new(Arc::clone(&llm), SearchEvaluationPrompt)),
            subtask_synthesizer: Arc::new(LlmPrompted::new(
                Arc::clone(&llm),
                SubtaskSynthesisPrompt,
            )),
            answer_judge: Arc::new(LlmPrompted::new(Arc::clone(&llm), AnswerEvaluationPrompt)),
            final_synthesizer: Arc::new(LlmPrompted::new(llm, FinalSynthesisPrompt)),
            search_provider: Arc::new(search),
        })
    }
}

/// Entry point for answering questions.
///
/// Each call to [`answer`](Self::answer) builds a fresh planner over the shared collaborators,
/// so concurrent questions never share run state.
pub struct ResearchPipeline {
    collaborators: Collaborators,
    orchestration: OrchestrationConfig,
    events: EventSink,
}

impl ResearchPipeline {
    /// Wire the Anthropic and Google adapters described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::with_collaborators(
            Collaborators::from_config(config)?,
            &config.orchestration,
        ))
    }

    /// Wire arbitrary collaborators, typically stubs in tests.
    pub fn with_collaborators(
        collaborators: Collaborators,
        orchestration: &OrchestrationConfig,
    ) -> Self {
        Self {
            collaborators,
            orchestration: orchestration.clone(),
            events: EventSink::disabled(),
        }
    }

    /// Send progress events to `events`.
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Answer one question. Every log line of the run carries the same `run_id`.
    #[instrument(skip(self, question), fields(run_id = %Uuid::new_v4()))]
    pub async fn answer(&self, question: &str) -> PlanningResult<FinalAnswer> {
        self.planner().answer(question).await
    }

    fn planner(&self) -> TaskPlanner {
        let c = &self.collaborators;
        let orchestrator = WebSearchOrchestrator::new(
            Arc::clone(&c.query_generator),
            SearchExecutor::new(Arc::clone(&c.search_provider)),
            QualityEvaluator::new(Arc::clone(&c.search_judge), EvaluationLevel::Search),
            Arc::clone(&c.subtask_synthesizer),
            QualityEvaluator::new(Arc::clone(&c.answer_judge), EvaluationLevel::Answer),
            &self.orchestration,
        )
        .with_events(self.events.clone());

        TaskPlanner::new(
            Arc::clone(&c.decomposer),
            Arc::new(orchestrator),
            Arc::clone(&c.final_synthesizer),
            &self.orchestration,
        )
        .with_events(self.events.clone())
    }
}
