//! Common test utilities for integration tests
//!
//! Every collaborator is a deterministic stub; individual tests swap out the ones they care about.

#![allow(dead_code)]

use std::sync::Arc;

use sleuth::adapters::mock::{FnPrompted, MockSearchProvider};
use sleuth::application::{Collaborators, ResearchPipeline};
use sleuth::domain::models::{
    EventSink, OrchestrationConfig, QualityVerdict, ResearchEvent, SearchHit,
};
use sleuth::domain::ports::{
    AnswerEvaluationRequest, AnswerJudge, DecompositionRequest, FinalSynthesisRequest,
    QueryGenerationRequest, QueryPlan, SearchEvaluationRequest, SearchJudge,
    SubtaskSynthesisRequest, TaskPlan,
};
use sleuth::services::{
    EvaluationLevel, QualityEvaluator, SearchExecutor, TaskPlanner, WebSearchOrchestrator,
};
use tokio::sync::mpsc::UnboundedReceiver;

pub type DecomposerStub = FnPrompted<DecompositionRequest, TaskPlan>;
pub type QueryStub = FnPrompted<QueryGenerationRequest, QueryPlan>;
pub type SearchJudgeStub = FnPrompted<SearchEvaluationRequest, QualityVerdict>;
pub type SynthesizerStub = FnPrompted<SubtaskSynthesisRequest, String>;
pub type AnswerJudgeStub = FnPrompted<AnswerEvaluationRequest, QualityVerdict>;
pub type FinalStub = FnPrompted<FinalSynthesisRequest, String>;

pub fn hit(title: &str, url: &str, content: &str) -> SearchHit {
    SearchHit::new(title, url, content)
}

/// URL-safe form of a query, used by the default search stub.
pub fn slug(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join("-").to_lowercase()
}

pub fn orchestration(max_retries: u32) -> OrchestrationConfig {
    OrchestrationConfig {
        max_retries,
        ..OrchestrationConfig::default()
    }
}

pub fn sufficient_judge<I: Send + Sync + 'static>() -> FnPrompted<I, QualityVerdict> {
    FnPrompted::new(|_: &I| Ok(QualityVerdict::sufficient("covers the task")))
}

pub fn insufficient_judge<I: Send + Sync + 'static>() -> FnPrompted<I, QualityVerdict> {
    FnPrompted::new(|_: &I| {
        Ok(QualityVerdict::insufficient(
            "missing figures",
            Some("look for official statistics".to_string()),
        ))
    })
}

/// A full set of stubs that answers everything on the first round.
///
/// - decomposition: the question as the only subtask
/// - query generation: one query per round, distinct across rounds
/// - search: one hit per query, unique URL per query
/// - synthesis: "answer for <subtask>"
/// - final synthesis: every subtask answer, one per line, in the order received
pub struct Harness {
    pub decomposer: Arc<DecomposerStub>,
    pub query_generator: Arc<QueryStub>,
    pub search_judge: Arc<SearchJudgeStub>,
    pub synthesizer: Arc<SynthesizerStub>,
    pub answer_judge: Arc<AnswerJudgeStub>,
    pub final_synthesizer: Arc<FinalStub>,
    pub search: MockSearchProvider,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            decomposer: Arc::new(FnPrompted::new(|req: &DecompositionRequest| {
                Ok(TaskPlan::from_descriptions([req.question.clone()]))
            })),
            query_generator: Arc::new(FnPrompted::new(|req: &QueryGenerationRequest| {
                Ok(QueryPlan {
                    queries: vec![format!("{} r{}", req.subtask, req.previous_queries.len())],
                    reason: String::new(),
                })
            })),
            search_judge: Arc::new(sufficient_judge()),
            synthesizer: Arc::new(FnPrompted::new(|req: &SubtaskSynthesisRequest| {
                Ok(format!("answer for {}", req.subtask))
            })),
            answer_judge: Arc::new(sufficient_judge()),
            final_synthesizer: Arc::new(FnPrompted::new(|req: &FinalSynthesisRequest| {
                Ok(req
                    .subtask_results
                    .iter()
                    .map(|r| r.answer_text.clone())
                    .collect::<Vec<_>>()
                    .join("\n"))
            })),
            search: MockSearchProvider::new().with_fallback(|query| {
                vec![hit(
                    query,
                    &format!("https://example.com/{}", slug(query)),
                    &format!("Facts about {query}"),
                )]
            }),
        }
    }

    /// Decompose every question into `descriptions`.
    pub fn with_subtasks(mut self, descriptions: &[&str]) -> Self {
        let descriptions: Vec<String> = descriptions.iter().map(ToString::to_string).collect();
        self.decomposer = Arc::new(FnPrompted::new(move |_: &DecompositionRequest| {
            Ok(TaskPlan::from_descriptions(descriptions.clone()))
        }));
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            decomposer: self.decomposer.clone(),
            query_generator: self.query_generator.clone(),
            search_judge: self.search_judge.clone(),
            subtask_synthesizer: self.synthesizer.clone(),
            answer_judge: self.answer_judge.clone(),
            final_synthesizer: self.final_synthesizer.clone(),
            search_provider: Arc::new(self.search.clone()),
        }
    }

    pub fn orchestrator(&self, config: &OrchestrationConfig) -> WebSearchOrchestrator {
        let search_judge: Arc<SearchJudge> = self.search_judge.clone();
        let answer_judge: Arc<AnswerJudge> = self.answer_judge.clone();
        WebSearchOrchestrator::new(
            self.query_generator.clone(),
            SearchExecutor::new(Arc::new(self.search.clone())),
            QualityEvaluator::new(search_judge, EvaluationLevel::Search),
            self.synthesizer.clone(),
            QualityEvaluator::new(answer_judge, EvaluationLevel::Answer),
            config,
        )
    }

    pub fn planner(&self, config: &OrchestrationConfig) -> TaskPlanner {
        TaskPlanner::new(
            self.decomposer.clone(),
            Arc::new(self.orchestrator(config)),
            self.final_synthesizer.clone(),
            config,
        )
    }

    pub fn pipeline(&self, config: &OrchestrationConfig) -> ResearchPipeline {
        ResearchPipeline::with_collaborators(self.collaborators(), config)
    }

    /// A pipeline wired to an event channel.
    pub fn observed_pipeline(
        &self,
        config: &OrchestrationConfig,
    ) -> (ResearchPipeline, UnboundedReceiver<ResearchEvent>) {
        let (events, rx) = EventSink::channel();
        (self.pipeline(config).with_events(events), rx)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything currently buffered on the channel.
pub fn drain(rx: &mut UnboundedReceiver<ResearchEvent>) -> Vec<ResearchEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
