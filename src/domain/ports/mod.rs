//! Ports for the external collaborators.

pub mod llm_client;
pub mod prompted;
pub mod search_provider;

pub use llm_client::{LlmClient, Prompt};
pub use prompted::{
    AnswerEvaluationRequest, AnswerJudge, Decomposer, DecompositionRequest, FinalSynthesisRequest,
    FinalSynthesizer, PlannedTask, Prompted, QueryGenerationRequest, QueryGenerator, QueryPlan,
    SearchEvaluationRequest, SearchJudge, SubtaskSynthesisRequest, SubtaskSynthesizer, TaskPlan,
};
pub use search_provider::SearchProvider;
