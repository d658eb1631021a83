//! Typed language-model call sites.
//!
//! Each call site is a `Prompted<Input, Output>`: a request value goes in, a decoded value comes
//! out. The orchestration logic only ever sees these, so it can be driven by deterministic stubs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::CollaboratorError;
use crate::domain::models::{QualityVerdict, SearchResult, SubtaskResult, UnresolvedSubtask};

/// A typed language-model call site.
#[async_trait]
pub trait Prompted<I, O>: Send + Sync
where
    I: Send + Sync,
    O: Send,
{
    /// Run the call site on `input`.
    async fn invoke(&self, input: &I) -> Result<O, CollaboratorError>;
}

/// Split a question into independent subtasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompositionRequest {
    /// The user question, verbatim
    pub question: String,
    /// Upper bound on subtasks to return
    pub max_subtasks: usize,
}

/// Decomposition output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPlan {
    /// Subtasks in the order they should be presented
    #[serde(default)]
    pub tasks: Vec<PlannedTask>,
    /// The model's rationale, logged only
    #[serde(default)]
    pub reason: String,
}

/// One subtask proposed by decomposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTask {
    /// Self-contained research task
    pub description: String,
}

impl TaskPlan {
    /// A plan with no rationale, one task per description.
    pub fn from_descriptions<S: Into<String>>(descriptions: impl IntoIterator<Item = S>) -> Self {
        Self {
            tasks: descriptions
                .into_iter()
                .map(|d| PlannedTask {
                    description: d.into(),
                })
                .collect(),
            reason: String::new(),
        }
    }
}

/// Produce search queries for one round of a subtask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryGenerationRequest {
    /// Subtask description
    pub subtask: String,
    /// Every query already issued for this subtask
    pub previous_queries: Vec<String>,
    /// Feedback from the last failed evaluation
    pub refinement: Option<String>,
    /// Upper bound on queries to return
    pub max_queries: usize,
}

/// Query generation output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// Queries to run this round
    #[serde(default)]
    pub queries: Vec<String>,
    /// The model's rationale, logged only
    #[serde(default)]
    pub reason: String,
}

/// Judge whether accumulated results cover the subtask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEvaluationRequest {
    /// Subtask description
    pub subtask: String,
    /// Everything accumulated so far
    pub results: Vec<SearchResult>,
}

/// Write a subtask answer from accumulated results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskSynthesisRequest {
    /// Subtask description
    pub subtask: String,
    /// Everything accumulated so far
    pub results: Vec<SearchResult>,
    /// Last candidate, when rewriting
    pub previous_answer: Option<String>,
    /// Why the last candidate was rejected
    pub feedback: Option<String>,
}

/// Judge a synthesized subtask answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerEvaluationRequest {
    /// Subtask description
    pub subtask: String,
    /// Candidate answer under review
    pub answer: String,
    /// Results the answer was written from
    pub results: Vec<SearchResult>,
}

/// Write the final answer from every resolved subtask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalSynthesisRequest {
    /// The user question, verbatim
    pub question: String,
    /// Resolved subtasks in declaration order
    pub subtask_results: Vec<SubtaskResult>,
    /// Failed subtasks, to be acknowledged in the answer
    pub unresolved: Vec<UnresolvedSubtask>,
}

/// Question to subtasks.
pub type Decomposer = dyn Prompted<DecompositionRequest, TaskPlan>;
/// Subtask to search queries.
pub type QueryGenerator = dyn Prompted<QueryGenerationRequest, QueryPlan>;
/// Search coverage judge.
pub type SearchJudge = dyn Prompted<SearchEvaluationRequest, QualityVerdict>;
/// Subtask answer writer.
pub type SubtaskSynthesizer = dyn Prompted<SubtaskSynthesisRequest, String>;
/// Subtask answer judge.
pub type AnswerJudge = dyn Prompted<AnswerEvaluationRequest, QualityVerdict>;
/// Final answer writer.
pub type FinalSynthesizer = dyn Prompted<FinalSynthesisRequest, String>;
