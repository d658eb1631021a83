//! LLM adapters: the Anthropic client and the prompted collaborators built on it.

pub mod anthropic;
pub mod prompted;
pub mod prompts;

pub use anthropic::{classify_status, classify_transport_error, AnthropicClient};
pub use prompted::{extract_json_from_response, LlmPrompted};
pub use prompts::{
    AnswerEvaluationPrompt, DecompositionPrompt, FinalSynthesisPrompt, PromptTemplate,
    QueryGenerationPrompt, SearchEvaluationPrompt, SubtaskSynthesisPrompt,
};
