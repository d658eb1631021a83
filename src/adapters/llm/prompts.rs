//! Prompt templates, one per call site.

use serde::de::DeserializeOwned;
use serde_json::json;
use std::fmt::Write as _;

use super::prompted::extract_json_from_response;
use crate::domain::errors::CollaboratorError;
use crate::domain::models::{QualityVerdict, SearchResult};
use crate::domain::ports::{
    AnswerEvaluationRequest, DecompositionRequest, FinalSynthesisRequest, Prompt,
    QueryGenerationRequest, QueryPlan, SearchEvaluationRequest, SubtaskSynthesisRequest, TaskPlan,
};

/// Renders a typed request into a prompt and decodes the model's reply.
pub trait PromptTemplate: Send + Sync + 'static {
    /// Request rendered into the prompt
    type Input: Send + Sync;
    /// Decoded reply
    type Output: Send;

    /// Call-site name used in logs.
    const NAME: &'static str;

    /// Build the prompt. `today` is the current date, so the model can reason about recency.
    fn render(&self, input: &Self::Input, today: &str) -> Prompt;

    /// JSON schema of the expected reply, for structured call sites.
    fn schema(&self) -> Option<serde_json::Value> {
        None
    }

    /// Decode the raw reply. Unusable output is `MalformedOutput`.
    fn parse(&self, raw: &str) -> Result<Self::Output, CollaboratorError>;
}

fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, CollaboratorError> {
    let json = extract_json_from_response(raw);
    serde_json::from_str(&json).map_err(|e| {
        CollaboratorError::MalformedOutput(format!("Failed to parse LLM response as JSON: {e}"))
    })
}

fn parse_text(raw: &str) -> Result<String, CollaboratorError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(CollaboratorError::MalformedOutput(
            "LLM returned an empty answer".to_string(),
        ));
    }
    Ok(text.to_string())
}

fn verdict_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "is_sufficient": {"type": "boolean"},
            "reason": {"type": "string"},
            "suggested_refinement": {"type": ["string", "null"]}
        },
        "required": ["is_sufficient", "reason"]
    })
}

fn write_results(out: &mut String, results: &[SearchResult]) {
    if results.is_empty() {
        out.push_str("\n## Search results\n(none)\n");
        return;
    }
    out.push_str("\n## Search results\n");
    for (i, result) in results.iter().enumerate() {
        let _ = write!(
            out,
            "\n### Result {}\n**Query**: {}\n**Title**: {}\n**URL**: {}\n**Content**:\n{}\n",
            i + 1,
            result.query_text,
            result.title,
            result.url,
            result.content
        );
    }
}

const SOURCES_RULES: &str = "\
List only the sources you actually used, one representative URL per domain, in this form:

Sources:
- <https://example.com/article>
- <https://another.example/page>";

/// Splits a question into independent subtasks.
pub struct DecompositionPrompt;

impl PromptTemplate for DecompositionPrompt {
    type Input = DecompositionRequest;
    type Output = TaskPlan;
    const NAME: &'static str = "decomposition";

    fn render(&self, input: &DecompositionRequest, today: &str) -> Prompt {
        let system = format!(
            "Split the user's request into independent subtasks.\n\n\
             ## Current date\n{today}\n\n\
             ## How your subtasks are used\n\
             Each subtask is handed to a web search agent that runs on its own, in parallel with \
             the others. It searches the web, reads the pages and reports back. A final step \
             merges every report into the answer.\n\n\
             ## Rules\n\
             1. Produce at least one and at most {max} subtasks. A simple question is one subtask.\n\
             2. Subtasks must be fully independent. No subtask may depend on the result of \
             another, refer to another, or assume an order.\n\
             3. Split different subjects (places, periods, items) into separate subtasks.\n\
             4. Write each description as a precise, self-contained instruction for the search \
             agent, naming every entity explicitly.\n\
             5. Explain your splitting strategy in `reason`.",
            max = input.max_subtasks
        );
        Prompt::new(system, input.question.clone())
    }

    fn schema(&self) -> Option<serde_json::Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "tasks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {"description": {"type": "string"}},
                        "required": ["description"]
                    }
                },
                "reason": {"type": "string"}
            },
            "required": ["tasks", "reason"]
        }))
    }

    fn parse(&self, raw: &str) -> Result<TaskPlan, CollaboratorError> {
        parse_json(raw)
    }
}

/// Generates the search queries for one round.
pub struct QueryGenerationPrompt;

impl PromptTemplate for QueryGenerationPrompt {
    type Input = QueryGenerationRequest;
    type Output = QueryPlan;
    const NAME: &'static str = "query_generation";

    fn render(&self, input: &QueryGenerationRequest, today: &str) -> Prompt {
        let system = format!(
            "You write web search queries that answer an assigned task.\n\n\
             ## Current date\n{today}\n\n\
             ## Rules\n\
             1. Write 1 to {max} queries that look at the task from different angles. Avoid \
             overlapping queries.\n\
             2. Be specific: use proper nouns, never pronouns or vague wording.\n\
             3. Mind time: include the date for \"today\" questions, an explicit period for past \
             information, and the year or month for recent information.\n\
             4. Write natural queries a search engine understands well.\n\
             5. When earlier queries are listed, search from a different angle.",
            max = input.max_queries
        );

        let mut user = format!("## Task\n{}\n", input.subtask);
        if !input.previous_queries.is_empty() {
            user.push_str("\n## Queries already used\n");
            for query in &input.previous_queries {
                let _ = writeln!(user, "- {query}");
            }
            user.push_str(
                "\nThose queries did not find enough. Generate new queries from a different angle.\n",
            );
        }
        if let Some(refinement) = &input.refinement {
            let _ = write!(user, "\n## Feedback\n{refinement}\n");
        }

        Prompt::new(system, user)
    }

    fn schema(&self) -> Option<serde_json::Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "queries": {"type": "array", "items": {"type": "string"}},
                "reason": {"type": "string"}
            },
            "required": ["queries", "reason"]
        }))
    }

    fn parse(&self, raw: &str) -> Result<QueryPlan, CollaboratorError> {
        parse_json(raw)
    }
}

/// Judges whether accumulated results cover a subtask.
pub struct SearchEvaluationPrompt;

impl PromptTemplate for SearchEvaluationPrompt {
    type Input = SearchEvaluationRequest;
    type Output = QualityVerdict;
    const NAME: &'static str = "search_evaluation";

    fn render(&self, input: &SearchEvaluationRequest, today: &str) -> Prompt {
        let system = format!(
            "You judge whether web search results contain what is needed to complete a task.\n\n\
             ## Current date\n{today}\n\n\
             ## Judging\n\
             - `is_sufficient` is true when the results hold the facts the task asks for.\n\
             - It is false when the results are unrelated, miss key facts, or the queries were \
             clearly off target.\n\
             - `reason` states concretely what is present or missing.\n\
             - When insufficient, `suggested_refinement` says what to search for next: keywords, \
             angles, sources. Otherwise leave it null."
        );

        let mut user = format!("## Task\n{}\n", input.subtask);
        write_results(&mut user, &input.results);
        Prompt::new(system, user)
    }

    fn schema(&self) -> Option<serde_json::Value> {
        Some(verdict_schema())
    }

    fn parse(&self, raw: &str) -> Result<QualityVerdict, CollaboratorError> {
        parse_json(raw)
    }
}

/// Writes a subtask answer from the accumulated results.
pub struct SubtaskSynthesisPrompt;

impl PromptTemplate for SubtaskSynthesisPrompt {
    type Input = SubtaskSynthesisRequest;
    type Output = String;
    const NAME: &'static str = "subtask_synthesis";

    fn render(&self, input: &SubtaskSynthesisRequest, today: &str) -> Prompt {
        let system = format!(
            "You complete one research task from web search results.\n\n\
             ## Current date\n{today}\n\n\
             ## Context\n\
             Your result is merged with the results of other tasks by a writer who never sees \
             the search results. Include everything that writer needs.\n\n\
             ## Rules\n\
             1. Use only information found in the search results. Never guess.\n\
             2. Give concrete figures, dates, names and statistics with their context, e.g. \
             \"GDP grew 2.1% year on year in 2024\" rather than \"GDP grew 2.1%\".\n\
             3. Briefly explain jargon or abbreviations when the results do.\n\
             4. Answer the task directly in natural prose; add supporting detail only if relevant.\n\
             5. If the results are incomplete, say what is missing.\n\n\
             ## Sources\n{SOURCES_RULES}"
        );

        let mut user = format!("## Task\n{}\n", input.subtask);
        write_results(&mut user, &input.results);
        if let Some(feedback) = &input.feedback {
            let _ = write!(user, "\n## Feedback\n{feedback}\n");
            if let Some(previous) = &input.previous_answer {
                let _ = write!(user, "\n## Previous result\n{previous}\n");
            }
            user.push_str("\nUse the feedback to write a better result.\n");
        }

        Prompt::new(system, user)
    }

    fn parse(&self, raw: &str) -> Result<String, CollaboratorError> {
        parse_text(raw)
    }
}

/// Judges a synthesized subtask answer.
pub struct AnswerEvaluationPrompt;

impl PromptTemplate for AnswerEvaluationPrompt {
    type Input = AnswerEvaluationRequest;
    type Output = QualityVerdict;
    const NAME: &'static str = "answer_evaluation";

    fn render(&self, input: &AnswerEvaluationRequest, today: &str) -> Prompt {
        let system = format!(
            "You review the result written for a research task against the search results it \
             was based on.\n\n\
             ## Current date\n{today}\n\n\
             ## Judging\n\
             - `is_sufficient` is true only when the result answers the task, reflects the \
             important facts from the search results, and reads as clear prose focused on the \
             task.\n\
             - It is false when the search results lack the needed facts, or when the result \
             ignores, misstates or merely lists them.\n\
             - `reason` explains the judgement concretely.\n\
             - When insufficient, `suggested_refinement` gives actionable advice: what to search \
             for if facts are missing, or what to add or fix in the result otherwise. Otherwise \
             leave it null."
        );

        let mut user = format!("## Task\n{}\n", input.subtask);
        write_results(&mut user, &input.results);
        let _ = write!(user, "\n## Result to review\n{}\n", input.answer);
        Prompt::new(system, user)
    }

    fn schema(&self) -> Option<serde_json::Value> {
        Some(verdict_schema())
    }

    fn parse(&self, raw: &str) -> Result<QualityVerdict, CollaboratorError> {
        parse_json(raw)
    }
}

/// Merges resolved subtask answers into the final answer.
pub struct FinalSynthesisPrompt;

impl PromptTemplate for FinalSynthesisPrompt {
    type Input = FinalSynthesisRequest;
    type Output = String;
    const NAME: &'static str = "final_synthesis";

    fn render(&self, input: &FinalSynthesisRequest, today: &str) -> Prompt {
        let system = format!(
            "Combine the results of several research tasks into one clear answer to the user's \
             question.\n\n\
             ## Current date\n{today}\n\n\
             ## Rules\n\
             1. Integrate the results into a coherent answer; do not just list them.\n\
             2. Answer the question directly and concisely. Use bullet points or headings where \
             they help.\n\
             3. Keep every important fact from the task results.\n\
             4. Use only information from the task results. Never guess, and say so when \
             information is missing.\n\n\
             ## Sources\n{SOURCES_RULES}"
        );

        let mut user = format!("## Question\n{}\n\n## Task results\n", input.question);
        for (i, result) in input.subtask_results.iter().enumerate() {
            let _ = write!(
                user,
                "\n### Task {}: {}\n{}\n",
                i + 1,
                result.description,
                result.answer_text
            );
        }
        if !input.unresolved.is_empty() {
            user.push_str("\n## Tasks that could not be completed\n");
            for unresolved in &input.unresolved {
                let _ = writeln!(user, "- {}", unresolved.description);
            }
        }
        user.push_str("\nWrite the answer to the question from these task results.\n");

        Prompt::new(system, user)
    }

    fn parse(&self, raw: &str) -> Result<String, CollaboratorError> {
        parse_text(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{SubtaskId, SubtaskResult};

    const TODAY: &str = "2025-01-15";

    #[test]
    fn test_decomposition_prompt_carries_limit_and_date() {
        let prompt = DecompositionPrompt.render(
            &DecompositionRequest {
                question: "Compare the GDP of Japan and Germany in 2023".to_string(),
                max_subtasks: 4,
            },
            TODAY,
        );
        assert!(prompt.system.contains("at most 4 subtasks"));
        assert!(prompt.system.contains(TODAY));
        assert_eq!(prompt.user, "Compare the GDP of Japan and Germany in 2023");
    }

    #[test]
    fn test_query_prompt_lists_previous_queries_and_feedback() {
        let prompt = QueryGenerationPrompt.render(
            &QueryGenerationRequest {
                subtask: "GDP of Japan in 2023".to_string(),
                previous_queries: vec!["japan gdp".to_string()],
                refinement: Some("look for the cabinet office figures".to_string()),
                max_queries: 2,
            },
            TODAY,
        );
        assert!(prompt.user.contains("- japan gdp"));
        assert!(prompt.user.contains("## Feedback\nlook for the cabinet office figures"));
    }

    #[test]
    fn test_first_round_query_prompt_has_no_history() {
        let prompt = QueryGenerationPrompt.render(
            &QueryGenerationRequest {
                subtask: "GDP of Japan in 2023".to_string(),
                previous_queries: vec![],
                refinement: None,
                max_queries: 2,
            },
            TODAY,
        );
        assert!(!prompt.user.contains("already used"));
        assert!(!prompt.user.contains("Feedback"));
    }

    #[test]
    fn test_synthesis_prompt_lists_results() {
        let prompt = SubtaskSynthesisPrompt.render(
            &SubtaskSynthesisRequest {
                subtask: "GDP of Japan in 2023".to_string(),
                results: vec![SearchResult {
                    query_text: "japan gdp 2023".to_string(),
                    title: "Japan GDP".to_string(),
                    url: "https://stats.example/jp".to_string(),
                    content: "4.2 trillion USD".to_string(),
                }],
                previous_answer: Some("old".to_string()),
                feedback: None,
            },
            TODAY,
        );
        assert!(prompt.user.contains("**URL**: https://stats.example/jp"));
        assert!(prompt.user.contains("4.2 trillion USD"));
        // Previous answer is only shown alongside feedback
        assert!(!prompt.user.contains("Previous result"));
        assert!(prompt.system.contains("Sources:"));
    }

    #[test]
    fn test_final_prompt_keeps_task_order() {
        let result = |id: usize, description: &str| SubtaskResult {
            subtask_id: SubtaskId::new(id),
            description: description.to_string(),
            answer_text: format!("answer for {description}"),
            supporting_results: vec![],
            retry_count: 0,
            search_rounds: 1,
            accepted: true,
        };
        let prompt = FinalSynthesisPrompt.render(
            &FinalSynthesisRequest {
                question: "q".to_string(),
                subtask_results: vec![result(0, "A"), result(1, "B")],
                unresolved: vec![],
            },
            TODAY,
        );
        let a = prompt.user.find("### Task 1: A").unwrap();
        let b = prompt.user.find("### Task 2: B").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_verdict_parses_from_fenced_reply() {
        let raw = "Here is my judgement:\n```json\n{\"is_sufficient\": false, \"reason\": \"no 2023 figure\", \"suggested_refinement\": \"search IMF data\"}\n```";
        let verdict = SearchEvaluationPrompt.parse(raw).unwrap();
        assert!(!verdict.is_sufficient);
        assert_eq!(verdict.suggested_refinement.as_deref(), Some("search IMF data"));
    }

    #[test]
    fn test_unparsable_reply_is_malformed() {
        let err = DecompositionPrompt.parse("I cannot help with that").unwrap_err();
        assert!(matches!(err, CollaboratorError::MalformedOutput(_)));
    }

    #[test]
    fn test_blank_text_reply_is_malformed() {
        assert!(FinalSynthesisPrompt.parse("  \n").is_err());
    }
}
