//! Orchestration services.
//!
//! Deterministic control logic only; every non-deterministic step goes through a port.

pub mod quality_evaluator;
pub mod search_executor;
pub mod task_planner;
pub mod websearch_orchestrator;

pub use quality_evaluator::{EvaluationLevel, QualityEvaluator};
pub use search_executor::SearchExecutor;
pub use task_planner::TaskPlanner;
pub use websearch_orchestrator::{SubtaskRun, WebSearchOrchestrator};
