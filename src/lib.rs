//! Sleuth - Planner and web search orchestration engine
//!
//! Sleuth answers a natural-language question by splitting it into independent subtasks,
//! researching every subtask concurrently on the web, and merging the per-subtask answers into
//! one final answer.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and ports
//! - **Service Layer** (`services`): the task planner and the per-subtask orchestrator
//! - **Adapters** (`adapters`): Anthropic, Google Custom Search and in-memory test doubles
//! - **Application Layer** (`application`): wiring adapters into a pipeline
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use sleuth::application::ResearchPipeline;
//! use sleuth::infrastructure::config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let pipeline = ResearchPipeline::from_config(&config)?;
//!     let answer = pipeline.answer("Compare the GDP of Japan and Germany in 2023").await?;
//!     println!("{}", answer.text);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{Collaborators, ResearchPipeline};
pub use domain::errors::{CollaboratorError, PlanningError, SubtaskError};
pub use domain::models::{Config, FinalAnswer, ResearchEvent, SubtaskResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{TaskPlanner, WebSearchOrchestrator};
