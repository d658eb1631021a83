//! Application wiring.

pub mod research_pipeline;

pub use research_pipeline::{Collaborators, ResearchPipeline};
