//! Adapters for external systems: the language model, web search and in-memory test doubles.

pub mod llm;
pub mod mock;
pub mod search;
