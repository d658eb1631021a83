//! Domain models.

pub mod answer;
pub mod config;
pub mod events;
pub mod query;
pub mod search;
pub mod state;
pub mod subtask;
pub mod verdict;

pub use answer::{unresolved_note, FinalAnswer, SubtaskResult, UnresolvedSubtask};
pub use config::{
    Config, LlmConfig, LogFormat, LoggingConfig, OrchestrationConfig, RetryConfig, RotationPolicy,
    SearchConfig,
};
pub use events::{EventSink, ResearchEvent};
pub use query::Query;
pub use search::{SearchAccumulator, SearchHit, SearchQuery, SearchResult};
pub use state::{Completion, OrchestratorState, RetryLedger};
pub use subtask::{Subtask, SubtaskId, SubtaskStatus};
pub use verdict::QualityVerdict;
