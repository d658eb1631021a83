//! Infrastructure layer module
//!
//! Process-wide concerns that sit outside the orchestration logic:
//! - Configuration management
//! - Logging infrastructure
//!
//! Configuration is read once at start-up and logging is installed once.

pub mod config;
pub mod logging;
