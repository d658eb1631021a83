//! Domain layer for the sleuth research engine
//!
//! Core models, the error taxonomy and the ports through which the orchestration logic
//! reaches its external collaborators.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{CollaboratorError, PlanningError, PlanningResult, SubtaskError};
