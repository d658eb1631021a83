//! The validated user question.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::PlanningError;

/// The user's original question. Never blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    /// Fails with `EmptyQuestion` for blank text. Surrounding whitespace is trimmed.
    pub fn new(text: impl Into<String>) -> Result<Self, PlanningError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PlanningError::EmptyQuestion);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The trimmed question text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
