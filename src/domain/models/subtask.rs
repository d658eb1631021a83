//! Subtask domain model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a subtask in the planner's decomposition.
///
/// The id doubles as the merge key: results are always merged in ascending id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubtaskId(usize);

impl SubtaskId {
    /// Id for the subtask at `index` in the decomposition.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Zero-based position in the decomposition.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SubtaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Subtask lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubtaskStatus {
    /// Created by decomposition, not yet dispatched
    #[default]
    Pending,
    /// Owned by a running orchestrator
    Running,
    /// Produced a subtask result
    Completed,
    /// Produced a terminal failure record
    Failed,
}

impl SubtaskStatus {
    /// Lowercase name, matching the serialized form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// True for `Completed` and `Failed`.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(&self) -> Vec<Self> {
        match self {
            Self::Pending => vec![Self::Running],
            Self::Running => vec![Self::Completed, Self::Failed],
            Self::Completed | Self::Failed => vec![],
        }
    }

    /// Whether the lifecycle allows moving to `new_status`.
    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

impl fmt::Display for SubtaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One independently resolvable unit of the original question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    /// Position in the decomposition
    pub id: SubtaskId,
    /// What to research, self-contained
    pub description: String,
    /// Lifecycle status, moved only through `transition_to`
    pub status: SubtaskStatus,
}

impl Subtask {
    /// A pending subtask.
    pub fn new(id: SubtaskId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            status: SubtaskStatus::Pending,
        }
    }

    /// Transition to a new status, rejecting moves the lifecycle does not allow.
    pub fn transition_to(&mut self, new_status: SubtaskStatus) -> Result<(), String> {
        if !self.status.can_transition_to(new_status) {
            return Err(format!(
                "Cannot transition subtask {} from {} to {}",
                self.id, self.status, new_status
            ));
        }
        self.status = new_status;
        Ok(())
    }

    /// Mark a subtask whose run never reported back as failed.
    ///
    /// A pending subtask passes through `Running` first, so the lifecycle is the same as a run
    /// that failed on its own.
    pub fn abort(&mut self) -> Result<(), String> {
        if self.status == SubtaskStatus::Pending {
            self.transition_to(SubtaskStatus::Running)?;
        }
        self.transition_to(SubtaskStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_happy_path() {
        let mut subtask = Subtask::new(SubtaskId::new(0), "GDP of Japan in 2023");
        assert_eq!(subtask.status, SubtaskStatus::Pending);

        subtask.transition_to(SubtaskStatus::Running).unwrap();
        subtask.transition_to(SubtaskStatus::Completed).unwrap();
        assert!(subtask.status.is_terminal());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut subtask = Subtask::new(SubtaskId::new(1), "x");
        subtask.transition_to(SubtaskStatus::Running).unwrap();
        subtask.transition_to(SubtaskStatus::Failed).unwrap();

        let err = subtask.transition_to(SubtaskStatus::Completed).unwrap_err();
        assert!(err.contains("from failed to completed"));
    }

    #[test]
    fn test_cannot_skip_running() {
        let mut subtask = Subtask::new(SubtaskId::new(2), "x");
        assert!(subtask.transition_to(SubtaskStatus::Completed).is_err());
        assert_eq!(subtask.status, SubtaskStatus::Pending);
    }

    #[test]
    fn test_abort_walks_the_lifecycle() {
        let mut pending = Subtask::new(SubtaskId::new(3), "x");
        pending.abort().unwrap();
        assert_eq!(pending.status, SubtaskStatus::Failed);

        let mut running = Subtask::new(SubtaskId::new(4), "x");
        running.transition_to(SubtaskStatus::Running).unwrap();
        running.abort().unwrap();
        assert_eq!(running.status, SubtaskStatus::Failed);
    }

    #[test]
    fn test_abort_rejects_finished_subtask() {
        let mut done = Subtask::new(SubtaskId::new(5), "x");
        done.transition_to(SubtaskStatus::Running).unwrap();
        done.transition_to(SubtaskStatus::Completed).unwrap();

        assert!(done.abort().is_err());
        assert_eq!(done.status, SubtaskStatus::Completed);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(SubtaskId::new(3).to_string(), "#3");
    }
}
