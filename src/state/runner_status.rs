/// Runner status definitions for tracking crawl run progress
///
/// A runner walks `New -> Running -> {Completed | Exit}`. `Exit` covers both
/// a user-initiated stop and a setup failure; `Completed` means the frontier
/// drained or a page/depth limit was reached.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerStatus {
    /// Run has been created but not started
    New,

    /// Worker pool is active
    Running,

    /// Run finished on its own (frontier drained or limits reached)
    Completed,

    /// Run was stopped by the operator or failed during setup
    Exit,
}

impl RunnerStatus {
    /// Returns true if this is a terminal status (the run will never resume)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Exit)
    }

    /// Returns true if the transition to `next` is legal
    ///
    /// Terminal statuses accept no transitions; `New` may only start
    /// running or be aborted; `Running` may only end.
    pub fn can_transition(&self, next: RunnerStatus) -> bool {
        matches!(
            (self, next),
            (Self::New, Self::Running)
                | (Self::New, Self::Exit)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Exit)
        )
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Exit => "exit",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

impl fmt::Display for RunnerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_string_roundtrip() {
        for status in [
            RunnerStatus::New,
            RunnerStatus::Running,
            RunnerStatus::Completed,
            RunnerStatus::Exit,
        ] {
            let parsed = RunnerStatus::from_db_string(status.to_db_string());
            assert_eq!(parsed, Some(status));
        }
    }

    #[test]
    fn test_invalid_db_string() {
        assert_eq!(RunnerStatus::from_db_string("paused"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!RunnerStatus::New.is_terminal());
        assert!(!RunnerStatus::Running.is_terminal());
        assert!(RunnerStatus::Completed.is_terminal());
        assert!(RunnerStatus::Exit.is_terminal());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(RunnerStatus::New.can_transition(RunnerStatus::Running));
        assert!(RunnerStatus::New.can_transition(RunnerStatus::Exit));
        assert!(RunnerStatus::Running.can_transition(RunnerStatus::Completed));
        assert!(RunnerStatus::Running.can_transition(RunnerStatus::Exit));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!RunnerStatus::New.can_transition(RunnerStatus::Completed));
        assert!(!RunnerStatus::Completed.can_transition(RunnerStatus::Running));
        assert!(!RunnerStatus::Exit.can_transition(RunnerStatus::Running));
        assert!(!RunnerStatus::Running.can_transition(RunnerStatus::New));
    }
}
