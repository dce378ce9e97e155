/// Why a task could not finish normally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskFailure {
    #[error("{0}")]
    Transport(String),
    #[error("Unexpected stop reason: {0}")]
    UnexpectedStopReason(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Terminal state of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The decision-maker answered with terminal text (possibly empty).
    Done { text: String, turns: u32 },
    /// The fail-safe fired during the given turn.
    Aborted { turn: u32 },
    Exhausted { max_turns: u32 },
    Failed(TaskFailure),
}

pub const ABORTED_MESSAGE: &str = "⛔ Aborted — mouse moved to a screen corner.";
pub const EXHAUSTED_MESSAGE: &str =
    "Reached the maximum number of steps. The task may be incomplete.";

impl TaskOutcome {
    /// What to show the user, if anything.
    pub fn message(&self) -> Option<String> {
        match self {
            TaskOutcome::Done { text, .. } if text.is_empty() => None,
            TaskOutcome::Done { text, .. } => Some(text.clone()),
            TaskOutcome::Aborted { .. } => Some(ABORTED_MESSAGE.to_string()),
            TaskOutcome::Exhausted { .. } => Some(EXHAUSTED_MESSAGE.to_string()),
            TaskOutcome::Failed(failure) => Some(format!("Agent error: {}", failure)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Done { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskOutcome::Done { .. } => "done",
            TaskOutcome::Aborted { .. } => "aborted",
            TaskOutcome::Exhausted { .. } => "exhausted",
            TaskOutcome::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            TaskOutcome::Done {
                text: String::new(),
                turns: 1
            }
            .message(),
            None
        );
        assert_eq!(
            TaskOutcome::Done {
                text: "All set".to_string(),
                turns: 2
            }
            .message()
            .as_deref(),
            Some("All set")
        );
        assert_eq!(
            TaskOutcome::Aborted { turn: 3 }.message().as_deref(),
            Some(ABORTED_MESSAGE)
        );
        assert_eq!(
            TaskOutcome::Exhausted { max_turns: 25 }.message().as_deref(),
            Some(EXHAUSTED_MESSAGE)
        );
        assert_eq!(
            TaskOutcome::Failed(TaskFailure::UnexpectedStopReason("max_tokens".to_string()))
                .message()
                .as_deref(),
            Some("Agent error: Unexpected stop reason: max_tokens")
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(TaskOutcome::Aborted { turn: 1 }.label(), "aborted");
        assert!(!TaskOutcome::Exhausted { max_turns: 1 }.is_success());
        assert!(TaskOutcome::Done {
            text: String::new(),
            turns: 1
        }
        .is_success());
    }
}
