use serde::Serialize;
use std::fmt;

/// Recognition mode for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecognitionMode {
    /// One bounded recognition attempt yielding exactly one terminal result
    SingleShot,
    /// Open-ended streaming until stopped or canceled
    Continuous,
}

/// Session lifecycle state.
///
/// `Idle -> Starting -> Active -> Stopping -> Idle`, with `Canceled`
/// reachable from `Starting` or `Active` on backend error or explicit
/// cancellation. `Canceled` settles back to `Idle` once the terminal event
/// has been delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Starting,
    Active,
    Stopping,
    Canceled,
}

impl SessionState {
    /// Whether a transition to `next` is part of the lifecycle graph.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Starting)
                | (Starting, Active)
                | (Starting, Idle)
                | (Starting, Canceled)
                | (Active, Stopping)
                | (Active, Canceled)
                | (Stopping, Idle)
                | (Canceled, Idle)
        )
    }

    /// True once the current session cannot continue.
    pub fn is_terminal(self) -> bool {
        self == SessionState::Canceled
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Active => "active",
            SessionState::Stopping => "stopping",
            SessionState::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        assert!(SessionState::Idle.can_transition_to(SessionState::Starting));
        assert!(SessionState::Starting.can_transition_to(SessionState::Active));
        assert!(SessionState::Active.can_transition_to(SessionState::Stopping));
        assert!(SessionState::Stopping.can_transition_to(SessionState::Idle));

        assert!(!SessionState::Idle.can_transition_to(SessionState::Active));
        assert!(!SessionState::Stopping.can_transition_to(SessionState::Active));
    }

    #[test]
    fn test_cancel_reachable_from_starting_and_active() {
        assert!(SessionState::Starting.can_transition_to(SessionState::Canceled));
        assert!(SessionState::Active.can_transition_to(SessionState::Canceled));
        assert!(SessionState::Canceled.can_transition_to(SessionState::Idle));
        assert!(!SessionState::Idle.can_transition_to(SessionState::Canceled));
    }
}
