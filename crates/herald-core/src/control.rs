//! Director lifecycle.
//!
//! ```text
//! Initializing --initialize--> Stopped --start--> Running <--pause/resume--> Paused
//!                                 ^                  |                          |
//!                                 +------stop--------+-----------stop-----------+
//! any --shutdown--> ShuttingDown --(actors cleared)--> Stopped
//! ```
//!
//! Frames are dispatched only while [`DirectorState::Running`].

use serde::Serialize;

/// Lifecycle state of the director.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectorState {
    /// Constructed but not yet initialized.
    #[default]
    Initializing,
    /// Ready, not dispatching.
    Stopped,
    /// Dispatching frames.
    Running,
    /// Temporarily not dispatching.
    Paused,
    /// Tearing down actors and mailboxes.
    ShuttingDown,
}

impl core::fmt::Display for DirectorState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Initializing => "INITIALIZING",
            Self::Stopped => "STOPPED",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::ShuttingDown => "SHUTTING_DOWN",
        };
        f.write_str(name)
    }
}

/// A requested lifecycle change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Finish setup.
    Initialize,
    /// Begin dispatching.
    Start,
    /// Suspend dispatching.
    Pause,
    /// Continue after a pause.
    Resume,
    /// Stop dispatching.
    Stop,
    /// Begin teardown.
    Shutdown,
    /// Teardown finished.
    Finish,
}

impl core::fmt::Display for Transition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Initialize => "initialize",
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Shutdown => "shutdown",
            Self::Finish => "finish",
        };
        f.write_str(name)
    }
}

impl DirectorState {
    /// The state `transition` leads to from here, or `None` if it is not
    /// allowed.
    pub const fn apply(self, transition: Transition) -> Option<Self> {
        match (self, transition) {
            (Self::Initializing, Transition::Initialize) => Some(Self::Stopped),
            (Self::Stopped, Transition::Start) => Some(Self::Running),
            (Self::Running, Transition::Pause) => Some(Self::Paused),
            (Self::Paused, Transition::Resume) => Some(Self::Running),
            (Self::Running | Self::Paused, Transition::Stop) => Some(Self::Stopped),
            (Self::ShuttingDown, Transition::Finish) => Some(Self::Stopped),
            (Self::ShuttingDown, Transition::Shutdown) => None,
            (_, Transition::Shutdown) => Some(Self::ShuttingDown),
            _ => None,
        }
    }

    /// Whether frames are dispatched in this state.
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        let state = DirectorState::default();
        let state = state.apply(Transition::Initialize);
        assert_eq!(state, Some(DirectorState::Stopped));
        let state = state.and_then(|s| s.apply(Transition::Start));
        assert_eq!(state, Some(DirectorState::Running));
        let state = state.and_then(|s| s.apply(Transition::Pause));
        assert_eq!(state, Some(DirectorState::Paused));
        let state = state.and_then(|s| s.apply(Transition::Resume));
        assert!(state.is_some_and(DirectorState::is_running));
        let state = state.and_then(|s| s.apply(Transition::Stop));
        assert_eq!(state, Some(DirectorState::Stopped));
    }

    #[test]
    fn illegal_transitions_are_refused() {
        assert_eq!(DirectorState::Initializing.apply(Transition::Start), None);
        assert_eq!(DirectorState::Stopped.apply(Transition::Pause), None);
        assert_eq!(DirectorState::Running.apply(Transition::Resume), None);
        assert_eq!(DirectorState::Paused.apply(Transition::Start), None);
        assert_eq!(DirectorState::ShuttingDown.apply(Transition::Shutdown), None);
    }

    #[test]
    fn shutdown_from_anywhere_ends_stopped() {
        for state in [
            DirectorState::Initializing,
            DirectorState::Stopped,
            DirectorState::Running,
            DirectorState::Paused,
        ] {
            let done = state
                .apply(Transition::Shutdown)
                .and_then(|s| s.apply(Transition::Finish));
            assert_eq!(done, Some(DirectorState::Stopped));
        }
    }
}
