use std::fmt;

/// Lifecycle state of a distributed entity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum State {
    #[default]
    Stopped,
    Initializing,
    InitFailed,
    Running,
    Stopping,
    StopFailed,
}

impl State {
    pub fn name(&self) -> &'static str {
        match self {
            State::Stopped => "stopped",
            State::Initializing => "initializing",
            State::InitFailed => "init failed",
            State::Running => "running",
            State::Stopping => "stopping",
            State::StopFailed => "stop failed",
        }
    }

    /// Whether exit may be started from this state
    pub fn can_exit(&self) -> bool {
        matches!(self, State::Running | State::InitFailed)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
