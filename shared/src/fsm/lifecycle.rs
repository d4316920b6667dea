use std::{sync::Arc, time::Duration};

use log::{info, warn};
use parking_lot::Mutex;

use crate::{
    base::monitor::Monitor,
    fsm::{State, StateError},
};

struct LifecycleInner {
    name: String,
    state: Monitor<State>,
    error: Mutex<String>,
    // set when the last init or exit failed by timing out
    timed_out: Mutex<Option<Duration>>,
}

/// The state machine of one entity.
///
/// ```text
/// Stopped -> Initializing -> Running | InitFailed
/// Running | InitFailed -> Stopping -> Stopped | StopFailed
/// StopFailed -(ack)-> Stopped
/// ```
///
/// `start_*` is called by the thread driving the entity, `complete_*` by
/// whichever thread handles the node's reply, and `sync_*` blocks the
/// driving thread until the reply was applied. Clones share state.
#[derive(Clone)]
pub struct EntityLifecycle {
    inner: Arc<LifecycleInner>,
}

impl EntityLifecycle {
    pub fn new(name: &str) -> Self {
        Self {
            inner: Arc::new(LifecycleInner {
                name: name.to_string(),
                state: Monitor::new(State::Stopped),
                error: Mutex::new(String::new()),
                timed_out: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn state(&self) -> State {
        self.inner.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state() == State::Running
    }

    /// Reason of the last failed init or exit
    pub fn error_message(&self) -> String {
        self.inner.error.lock().clone()
    }

    /// Moves to `to` if the current state is one of `from`, replacing the
    /// error message together with the state when `error` is given
    fn transition(
        &self,
        from: &[State],
        to: State,
        operation: &'static str,
        error: Option<&str>,
    ) -> Result<(), StateError> {
        let mut rejected = None;
        self.inner.state.update(|state| {
            if from.contains(state) {
                *state = to;
                if let Some(error) = error {
                    *self.inner.error.lock() = error.to_string();
                }
            } else {
                rejected = Some(*state);
            }
        });
        match rejected {
            None => Ok(()),
            Some(state) => Err(StateError::InvalidTransition {
                entity: self.inner.name.clone(),
                state,
                operation,
            }),
        }
    }

    // Init

    pub fn start_init(&self) -> Result<(), StateError> {
        self.transition(&[State::Stopped], State::Initializing, "start init of", Some(""))?;
        *self.inner.timed_out.lock() = None;
        Ok(())
    }

    /// Applies the node's answer to an init
    pub fn complete_init(&self, success: bool, error: &str) -> Result<(), StateError> {
        let to = if success {
            State::Running
        } else {
            State::InitFailed
        };
        self.transition(&[State::Initializing], to, "complete init of", Some(error))?;
        if success {
            info!("{} running", self.inner.name);
        } else {
            warn!("{} failed to initialize: {}", self.inner.name, error);
        }
        Ok(())
    }

    /// Waits for the init answer. Returns whether the entity is running.
    ///
    /// Calling it again after init completed returns the same answer. When
    /// no answer arrives in time the entity is marked failed, and every
    /// later call reports the same timeout until the next `start_init`.
    pub fn sync_init(&self, timeout: Duration) -> Result<bool, StateError> {
        let state = match self.inner.state.wait_ne_timeout(&State::Initializing, timeout) {
            Some(state) => state,
            None => {
                let reason = format!("no init reply within {:?}", timeout);
                if self.complete_init(false, &reason).is_ok() {
                    *self.inner.timed_out.lock() = Some(timeout);
                }
                // the reply may have raced the timeout
                self.state()
            }
        };
        match state {
            State::Running => Ok(true),
            State::InitFailed => match *self.inner.timed_out.lock() {
                Some(waited) => Err(StateError::InitTimeout {
                    entity: self.inner.name.clone(),
                    waited,
                }),
                None => Ok(false),
            },
            state => Err(StateError::InvalidTransition {
                entity: self.inner.name.clone(),
                state,
                operation: "sync init of",
            }),
        }
    }

    // Exit

    pub fn start_exit(&self) -> Result<(), StateError> {
        self.transition(
            &[State::Running, State::InitFailed],
            State::Stopping,
            "start exit of",
            None,
        )?;
        *self.inner.timed_out.lock() = None;
        Ok(())
    }

    /// Applies the node's answer to an exit
    pub fn complete_exit(&self, success: bool, error: &str) -> Result<(), StateError> {
        let to = if success {
            State::Stopped
        } else {
            State::StopFailed
        };
        self.transition(&[State::Stopping], to, "complete exit of", Some(error))?;
        if success {
            info!("{} stopped", self.inner.name);
        } else {
            warn!("{} failed to stop: {}", self.inner.name, error);
        }
        Ok(())
    }

    /// Waits for the exit answer. Returns whether the entity stopped cleanly.
    /// A timeout is reported again by every later call until the next
    /// `start_exit`.
    pub fn sync_exit(&self, timeout: Duration) -> Result<bool, StateError> {
        let state = match self.inner.state.wait_ne_timeout(&State::Stopping, timeout) {
            Some(state) => state,
            None => {
                let reason = format!("no exit reply within {:?}", timeout);
                if self.complete_exit(false, &reason).is_ok() {
                    *self.inner.timed_out.lock() = Some(timeout);
                }
                self.state()
            }
        };
        match state {
            State::Stopped => Ok(true),
            State::StopFailed => match *self.inner.timed_out.lock() {
                Some(waited) => Err(StateError::ExitTimeout {
                    entity: self.inner.name.clone(),
                    waited,
                }),
                None => Ok(false),
            },
            state => Err(StateError::InvalidTransition {
                entity: self.inner.name.clone(),
                state,
                operation: "sync exit of",
            }),
        }
    }

    /// Acknowledges a failed stop so the entity can be initialized again
    pub fn ack(&self) -> Result<(), StateError> {
        self.transition(&[State::StopFailed], State::Stopped, "acknowledge", None)
    }
}
