use std::fmt;

use thiserror::Error;

use lockstep_shared::{
    CommandError, FrameNumber, ObjectId, ReplicationError, RequestError, State, StateError,
};

use crate::{entity::ChannelPath, swap_barrier::BarrierError};

/// An entity that did not reach the state a config operation asked for
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityFailure {
    pub id: ObjectId,
    pub entity: String,
    pub reason: String,
}

impl fmt::Display for EntityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.reason)
    }
}

fn describe(failures: &[EntityFailure]) -> String {
    failures
        .iter()
        .map(EntityFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Replication(#[from] ReplicationError),

    #[error(transparent)]
    Barrier(#[from] BarrierError),

    /// One or more entities failed to initialize and robustness could not
    /// save the config
    #[error("{config} failed to initialize: {}", describe(.failures))]
    InitFailed {
        config: String,
        failures: Vec<EntityFailure>,
    },

    /// One or more entities failed to stop. Every other entity was still
    /// stopped.
    #[error("{config} failed to stop cleanly: {}", describe(.failures))]
    ExitFailed {
        config: String,
        failures: Vec<EntityFailure>,
    },

    /// Frames can only be started on a running config
    #[error("{config} is {state}, not running")]
    NotRunning { config: String, state: State },

    /// A compound or a builder call referred to a channel the config does
    /// not have
    #[error("{config} has no channel at {path}")]
    UnknownChannel { config: String, path: ChannelPath },

    /// A builder call referred to a parent entity the config does not have
    #[error("{config} has no entity at {path}")]
    UnknownEntity { config: String, path: String },

    #[error("{config} has no layout {layout}")]
    UnknownLayout { config: String, layout: ObjectId },

    /// The channel did not report frame completion in time
    #[error("{channel} did not finish frame {frame_number}")]
    FrameFinishTimeout {
        channel: String,
        frame_number: FrameNumber,
    },
}
