use std::time::Duration;

use lockstep_serde::SerdeErr;
use thiserror::Error;

use crate::types::{InstanceId, ObjectId, Version};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplicationError {
    /// A static object was changed after its first full transmission
    #[error("{object_id} is static and cannot be committed after it was transmitted")]
    StaticCommit { object_id: ObjectId },

    /// A delta at or below the applied version arrived again
    #[error("{object_id}: discarding stale {version}, already at {applied}")]
    StaleDelta {
        object_id: ObjectId,
        version: Version,
        applied: Version,
    },

    /// A delta with an already buffered version arrived again
    #[error("{object_id}: discarding duplicate {version}")]
    DuplicateDelta { object_id: ObjectId, version: Version },

    /// A delta was routed to the slave of a different object
    #[error("Delta for {received} delivered to slave of {expected}")]
    WrongObject {
        expected: ObjectId,
        received: ObjectId,
    },

    /// More out-of-order deltas are buffered than the configured bound
    #[error("{object_id}: {pending} deltas pending past {applied}, slave must be remapped")]
    GapOverflow {
        object_id: ObjectId,
        applied: Version,
        pending: usize,
    },

    /// The slave lost deltas and only accepts a fresh snapshot
    #[error("{object_id} requires a full remap before it can sync")]
    ResyncRequired { object_id: ObjectId },

    /// The requested version did not become available in time
    #[error("{object_id}: {target} not available after {waited:?}, at {applied}")]
    SyncTimeout {
        object_id: ObjectId,
        target: Version,
        applied: Version,
        waited: Duration,
    },

    /// A slave was created from a delta that does not carry every field
    #[error("{object_id}: {version} is not a full snapshot")]
    NotASnapshot { object_id: ObjectId, version: Version },

    #[error("{object_id} already has a slave {instance_id}")]
    SlaveAlreadyMapped {
        object_id: ObjectId,
        instance_id: InstanceId,
    },

    #[error("{object_id} has no slave {instance_id}")]
    SlaveNotMapped {
        object_id: ObjectId,
        instance_id: InstanceId,
    },

    /// The master is going away while slaves still mirror it
    #[error("{object_id} cannot be destroyed while {slaves} slaves are mapped")]
    SlavesStillMapped { object_id: ObjectId, slaves: usize },

    #[error("Malformed delta payload: {0}")]
    Serde(#[from] SerdeErr),
}
