use thiserror::Error;

use lockstep_shared::{
    CommandError, EntityKind, ObjectId, ReplicationError, RequestError, StateError,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Replication(#[from] ReplicationError),

    #[error(transparent)]
    State(#[from] StateError),

    /// A command names an entity this node does not mirror
    #[error("{id} is not mirrored on this node")]
    UnknownEntity { id: ObjectId },

    /// The server created an entity twice
    #[error("{id} is already mirrored on this node")]
    DuplicateEntity { id: ObjectId },

    /// An entity's parent is missing or has the wrong kind
    #[error("{} {id} cannot live under {parent:?}", .kind.name())]
    InvalidParent {
        id: ObjectId,
        kind: EntityKind,
        parent: Option<ObjectId>,
    },

    /// A frame command reached an entity that is not a running channel
    #[error("{id} is not a running channel")]
    NotARunningChannel { id: ObjectId },

    /// The master refused to map a slave, usually because this node already
    /// maps it
    #[error("Mapping {view} was refused")]
    MapRefused { view: ObjectId },

    #[error("{view} is not mapped on this node")]
    ViewNotMapped { view: ObjectId },
}
