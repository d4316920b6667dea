use lockstep_serde::SerdeErr;
use thiserror::Error;

use crate::{
    command::CommandCode,
    types::{NodeId, ObjectId},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// No handler is registered for the command's target and code. The
    /// command is dropped.
    #[error("No handler for {code} on {target}")]
    UnknownCommand { code: CommandCode, target: ObjectId },

    /// The payload was read as a different packet than the command carries
    #[error("Expected a {expected} packet but the command carries {received}")]
    UnexpectedCode {
        expected: CommandCode,
        received: CommandCode,
    },

    #[error("Malformed command: {0}")]
    Decode(#[from] SerdeErr),

    #[error("A handler for {code} on {target} is already registered")]
    HandlerAlreadyRegistered { code: CommandCode, target: ObjectId },

    /// A reply arrived without the request id it answers
    #[error("{code} for {target} carries no request id")]
    MissingRequestId { code: CommandCode, target: ObjectId },

    #[error("No route to {node}")]
    UnknownPeer { node: NodeId },

    #[error("Sending to {node} failed: {reason}")]
    Transport { node: NodeId, reason: String },

    /// The handler understood the command but it violates the protocol
    /// in the receiver's current state
    #[error("{code} for {target} rejected: {reason}")]
    Rejected {
        code: CommandCode,
        target: ObjectId,
        reason: String,
    },
}
