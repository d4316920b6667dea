use std::time::Duration;

use thiserror::Error;

use crate::fsm::State;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The operation is not allowed in the entity's current state
    #[error("Cannot {operation} {entity} while {state}")]
    InvalidTransition {
        entity: String,
        state: State,
        operation: &'static str,
    },

    /// The entity's node never answered its init
    #[error("{entity} did not finish initializing within {waited:?}")]
    InitTimeout { entity: String, waited: Duration },

    /// The entity's node never answered its exit
    #[error("{entity} did not finish stopping within {waited:?}")]
    ExitTimeout { entity: String, waited: Duration },
}
