use std::time::Duration;

use thiserror::Error;

use crate::types::RequestId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// No reply arrived before the waiter gave up. The id is abandoned and a
    /// reply arriving later is discarded.
    #[error("Request {id} timed out after {waited:?}")]
    Timeout { id: RequestId, waited: Duration },

    /// The id was never issued, was already consumed, or was abandoned
    #[error("Request {id} is not pending")]
    UnknownRequest { id: RequestId },

    /// A second reply arrived for a request that is already fulfilled
    #[error("Request {id} already received a reply")]
    DuplicateReply { id: RequestId },
}
