mod error;
mod request_handler;

pub use error::RequestError;
pub use request_handler::{PendingRequest, RequestHandler};
