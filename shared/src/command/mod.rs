mod command;
mod command_code;
mod dispatcher;
mod error;
pub mod packets;
mod queue;
mod reply;
mod sender;

pub use command::{Command, Packet};
pub use command_code::CommandCode;
pub use dispatcher::{CommandHandler, CommandResult, Dispatcher};
pub use error::CommandError;
pub use queue::{CommandQueue, QueueKind};
pub use reply::fulfil_reply;
pub use sender::CommandSender;
