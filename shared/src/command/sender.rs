use crate::{
    command::{Command, CommandError},
    types::NodeId,
};

/// Delivers commands to other processes of the session. Delivery between a
/// pair of processes is reliable and ordered.
pub trait CommandSender: Send + Sync {
    fn send(&self, node: NodeId, command: Command) -> Result<(), CommandError>;
}
