use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::command::Command;

/// Which thread of a process executes a command
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Entity work: init, exit and frame tasks. May block.
    NodeThread,
    /// Commands that must not wait behind blocked entity work, such as
    /// releases a node thread is waiting on
    CommandThread,
}

/// FIFO of commands waiting for their thread
pub struct CommandQueue {
    sender: Sender<Command>,
    receiver: Receiver<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn push(&self, command: Command) {
        // both ends live as long as the queue, so sending cannot fail
        let _ = self.sender.send(command);
    }

    pub fn try_pop(&self) -> Option<Command> {
        self.receiver.try_recv().ok()
    }

    pub fn pop_timeout(&self, timeout: Duration) -> Option<Command> {
        self.receiver.recv_timeout(timeout).ok()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}
