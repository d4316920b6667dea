//! In-memory network for end-to-end testing
//! Routes commands between the dispatchers of one process without network
//! I/O. Every command is encoded and decoded on the way, as a real
//! transport would.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use log::{trace, warn};
use parking_lot::{Mutex, RwLock};

use lockstep_shared::{Command, CommandCode, CommandError, CommandSender, Dispatcher, NodeId};

#[derive(Default)]
pub struct LocalNetwork {
    nodes: RwLock<HashMap<NodeId, Arc<Dispatcher>>>,
    disconnected: Mutex<HashSet<NodeId>>,
    lost: Mutex<HashSet<(NodeId, CommandCode)>>,
    delivered: Mutex<HashMap<CommandCode, usize>>,
}

impl LocalNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes `node` reachable; commands for it land in `dispatcher`
    pub fn attach(&self, node: NodeId, dispatcher: Arc<Dispatcher>) {
        self.nodes.write().insert(node, dispatcher);
    }

    /// The sender a process running as `node` uses
    pub fn endpoint(self: &Arc<Self>, node: NodeId) -> Arc<NetworkEndpoint> {
        Arc::new(NetworkEndpoint {
            network: self.clone(),
            node,
        })
    }

    /// Every send from or to `node` fails from now on
    pub fn disconnect(&self, node: NodeId) {
        self.disconnected.lock().insert(node);
    }

    pub fn reconnect(&self, node: NodeId) {
        self.disconnected.lock().remove(&node);
    }

    /// Commands with `code` sent by `node` are silently lost
    pub fn lose(&self, node: NodeId, code: CommandCode) {
        self.lost.lock().insert((node, code));
    }

    pub fn stop_losing(&self, node: NodeId, code: CommandCode) {
        self.lost.lock().remove(&(node, code));
    }

    /// How many commands with `code` reached a dispatcher
    pub fn delivered(&self, code: CommandCode) -> usize {
        self.delivered.lock().get(&code).copied().unwrap_or(0)
    }

    fn deliver(&self, from: NodeId, to: NodeId, command: Command) -> Result<(), CommandError> {
        {
            let disconnected = self.disconnected.lock();
            if let Some(node) = [from, to].into_iter().find(|node| disconnected.contains(node)) {
                return Err(CommandError::Transport {
                    node: to,
                    reason: format!("{} is disconnected", node),
                });
            }
        }
        if self.lost.lock().contains(&(from, command.code)) {
            trace!("Lost {} from {} to {}", command.code, from, to);
            return Ok(());
        }

        let Some(dispatcher) = self.nodes.read().get(&to).cloned() else {
            return Err(CommandError::Transport {
                node: to,
                reason: "no such node".to_string(),
            });
        };

        let bytes = command.to_bytes();
        let command = Command::from_bytes(&bytes)?;
        let code = command.code;
        trace!("{} -> {}: {} ({} bytes)", from, to, code, bytes.len());
        // the sender never learns what the receiver made of it
        if let Err(err) = dispatcher.dispatch(command) {
            warn!("{} could not dispatch {}: {}", to, code, err);
            return Ok(());
        }
        *self.delivered.lock().entry(code).or_insert(0) += 1;
        Ok(())
    }
}

/// One node's view of the [`LocalNetwork`]
pub struct NetworkEndpoint {
    network: Arc<LocalNetwork>,
    node: NodeId,
}

impl NetworkEndpoint {
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl CommandSender for NetworkEndpoint {
    fn send(&self, node: NodeId, command: Command) -> Result<(), CommandError> {
        self.network.deliver(self.node, node, command)
    }
}
