use std::{default::Default, time::Duration};

use lockstep_shared::{NodeId, ProtocolConfig};

/// Contains Config properties which will be used by a render node or an
/// application talking to the server
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Settings both ends of the session must agree on
    pub protocol: ProtocolConfig,
    /// The process hosting the server and its configs
    pub server: NodeId,
    /// How long a channel holds its swap back waiting for the barrier
    /// release before it swaps anyway
    pub swap_release_timeout: Duration,
    /// How long a view sync waits for the requested version to arrive
    pub view_sync_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolConfig::default(),
            server: NodeId::new(1),
            swap_release_timeout: Duration::from_secs(10),
            view_sync_timeout: Duration::from_secs(1),
        }
    }
}
