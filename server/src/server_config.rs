use std::{default::Default, time::Duration};

use lockstep_shared::ProtocolConfig;

/// Contains Config properties which will be used by the Server and every
/// config it creates
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Settings shared with every render node and application
    pub protocol: ProtocolConfig,
    /// How long a pipe, window or channel may take to answer its init.
    /// Nodes use their own launch timeout, which defaults to this value.
    pub init_timeout: Duration,
    /// How long an entity may take to answer its exit
    pub exit_timeout: Duration,
    /// How long `finish_frame` waits for a channel's frame-finish reply
    pub frame_finish_timeout: Duration,
    /// How long a swap barrier waits for all its channels before releasing
    /// whoever arrived and flagging the frame desynchronized
    pub swap_barrier_timeout: Duration,
    /// Number of frames that may be in flight before `finish_frame` blocks
    pub latency: u32,
    /// When set, entities failing to initialize are deactivated together
    /// with their children instead of failing the whole config
    pub robustness: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolConfig::default(),
            init_timeout: Duration::from_secs(60),
            exit_timeout: Duration::from_secs(60),
            frame_finish_timeout: Duration::from_secs(10),
            swap_barrier_timeout: Duration::from_secs(5),
            latency: 1,
            robustness: true,
        }
    }
}
