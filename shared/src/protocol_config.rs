use std::time::Duration;

/// Settings both ends of a session must agree on
#[derive(Clone, Debug)]
pub struct ProtocolConfig {
    /// Default bound for request/reply round trips
    pub request_timeout: Duration,
    /// Out-of-order deltas a buffered slave holds before it gives up and
    /// requires a full remap
    pub max_pending_deltas: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_pending_deltas: 64,
        }
    }
}
