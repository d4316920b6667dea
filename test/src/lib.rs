pub mod helpers;
pub mod local_network;

pub use helpers::*;
pub use local_network::{LocalNetwork, NetworkEndpoint};
