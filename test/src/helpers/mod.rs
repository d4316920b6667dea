pub mod cluster;
pub mod pump;
pub mod recording_renderer;
pub mod wait;

pub use cluster::{TestCluster, APPLICATION, SERVER};
pub use pump::QueuePump;
pub use recording_renderer::{Call, RecordingRenderer};
pub use wait::eventually;
