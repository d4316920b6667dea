mod change_type;
mod delta;
mod dirty_bits;
mod error;
mod master;
mod replicate;
mod slave;

pub use change_type::ChangeType;
pub use delta::ObjectDelta;
pub use dirty_bits::DirtyBits;
pub use error::ReplicationError;
pub use master::{ObjectMaster, SharedMaster};
pub use replicate::Replicate;
pub use slave::{ObjectSlave, SlaveInbox};
