//! # Lockstep Shared
//! Common functionality shared between lockstep-server & lockstep-client
//! crates: replicated objects, commands and their dispatch, request/reply
//! correlation, entity lifecycles and the traversal primitives used by both
//! resource and compound trees.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use lockstep_serde::{
    BitReader, BitWrite, BitWriter, ConstBitLength, OwnedBitReader, Serde, SerdeErr,
    SignedInteger, SignedVariableInteger, UnsignedInteger, UnsignedVariableInteger,
};

mod base;
mod command;
mod fsm;
mod object;
mod protocol_config;
mod render;
mod request;
mod types;
mod visitor;

pub use base::{
    atomic::{memory_barrier, CompareAndSwap},
    id_generator::ObjectIdGenerator,
    monitor::Monitor,
    observer_list::ObserverList,
};
pub use command::{
    fulfil_reply, packets, Command, CommandCode, CommandError, CommandHandler, CommandQueue,
    CommandResult, CommandSender, Dispatcher, Packet, QueueKind,
};
pub use fsm::{EntityLifecycle, State, StateError};
pub use object::{
    ChangeType, DirtyBits, ObjectDelta, ObjectMaster, ObjectSlave, Replicate, ReplicationError,
    SharedMaster, SlaveInbox,
};
pub use protocol_config::ProtocolConfig;
pub use render::{
    Eye, EyeMask, Frustum, PixelViewport, RenderContext, TaskMask, View, Viewport, Wall,
};
pub use request::{PendingRequest, RequestError, RequestHandler};
pub use types::{EntityKind, FrameNumber, InstanceId, NodeId, ObjectId, RequestId, Version};
pub use visitor::{traverse, VisitorResult};
