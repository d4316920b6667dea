//! # Lockstep Server
//! The server side of a lock-step rendering cluster. A [`Server`] hands out
//! [`Config`]s to applications; a config owns the resource tree of its
//! render nodes, the compound tree describing how channels cooperate, the
//! views they display, and the frame loop that drives them.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use lockstep_shared as shared;

mod compound;
mod config;
mod entity;
mod error;
mod layout;
mod server;
mod server_config;
mod swap_barrier;

#[cfg(test)]
mod test_support;

pub use compound::{
    ChannelState, ChannelUpdateVisitor, Compound, CompoundListener, CompoundPath,
    CompoundUpdateDataVisitor, CompoundVisitor, InheritData,
};
pub use config::Config;
pub use entity::{
    ActivationVisitor, ActiveChannels, Channel, ChannelFinder, ChannelIAttribute,
    ChannelListener, ChannelPath, ConfigVisitor, Node, NodeLink, NodePath, Pipe, PipePath,
    ResourceCore, ThreadModel, Window, WindowPath,
};
pub use error::{ConfigError, EntityFailure};
pub use layout::Layout;
pub use server::Server;
pub use server_config::ServerConfig;
pub use swap_barrier::{BarrierError, BarrierRelease, Participant, SwapBarrier, SwapBarrierSet};
