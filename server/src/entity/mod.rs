mod channel;
mod node;
mod path;
mod pipe;
mod resource;
mod visitor;
mod window;

pub use channel::{Channel, ChannelIAttribute, ChannelListener};
pub use node::{Node, ThreadModel};
pub use path::{ChannelPath, NodePath, PipePath, WindowPath};
pub use pipe::Pipe;
pub use resource::{NodeLink, ResourceCore};
pub use visitor::{ActivationVisitor, ActiveChannels, ChannelFinder, ConfigVisitor};
pub use window::Window;

/// Looks up a channel by its position in a node list
pub fn find_channel<'a>(nodes: &'a [Node], path: &ChannelPath) -> Option<&'a Channel> {
    nodes
        .get(path.node)?
        .pipes
        .get(path.pipe)?
        .windows
        .get(path.window)?
        .channels
        .get(path.channel)
}

pub fn find_channel_mut<'a>(nodes: &'a mut [Node], path: &ChannelPath) -> Option<&'a mut Channel> {
    nodes
        .get_mut(path.node)?
        .pipes
        .get_mut(path.pipe)?
        .windows
        .get_mut(path.window)?
        .channels
        .get_mut(path.channel)
}
