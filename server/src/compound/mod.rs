mod channel_update_visitor;
mod compound;
mod inherit_data;
mod update_data_visitor;
mod visitor;

pub use channel_update_visitor::ChannelUpdateVisitor;
pub use compound::{Compound, CompoundListener, CompoundPath};
pub use inherit_data::{ChannelState, InheritData};
pub use update_data_visitor::CompoundUpdateDataVisitor;
pub use visitor::CompoundVisitor;
