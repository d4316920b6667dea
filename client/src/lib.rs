//! # Lockstep Client
//! The render-node side of a lockstep cluster. A [`RenderNode`] mirrors the
//! nodes, pipes, windows and channels a server config places on this
//! process, answers their lifecycle and frame commands through a
//! [`Renderer`], mirrors shared views and holds channels back at their swap
//! barriers. [`ServerProxy`] gives applications blocking access to the
//! server's config registry.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use lockstep_shared as shared;

mod client_config;
mod error;
mod mirror;
mod render_node;
mod renderer;
mod server_proxy;
mod swap_gate;
mod view_mirror;

#[cfg(test)]
mod test_support;

pub use client_config::ClientConfig;
pub use error::ClientError;
pub use mirror::MirrorInfo;
pub use render_node::RenderNode;
pub use renderer::Renderer;
pub use server_proxy::ServerProxy;
