mod error;
mod lifecycle;
mod state;

pub use error::StateError;
pub use lifecycle::EntityLifecycle;
pub use state::State;
