mod context;
mod eye;
mod frustum;
mod task;
mod view;
mod viewport;

pub use context::RenderContext;
pub use eye::{Eye, EyeMask};
pub use frustum::{Frustum, Wall};
pub use task::TaskMask;
pub use view::View;
pub use viewport::{PixelViewport, Viewport};
