use lockstep_shared::{EyeMask, Frustum, PixelViewport, TaskMask, Viewport};

use crate::entity::ChannelPath;

/// The attributes a compound actually renders with, after merging its own
/// settings with those of its ancestors.
#[derive(Clone, Debug, PartialEq)]
pub struct InheritData {
    pub channel: Option<ChannelPath>,
    pub tasks: TaskMask,
    pub eyes: EyeMask,
    /// Area of the destination channel, relative to the channel
    pub viewport: Viewport,
    pub pixel_viewport: PixelViewport,
    pub frustum: Frustum,
    pub swap_barrier: Option<String>,
    /// False if the compound, an ancestor or its channel is inactive
    pub active: bool,
}

impl Default for InheritData {
    fn default() -> Self {
        Self {
            channel: None,
            tasks: TaskMask::DEFAULT,
            eyes: EyeMask::default(),
            viewport: Viewport::FULL,
            pixel_viewport: PixelViewport::default(),
            frustum: Frustum::default(),
            swap_barrier: None,
            active: true,
        }
    }
}

/// What the inherit update needs to know about the compound's channel
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelState {
    pub pixel_viewport: PixelViewport,
    pub active: bool,
    /// Frustum of the view the channel displays
    pub view_frustum: Option<Frustum>,
}
