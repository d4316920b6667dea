use lockstep_shared::{CommandError, EntityKind, ObjectId, PixelViewport};

use crate::entity::{Channel, NodeLink, ResourceCore, WindowPath};

/// A drawable surface on a pipe
pub struct Window {
    core: ResourceCore,
    path: WindowPath,
    pub(crate) channels: Vec<Channel>,
    pixel_viewport: PixelViewport,
}

impl Window {
    pub(crate) fn new(
        id: ObjectId,
        name: &str,
        path: WindowPath,
        link: NodeLink,
        pixel_viewport: PixelViewport,
    ) -> Self {
        Self {
            core: ResourceCore::new(id, name, EntityKind::Window, link),
            path,
            channels: Vec::new(),
            pixel_viewport,
        }
    }

    pub fn core(&self) -> &ResourceCore {
        &self.core
    }

    pub(crate) fn core_mut(&mut self) -> &mut ResourceCore {
        &mut self.core
    }

    pub fn id(&self) -> ObjectId {
        self.core.id()
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn path(&self) -> WindowPath {
        self.path
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn is_active(&self) -> bool {
        self.core.is_active()
    }

    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    pub fn pixel_viewport(&self) -> PixelViewport {
        self.pixel_viewport
    }

    /// Resizes the window; channels keep their fractional or pixel
    /// placement, whichever was set last
    pub fn set_pixel_viewport(&mut self, pixel_viewport: PixelViewport) {
        self.pixel_viewport = pixel_viewport;
        for channel in &mut self.channels {
            channel.notify_viewport_changed(&pixel_viewport);
        }
    }

    pub fn activate(&self) {
        self.core.activate();
        for channel in &self.channels {
            channel.activate();
        }
    }

    pub fn deactivate(&self) {
        self.core.deactivate();
        for channel in &self.channels {
            channel.deactivate();
        }
    }

    pub(crate) fn send_create(&self, pipe: ObjectId) -> Result<(), CommandError> {
        self.core.send_create(Some(pipe))?;
        for channel in &self.channels {
            channel.core().send_create(Some(self.id()))?;
        }
        Ok(())
    }

    pub(crate) fn send_destroy(&self) -> Result<(), CommandError> {
        for channel in &self.channels {
            channel.core().send_destroy()?;
        }
        self.core.send_destroy()
    }
}
