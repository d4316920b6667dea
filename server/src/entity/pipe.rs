use lockstep_shared::{CommandError, EntityKind, ObjectId};

use crate::entity::{NodeLink, PipePath, ResourceCore, Window};

/// A graphics card, driven by one thread of its node
pub struct Pipe {
    core: ResourceCore,
    path: PipePath,
    pub(crate) windows: Vec<Window>,
    device: u32,
}

impl Pipe {
    pub(crate) fn new(id: ObjectId, name: &str, path: PipePath, link: NodeLink) -> Self {
        Self {
            core: ResourceCore::new(id, name, EntityKind::Pipe, link),
            path,
            windows: Vec::new(),
            device: 0,
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

    pub fn path(&self) -> PipePath {
        self.path
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn is_active(&self) -> bool {
        self.core.is_active()
    }

    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    /// Index of the graphics card on its node
    pub fn device(&self) -> u32 {
        self.device
    }

    pub fn set_device(&mut self, device: u32) {
        self.device = device;
    }

    pub fn activate(&self) {
        self.core.activate();
        for window in &self.windows {
            window.activate();
        }
    }

    pub fn deactivate(&self) {
        self.core.deactivate();
        for window in &self.windows {
            window.deactivate();
        }
    }

    pub(crate) fn send_create(&self, node: ObjectId) -> Result<(), CommandError> {
        self.core.send_create(Some(node))?;
        for window in &self.windows {
            window.send_create(self.id())?;
        }
        Ok(())
    }

    pub(crate) fn send_destroy(&self) -> Result<(), CommandError> {
        for window in &self.windows {
            window.send_destroy()?;
        }
        self.core.send_destroy()
    }
}
