use std::time::Duration;

use lockstep_shared::{CommandError, EntityKind, NodeId, ObjectId};

use crate::entity::{NodeLink, NodePath, Pipe, ResourceCore};

/// How the pipes of a node are synchronized with each other
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThreadModel {
    /// Pipes run freely
    Async,
    /// Pipes wait for each other after drawing
    #[default]
    DrawSync,
    /// Pipes wait for each other at the end of the frame
    LocalSync,
}

/// A render process, usually one per machine
pub struct Node {
    core: ResourceCore,
    path: NodePath,
    pub(crate) pipes: Vec<Pipe>,
    thread_model: ThreadModel,
    launch_timeout: Duration,
}

impl Node {
    pub(crate) fn new(
        id: ObjectId,
        name: &str,
        path: NodePath,
        link: NodeLink,
        launch_timeout: Duration,
    ) -> Self {
        Self {
            core: ResourceCore::new(id, name, EntityKind::Node, link),
            path,
            pipes: Vec::new(),
            thread_model: ThreadModel::default(),
            launch_timeout,
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

    pub fn path(&self) -> NodePath {
        self.path
    }

    pub fn remote(&self) -> NodeId {
        self.core.link().node()
    }

    pub fn pipes(&self) -> &[Pipe] {
        &self.pipes
    }

    pub fn is_active(&self) -> bool {
        self.core.is_active()
    }

    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    pub fn thread_model(&self) -> ThreadModel {
        self.thread_model
    }

    pub fn set_thread_model(&mut self, thread_model: ThreadModel) {
        self.thread_model = thread_model;
    }

    /// How long the node may take to answer its init
    pub fn launch_timeout(&self) -> Duration {
        self.launch_timeout
    }

    pub fn set_launch_timeout(&mut self, launch_timeout: Duration) {
        self.launch_timeout = launch_timeout;
    }

    pub fn activate(&self) {
        self.core.activate();
        for pipe in &self.pipes {
            pipe.activate();
        }
    }

    /// Deactivates the node and everything below it
    pub fn deactivate(&self) {
        self.core.deactivate();
        for pipe in &self.pipes {
            pipe.deactivate();
        }
    }

    /// Announces the node and its children to the render node, parents
    /// first
    pub(crate) fn send_create(&self, config: ObjectId) -> Result<(), CommandError> {
        self.core.send_create(Some(config))?;
        for pipe in &self.pipes {
            pipe.send_create(self.id())?;
        }
        Ok(())
    }

    /// Children first
    pub(crate) fn send_destroy(&self) -> Result<(), CommandError> {
        for pipe in &self.pipes {
            pipe.send_destroy()?;
        }
        self.core.send_destroy()
    }
}
