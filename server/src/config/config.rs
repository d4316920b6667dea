use std::{collections::HashMap, sync::Arc, time::Instant};

use log::{info, warn};
use parking_lot::Mutex;

use lockstep_shared::{
    packets::SwapBarrierEnterPacket, CommandCode, CommandError, CommandResult, CommandSender,
    Dispatcher, EntityLifecycle, FrameNumber, InstanceId, NodeId, ObjectId, ObjectIdGenerator,
    PixelViewport, QueueKind, State, TaskMask, Viewport, VisitorResult,
};

use crate::{
    compound::{Compound, CompoundPath},
    entity::{
        ActiveChannels, ActivationVisitor, Channel, ChannelFinder, ChannelPath, ConfigVisitor,
        Node, NodeLink, NodePath, Pipe, PipePath, Window, WindowPath,
    },
    error::{ConfigError, EntityFailure},
    layout::Layout,
    server_config::ServerConfig,
    swap_barrier::{BarrierRelease, SwapBarrier, SwapBarrierSet},
};

/// A rendering session: the resource tree of the render nodes, the
/// compounds describing how they cooperate, the layouts whose views they
/// display, and the frame loop driving all of it.
pub struct Config {
    pub(crate) id: ObjectId,
    pub(crate) name: String,
    pub(crate) lifecycle: EntityLifecycle,
    pub(crate) server_config: ServerConfig,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) sender: Arc<dyn CommandSender>,
    pub(crate) ids: Arc<ObjectIdGenerator>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) compounds: Vec<Compound>,
    pub(crate) layouts: Vec<Layout>,
    pub(crate) slave_nodes: Arc<Mutex<HashMap<InstanceId, NodeId>>>,
    pub(crate) barriers: Arc<SwapBarrierSet>,
    pub(crate) init_failures: Vec<EntityFailure>,
    pub(crate) frame_number: FrameNumber,
    pub(crate) finished_frame: FrameNumber,
}

impl Config {
    pub fn new(
        name: &str,
        server_config: ServerConfig,
        dispatcher: Arc<Dispatcher>,
        sender: Arc<dyn CommandSender>,
        ids: Arc<ObjectIdGenerator>,
    ) -> Result<Self, ConfigError> {
        let id = ids.generate();
        let barriers = Arc::new(SwapBarrierSet::new(
            server_config.swap_barrier_timeout,
            sender.clone(),
        ));

        let handler_barriers = barriers.clone();
        dispatcher.register(
            id,
            CommandCode::SwapBarrierEnter,
            QueueKind::NodeThread,
            move |command| {
                let packet = command.read::<SwapBarrierEnterPacket>()?;
                handler_barriers
                    .enter(&packet, Instant::now())
                    .map_err(|err| CommandError::Rejected {
                        code: command.code,
                        target: command.target,
                        reason: err.to_string(),
                    })?;
                Ok(CommandResult::Handled)
            },
        )?;

        info!("Created config {} as {}", name, id);
        Ok(Self {
            id,
            name: name.to_string(),
            lifecycle: EntityLifecycle::new(&format!("config {}", name)),
            server_config,
            dispatcher,
            sender,
            ids,
            nodes: Vec::new(),
            compounds: Vec::new(),
            layouts: Vec::new(),
            slave_nodes: Arc::new(Mutex::new(HashMap::new())),
            barriers,
            init_failures: Vec::new(),
            frame_number: 0,
            finished_frame: 0,
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> State {
        self.lifecycle.state()
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    pub fn server_config(&self) -> &ServerConfig {
        &self.server_config
    }

    /// Number of the last started frame
    pub fn frame_number(&self) -> FrameNumber {
        self.frame_number
    }

    /// Number of the last frame every channel reported finished
    pub fn finished_frame(&self) -> FrameNumber {
        self.finished_frame
    }

    /// Entities robustness deactivated during the last init
    pub fn init_failures(&self) -> &[EntityFailure] {
        &self.init_failures
    }

    // Building

    pub fn add_node(&mut self, name: &str, remote: NodeId) -> Result<NodePath, ConfigError> {
        let path = NodePath {
            node: self.nodes.len(),
        };
        let node = Node::new(
            self.ids.generate(),
            name,
            path,
            NodeLink::new(remote, self.sender.clone()),
            self.server_config.init_timeout,
        );
        node.core().register_handlers(&self.dispatcher)?;
        self.nodes.push(node);
        Ok(path)
    }

    pub fn add_pipe(&mut self, node: NodePath, name: &str) -> Result<PipePath, ConfigError> {
        let id = self.ids.generate();
        let dispatcher = self.dispatcher.clone();
        let config = self.name.clone();
        let parent = self
            .nodes
            .get_mut(node.node)
            .ok_or_else(|| ConfigError::UnknownEntity {
                config,
                path: node.to_string(),
            })?;
        let path = node.pipe(parent.pipes.len());
        let pipe = Pipe::new(id, name, path, parent.core().link().clone());
        pipe.core().register_handlers(&dispatcher)?;
        parent.pipes.push(pipe);
        Ok(path)
    }

    pub fn add_window(
        &mut self,
        pipe: PipePath,
        name: &str,
        pixel_viewport: PixelViewport,
    ) -> Result<WindowPath, ConfigError> {
        let id = self.ids.generate();
        let dispatcher = self.dispatcher.clone();
        let config = self.name.clone();
        let parent = self.pipe_mut(pipe).ok_or_else(|| ConfigError::UnknownEntity {
            config,
            path: pipe.to_string(),
        })?;
        let path = pipe.window(parent.windows.len());
        let window = Window::new(id, name, path, parent.core().link().clone(), pixel_viewport);
        window.core().register_handlers(&dispatcher)?;
        parent.windows.push(window);
        Ok(path)
    }

    pub fn add_channel(
        &mut self,
        window: WindowPath,
        name: &str,
        viewport: Viewport,
    ) -> Result<ChannelPath, ConfigError> {
        let id = self.ids.generate();
        let dispatcher = self.dispatcher.clone();
        let config = self.name.clone();
        let parent = self
            .window_mut(window)
            .ok_or_else(|| ConfigError::UnknownEntity {
                config,
                path: window.to_string(),
            })?;
        let path = window.channel(parent.channels.len());
        let channel = Channel::new(
            id,
            name,
            path,
            parent.core().link().clone(),
            viewport,
            &parent.pixel_viewport(),
        );
        channel.register_handlers(&dispatcher)?;
        parent.channels.push(channel);
        Ok(path)
    }

    /// Adds a root compound. Every channel it renders to must exist.
    pub fn add_compound(&mut self, mut compound: Compound) -> Result<CompoundPath, ConfigError> {
        let channel_tasks = compound.channel_tasks(None);
        if let Some((path, _)) = channel_tasks
            .iter()
            .find(|(path, _)| self.channel(*path).is_none())
        {
            return Err(ConfigError::UnknownChannel {
                config: self.name.clone(),
                path: *path,
            });
        }

        let mut used: Vec<ChannelPath> = Vec::new();
        for (path, tasks) in channel_tasks {
            self.add_channel_tasks(path, tasks);
            if !used.contains(&path) {
                used.push(path);
            }
        }
        for path in used {
            if let Some(channel) = self.channel(path) {
                channel.ref_used();
            }
        }
        for barrier in compound.swap_barriers() {
            self.barriers.get_or_create(&barrier);
        }

        let path = CompoundPath::root(self.compounds.len());
        compound.set_path(path.clone());
        self.compounds.push(compound);
        Ok(path)
    }

    /// Makes the channel and its ancestors aware of the tasks a compound
    /// performs on it
    fn add_channel_tasks(&mut self, path: ChannelPath, tasks: TaskMask) {
        let Some(node) = self.nodes.get_mut(path.node) else {
            return;
        };
        node.core_mut().add_tasks(tasks);
        let Some(pipe) = node.pipes.get_mut(path.pipe) else {
            return;
        };
        pipe.core_mut().add_tasks(tasks);
        let Some(window) = pipe.windows.get_mut(path.window) else {
            return;
        };
        window.core_mut().add_tasks(tasks);
        if let Some(channel) = window.channels.get_mut(path.channel) {
            channel.core_mut().add_tasks(tasks);
        }
    }

    // Lookup

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, path: NodePath) -> Option<&Node> {
        self.nodes.get(path.node)
    }

    pub fn node_mut(&mut self, path: NodePath) -> Option<&mut Node> {
        self.nodes.get_mut(path.node)
    }

    pub fn pipe(&self, path: PipePath) -> Option<&Pipe> {
        self.node(path.parent())?.pipes.get(path.pipe)
    }

    pub fn pipe_mut(&mut self, path: PipePath) -> Option<&mut Pipe> {
        self.node_mut(path.parent())?.pipes.get_mut(path.pipe)
    }

    pub fn window(&self, path: WindowPath) -> Option<&Window> {
        self.pipe(path.parent())?.windows.get(path.window)
    }

    pub fn window_mut(&mut self, path: WindowPath) -> Option<&mut Window> {
        self.pipe_mut(path.parent())?.windows.get_mut(path.window)
    }

    pub fn channel(&self, path: ChannelPath) -> Option<&Channel> {
        self.window(path.parent())?.channels.get(path.channel)
    }

    pub fn channel_mut(&mut self, path: ChannelPath) -> Option<&mut Channel> {
        self.window_mut(path.parent())?.channels.get_mut(path.channel)
    }

    pub(crate) fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.nodes
            .iter()
            .flat_map(|node| node.pipes.iter())
            .flat_map(|pipe| pipe.windows.iter())
            .flat_map(|window| window.channels.iter())
    }

    pub(crate) fn channels_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.nodes
            .iter_mut()
            .flat_map(|node| node.pipes.iter_mut())
            .flat_map(|pipe| pipe.windows.iter_mut())
            .flat_map(|window| window.channels.iter_mut())
    }

    pub fn compounds(&self) -> &[Compound] {
        &self.compounds
    }

    pub fn compound(&self, path: &CompoundPath) -> Option<&Compound> {
        let (root, rest) = path.indices().split_first()?;
        self.compounds.get(*root)?.child(rest)
    }

    pub fn find_channel(&mut self, name: &str) -> Option<ChannelPath> {
        let mut finder = ChannelFinder::new(name);
        self.accept(&mut finder);
        finder.found()
    }

    /// Channels whose whole ancestry is active
    pub fn active_channels(&mut self) -> Vec<ChannelPath> {
        let mut visitor = ActiveChannels::default();
        self.accept(&mut visitor);
        visitor.into_paths()
    }

    pub fn accept(&mut self, visitor: &mut dyn ConfigVisitor) -> VisitorResult {
        lockstep_shared::traverse(self.nodes.iter_mut(), |node| node.accept(&mut *visitor))
    }

    /// Deactivates an entity and its children. Returns false if the config
    /// has no entity with that id.
    pub fn deactivate(&mut self, id: ObjectId) -> bool {
        let mut visitor = ActivationVisitor::deactivate(id);
        self.accept(&mut visitor);
        visitor.found()
    }

    /// Reverts `deactivate`
    pub fn activate(&mut self, id: ObjectId) -> bool {
        let mut visitor = ActivationVisitor::activate(id);
        self.accept(&mut visitor);
        visitor.found()
    }

    // Swap barriers

    pub fn swap_barrier(&self, name: &str) -> Option<Arc<SwapBarrier>> {
        self.barriers.get(name)
    }

    /// Releases every barrier frame whose timeout passed
    pub fn poll_swap_barriers(&self) {
        self.barriers.poll(Instant::now());
    }

    /// Frames that were not swapped in lock-step since the last call
    pub fn take_desync_reports(&self) -> Vec<BarrierRelease> {
        self.barriers.take_reports()
    }

    /// Every object id owned by the config, for handler cleanup
    fn object_ids(&self) -> Vec<ObjectId> {
        let mut ids = vec![self.id];
        for node in &self.nodes {
            ids.push(node.id());
            for pipe in &node.pipes {
                ids.push(pipe.id());
                for window in &pipe.windows {
                    ids.push(window.id());
                    ids.extend(window.channels.iter().map(Channel::id));
                }
            }
        }
        for layout in &self.layouts {
            ids.extend(layout.views().iter().map(|view| view.lock().object_id()));
        }
        ids
    }
}

impl Drop for Config {
    fn drop(&mut self) {
        if self.lifecycle.is_running() {
            warn!("{} dropped while running", self.name);
        }
        for id in self.object_ids() {
            self.dispatcher.deregister_object(id);
        }
    }
}
