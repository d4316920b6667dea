use std::{
    collections::HashMap,
    sync::Arc,
    time::Instant,
};

use log::{info, warn};
use parking_lot::Mutex;

use lockstep_shared::{
    packets::{
        ChannelFrameDrawPacket, ChannelFrameFinishPacket, ChannelFrameFinishReplyPacket,
        ChannelSetNearFarPacket, ConfigExitReplyPacket, ConfigInitPacket, ConfigInitReplyPacket,
        CreateEntityPacket, DestroyEntityPacket, SwapBarrierEnterPacket, SwapBarrierReleasePacket,
    },
    Command, CommandCode, CommandError, CommandResult, CommandSender, Dispatcher, EntityKind,
    FrameNumber, NodeId, ObjectId, Packet, QueueKind, State,
};

use crate::{
    client_config::ClientConfig,
    error::ClientError,
    mirror::{MirrorInfo, Mirrors},
    renderer::Renderer,
    swap_gate::SwapGate,
    view_mirror::ViewSlaves,
};

struct FrameRecord {
    start_time: f32,
    swapped: bool,
}

/// State the command handlers of a render node share
pub(crate) struct NodeShared<R: Renderer> {
    pub(crate) node: NodeId,
    pub(crate) client_config: ClientConfig,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) sender: Arc<dyn CommandSender>,
    renderer: Mutex<R>,
    mirrors: Mutex<Mirrors>,
    swaps: SwapGate,
    frames: Mutex<HashMap<(ObjectId, FrameNumber), FrameRecord>>,
    pub(crate) views: ViewSlaves,
    epoch: Instant,
}

/// One process of the cluster that renders. The server creates, initializes
/// and drives entities on it by sending commands to
/// [`ObjectId::LOCAL_NODE`] and to the entities themselves.
///
/// Give it a [`Dispatcher::deferring`] dispatcher: commands for an entity
/// may arrive before the command creating it has been handled.
pub struct RenderNode<R: Renderer> {
    pub(crate) shared: Arc<NodeShared<R>>,
}

impl<R: Renderer> RenderNode<R> {
    pub fn new(
        node: NodeId,
        client_config: ClientConfig,
        dispatcher: Arc<Dispatcher>,
        sender: Arc<dyn CommandSender>,
        renderer: R,
    ) -> Result<Self, ClientError> {
        let shared = Arc::new(NodeShared {
            node,
            client_config,
            dispatcher,
            sender,
            renderer: Mutex::new(renderer),
            mirrors: Mutex::new(Mirrors::default()),
            swaps: SwapGate::default(),
            frames: Mutex::new(HashMap::new()),
            views: ViewSlaves::default(),
            epoch: Instant::now(),
        });
        register_node_handlers(&shared)?;
        info!("Render node {} ready", node);
        Ok(Self { shared })
    }

    pub fn node(&self) -> NodeId {
        self.shared.node
    }

    pub fn client_config(&self) -> &ClientConfig {
        &self.shared.client_config
    }

    pub fn entity(&self, id: ObjectId) -> Option<MirrorInfo> {
        self.shared.mirrors.lock().get(id).map(|mirror| mirror.info().clone())
    }

    pub fn entity_state(&self, id: ObjectId) -> Option<State> {
        self.shared
            .mirrors
            .lock()
            .get(id)
            .map(|mirror| mirror.lifecycle().state())
    }

    pub fn entity_count(&self) -> usize {
        self.shared.mirrors.lock().len()
    }

    /// Runs `f` on the renderer, between node thread calls
    pub fn with_renderer<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        f(&mut self.shared.renderer.lock())
    }

    /// Tells the server about the near and far planes a channel settled on
    pub fn set_near_far(&self, channel: ObjectId, near: f32, far: f32) -> Result<(), ClientError> {
        self.shared.running_channel(channel)?;
        self.shared
            .send_to_server(Command::new(channel, &ChannelSetNearFarPacket { near, far }))?;
        Ok(())
    }
}

impl<R: Renderer> Drop for RenderNode<R> {
    fn drop(&mut self) {
        // handlers hold the shared state; removing them breaks the cycle
        let ids = self.shared.mirrors.lock().ids();
        for id in ids {
            self.shared.dispatcher.deregister_object(id);
        }
        for view in self.shared.views.ids() {
            self.shared.dispatcher.deregister_object(view);
        }
        self.shared.dispatcher.deregister_object(ObjectId::LOCAL_NODE);
    }
}

fn register_node_handlers<R: Renderer>(shared: &Arc<NodeShared<R>>) -> Result<(), CommandError> {
    let create = shared.clone();
    shared.dispatcher.register(
        ObjectId::LOCAL_NODE,
        CommandCode::CreateEntity,
        QueueKind::NodeThread,
        move |command| {
            let packet = command.read::<CreateEntityPacket>()?;
            create
                .create_entity(packet)
                .map_err(|err| rejected(command, err))?;
            Ok(CommandResult::Handled)
        },
    )?;

    let destroy = shared.clone();
    shared.dispatcher.register(
        ObjectId::LOCAL_NODE,
        CommandCode::DestroyEntity,
        QueueKind::NodeThread,
        move |command| {
            let packet = command.read::<DestroyEntityPacket>()?;
            destroy
                .destroy_entity(packet.id)
                .map_err(|err| rejected(command, err))?;
            Ok(CommandResult::Handled)
        },
    )
}

impl<R: Renderer> NodeShared<R> {
    pub(crate) fn send_to_server(&self, command: Command) -> Result<(), CommandError> {
        self.sender.send(self.client_config.server, command)
    }

    fn reply<P: Packet>(&self, command: &Command, packet: &P) -> Result<(), CommandError> {
        self.send_to_server(command.reply(packet))
    }

    fn elapsed_ms(&self) -> f32 {
        self.epoch.elapsed().as_secs_f32() * 1000.0
    }

    // Entities

    fn create_entity(self: &Arc<Self>, packet: CreateEntityPacket) -> Result<(), ClientError> {
        let id = packet.id;
        let kind = packet.kind;
        self.mirrors.lock().insert(MirrorInfo {
            id,
            kind,
            parent: packet.parent,
            name: packet.name,
        })?;
        self.register_entity_handlers(id, kind)?;
        info!("{} mirrors {} {}", self.node, kind.name(), id);
        Ok(())
    }

    fn destroy_entity(&self, id: ObjectId) -> Result<(), ClientError> {
        let removed = {
            let mut mirrors = self.mirrors.lock();
            for removed in mirrors.subtree(id)? {
                if let Some(mirror) = mirrors.get(removed) {
                    if mirror.lifecycle().state() != State::Stopped {
                        warn!(
                            "Destroying {} while {}",
                            mirror.lifecycle().name(),
                            mirror.lifecycle().state()
                        );
                    }
                }
            }
            mirrors.remove(id)?
        };
        for id in removed {
            self.dispatcher.deregister_object(id);
            self.swaps.forget(id);
            self.frames.lock().retain(|(channel, _), _| *channel != id);
        }
        Ok(())
    }

    fn register_entity_handlers(
        self: &Arc<Self>,
        id: ObjectId,
        kind: EntityKind,
    ) -> Result<(), CommandError> {
        let shared = self.clone();
        self.dispatcher.register(
            id,
            CommandCode::ConfigInit,
            QueueKind::NodeThread,
            move |command| {
                let packet = command.read::<ConfigInitPacket>()?;
                let result = shared.config_init(command.target, packet.init_id);
                shared.reply(
                    command,
                    &ConfigInitReplyPacket {
                        success: result.is_ok(),
                        error: result.err().unwrap_or_default(),
                    },
                )?;
                Ok(CommandResult::Handled)
            },
        )?;

        let shared = self.clone();
        self.dispatcher.register(
            id,
            CommandCode::ConfigExit,
            QueueKind::NodeThread,
            move |command| {
                let result = shared.config_exit(command.target);
                shared.reply(
                    command,
                    &ConfigExitReplyPacket {
                        success: result.is_ok(),
                        error: result.err().unwrap_or_default(),
                    },
                )?;
                Ok(CommandResult::Handled)
            },
        )?;

        if kind == EntityKind::Channel {
            self.register_channel_handlers(id)?;
        }
        Ok(())
    }

    fn register_channel_handlers(self: &Arc<Self>, id: ObjectId) -> Result<(), CommandError> {
        let shared = self.clone();
        self.dispatcher.register(
            id,
            CommandCode::ChannelFrameDraw,
            QueueKind::NodeThread,
            move |command| {
                let packet = command.read::<ChannelFrameDrawPacket>()?;
                shared
                    .frame_draw(command.target, packet)
                    .map_err(|err| rejected(command, err))?;
                Ok(CommandResult::Handled)
            },
        )?;

        let shared = self.clone();
        self.dispatcher.register(
            id,
            CommandCode::ChannelFrameFinish,
            QueueKind::NodeThread,
            move |command| {
                let packet = command.read::<ChannelFrameFinishPacket>()?;
                let reply = shared
                    .frame_finish(command.target, packet)
                    .map_err(|err| rejected(command, err))?;
                shared.reply(command, &reply)?;
                Ok(CommandResult::Handled)
            },
        )?;

        // the node thread is blocked in the draw that waits for this
        let shared = self.clone();
        self.dispatcher.register(
            id,
            CommandCode::SwapBarrierRelease,
            QueueKind::CommandThread,
            move |command| {
                let packet = command.read::<SwapBarrierReleasePacket>()?;
                if packet.desynchronized {
                    warn!(
                        "{} released desynchronized from {} for frame {}",
                        command.target, packet.barrier, packet.frame_number
                    );
                }
                shared
                    .swaps
                    .release(command.target, packet.frame_number, packet.desynchronized);
                Ok(CommandResult::Handled)
            },
        )
    }

    // Lifecycle

    fn config_init(&self, id: ObjectId, init_id: u32) -> Result<(), String> {
        let (info, lifecycle) = {
            let mirrors = self.mirrors.lock();
            let Some(mirror) = mirrors.get(id) else {
                return Err(ClientError::UnknownEntity { id }.to_string());
            };
            if !mirrors.parent_running(id) {
                return Err(format!("parent of {} is not running", mirror.lifecycle().name()));
            }
            (mirror.info().clone(), mirror.lifecycle().clone())
        };

        if lifecycle.state() == State::StopFailed {
            lifecycle.ack().map_err(|err| err.to_string())?;
        }
        lifecycle.start_init().map_err(|err| err.to_string())?;
        let result = self.renderer.lock().config_init(&info, init_id);
        let error = match &result {
            Ok(()) => "",
            Err(reason) => reason.as_str(),
        };
        lifecycle
            .complete_init(result.is_ok(), error)
            .map_err(|err| err.to_string())?;
        result
    }

    fn config_exit(&self, id: ObjectId) -> Result<(), String> {
        let (info, lifecycle) = {
            let mirrors = self.mirrors.lock();
            let Some(mirror) = mirrors.get(id) else {
                return Err(ClientError::UnknownEntity { id }.to_string());
            };
            (mirror.info().clone(), mirror.lifecycle().clone())
        };

        lifecycle.start_exit().map_err(|err| err.to_string())?;
        let result = self.renderer.lock().config_exit(&info);
        let error = match &result {
            Ok(()) => "",
            Err(reason) => reason.as_str(),
        };
        lifecycle
            .complete_exit(result.is_ok(), error)
            .map_err(|err| err.to_string())?;
        result
    }

    // Frames

    fn running_channel(&self, id: ObjectId) -> Result<MirrorInfo, ClientError> {
        let mirrors = self.mirrors.lock();
        match mirrors.get(id) {
            Some(mirror)
                if mirror.info().kind == EntityKind::Channel
                    && mirror.lifecycle().is_running() =>
            {
                Ok(mirror.info().clone())
            }
            _ => Err(ClientError::NotARunningChannel { id }),
        }
    }

    /// Draws one context. The context that ends the channel's frame at a
    /// swap barrier enters the barrier and blocks until the server releases
    /// it, then swaps.
    fn frame_draw(
        &self,
        channel: ObjectId,
        packet: ChannelFrameDrawPacket,
    ) -> Result<(), ClientError> {
        let info = self.running_channel(channel)?;
        let frame_number = packet.context.frame_number;
        self.frames
            .lock()
            .entry((channel, frame_number))
            .or_insert_with(|| FrameRecord {
                start_time: self.elapsed_ms(),
                swapped: false,
            });

        self.renderer.lock().frame_draw(&info, &packet.context);

        let Some(barrier) = packet.swap_barrier else {
            return Ok(());
        };
        self.send_to_server(Command::new(
            packet.config,
            &SwapBarrierEnterPacket {
                barrier: barrier.clone(),
                frame_number,
                channel,
            },
        ))?;
        let desynchronized = match self.swaps.wait(
            channel,
            frame_number,
            self.client_config.swap_release_timeout,
        ) {
            Some(desynchronized) => desynchronized,
            None => {
                warn!(
                    "{} swaps frame {} without a release from {}",
                    info.name, frame_number, barrier
                );
                true
            }
        };

        if let Some(record) = self.frames.lock().get_mut(&(channel, frame_number)) {
            record.swapped = true;
        }
        self.renderer.lock().swap(&info, frame_number, desynchronized);
        Ok(())
    }

    /// Ends a channel's frame. A frame that drew but met no swap barrier
    /// swaps here.
    fn frame_finish(
        &self,
        channel: ObjectId,
        packet: ChannelFrameFinishPacket,
    ) -> Result<ChannelFrameFinishReplyPacket, ClientError> {
        let info = self.running_channel(channel)?;
        let record = self.frames.lock().remove(&(channel, packet.frame_number));

        let mut renderer = self.renderer.lock();
        renderer.frame_finish(&info, packet.frame_number);
        let start_time = match record {
            Some(record) => {
                if !record.swapped {
                    renderer.swap(&info, packet.frame_number, false);
                }
                record.start_time
            }
            None => self.elapsed_ms(),
        };

        Ok(ChannelFrameFinishReplyPacket {
            frame_number: packet.frame_number,
            start_time,
            end_time: self.elapsed_ms(),
        })
    }
}

fn rejected(command: &Command, err: ClientError) -> CommandError {
    match err {
        ClientError::Command(err) => err,
        err => CommandError::Rejected {
            code: command.code,
            target: command.target,
            reason: err.to_string(),
        },
    }
}
