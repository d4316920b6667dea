use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use parking_lot::Mutex;

use lockstep_shared::{
    packets::{
        ChooseConfigReplyPacket, ConfigDescription, ObjectDeltaPacket, ObjectMapPacket,
        ObjectMapReplyPacket, ObjectUnmapPacket, ReleaseConfigReplyPacket, ShutdownReplyPacket,
        SwapBarrierEnterPacket, SwapBarrierReleasePacket,
    },
    Command, CommandCode, CommandError, CommandSender, Dispatcher, FrameNumber, NodeId,
    ObjectId, ObjectMaster, QueueKind, RenderContext, View,
};

use crate::{mirror::MirrorInfo, renderer::Renderer};

/// Plays the server for client tests: records what the client sends and
/// answers registry, map and barrier commands straight into the client's
/// dispatcher.
pub(crate) struct ScriptedServer {
    dispatcher: Arc<Dispatcher>,
    sent: Mutex<Vec<Command>>,
    views: Mutex<HashMap<ObjectId, ObjectMaster<View>>>,
    silent: AtomicBool,
    unreachable: AtomicBool,
    hold_barriers: AtomicBool,
}

impl ScriptedServer {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>) -> Arc<Self> {
        Arc::new(Self {
            dispatcher,
            sent: Mutex::new(Vec::new()),
            views: Mutex::new(HashMap::new()),
            silent: AtomicBool::new(false),
            unreachable: AtomicBool::new(false),
            hold_barriers: AtomicBool::new(false),
        })
    }

    pub(crate) fn silence(&self) {
        self.silent.store(true, Ordering::SeqCst);
    }

    pub(crate) fn disconnect(&self) {
        self.unreachable.store(true, Ordering::SeqCst);
    }

    /// Barrier entries are recorded but never released
    pub(crate) fn hold_barriers(&self) {
        self.hold_barriers.store(true, Ordering::SeqCst);
    }

    pub(crate) fn sent(&self) -> Vec<Command> {
        self.sent.lock().clone()
    }

    pub(crate) fn sent_code(&self, code: CommandCode) -> Vec<Command> {
        self.sent
            .lock()
            .iter()
            .filter(|command| command.code == code)
            .cloned()
            .collect()
    }

    pub(crate) fn add_view(&self, id: ObjectId, view: View) {
        self.views.lock().insert(id, ObjectMaster::new(id, view));
    }

    /// Changes a view, commits it and delivers the deltas to `node`'s
    /// dispatcher
    pub(crate) fn change_view(&self, id: ObjectId, node: NodeId, change: impl FnOnce(&mut View)) {
        let mut views = self.views.lock();
        let master = views.get_mut(&id).unwrap();
        change(master.state_mut());
        master.commit().unwrap();
        for delta in master.take_outgoing(node.into()) {
            self.dispatcher
                .dispatch(Command::new(id, &ObjectDeltaPacket { delta }))
                .unwrap();
        }
    }

    fn answer(&self, command: &Command) -> Option<Command> {
        match command.code {
            CommandCode::ChooseConfig => Some(command.reply(&ChooseConfigReplyPacket {
                config: Some(ConfigDescription {
                    id: ObjectId::new(16),
                    name: "wall".to_string(),
                }),
            })),
            CommandCode::ReleaseConfig => {
                Some(command.reply(&ReleaseConfigReplyPacket { released: true }))
            }
            CommandCode::Shutdown => Some(command.reply(&ShutdownReplyPacket { success: true })),
            CommandCode::ObjectMap => {
                let packet = command.read::<ObjectMapPacket>().ok()?;
                let snapshot = self
                    .views
                    .lock()
                    .get_mut(&command.target)
                    .and_then(|master| master.map_slave(packet.instance_id).ok());
                Some(command.reply(&ObjectMapReplyPacket { snapshot }))
            }
            CommandCode::ObjectUnmap => {
                let packet = command.read::<ObjectUnmapPacket>().ok()?;
                if let Some(master) = self.views.lock().get_mut(&command.target) {
                    let _ = master.unmap_slave(packet.instance_id);
                }
                None
            }
            CommandCode::SwapBarrierEnter if !self.hold_barriers.load(Ordering::SeqCst) => {
                let packet = command.read::<SwapBarrierEnterPacket>().ok()?;
                Some(Command::new(
                    packet.channel,
                    &SwapBarrierReleasePacket {
                        barrier: packet.barrier,
                        frame_number: packet.frame_number,
                        desynchronized: false,
                    },
                ))
            }
            _ => None,
        }
    }
}

impl CommandSender for ScriptedServer {
    fn send(&self, node: NodeId, command: Command) -> Result<(), CommandError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(CommandError::Transport {
                node,
                reason: "disconnected".to_string(),
            });
        }
        self.sent.lock().push(command.clone());
        if self.silent.load(Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(reply) = self.answer(&command) {
            let _ = self.dispatcher.dispatch(reply);
        }
        Ok(())
    }
}

/// Runs both queues of a dispatcher until dropped
pub(crate) struct Pump {
    stop: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl Pump {
    pub(crate) fn start(dispatcher: &Arc<Dispatcher>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let threads = [QueueKind::NodeThread, QueueKind::CommandThread]
            .into_iter()
            .map(|kind| {
                let dispatcher = dispatcher.clone();
                let stop = stop.clone();
                thread::spawn(move || dispatcher.run(kind, &stop))
            })
            .collect();
        Self { stop, threads }
    }
}

impl Drop for Pump {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Init(String),
    Exit(String),
    Draw(String, RenderContext),
    Finish(String, FrameNumber),
    Swap(String, FrameNumber, bool),
}

/// Records every call; fails the init of entities named in `fail_init`
#[derive(Default)]
pub(crate) struct RecordingRenderer {
    pub(crate) calls: Arc<Mutex<Vec<Call>>>,
    pub(crate) fail_init: Vec<String>,
}

impl Renderer for RecordingRenderer {
    fn config_init(&mut self, entity: &MirrorInfo, _init_id: u32) -> Result<(), String> {
        self.calls.lock().push(Call::Init(entity.name.clone()));
        if self.fail_init.contains(&entity.name) {
            return Err(format!("{} has no display", entity.name));
        }
        Ok(())
    }

    fn config_exit(&mut self, entity: &MirrorInfo) -> Result<(), String> {
        self.calls.lock().push(Call::Exit(entity.name.clone()));
        Ok(())
    }

    fn frame_draw(&mut self, channel: &MirrorInfo, context: &RenderContext) {
        self.calls
            .lock()
            .push(Call::Draw(channel.name.clone(), context.clone()));
    }

    fn frame_finish(&mut self, channel: &MirrorInfo, frame_number: FrameNumber) {
        self.calls
            .lock()
            .push(Call::Finish(channel.name.clone(), frame_number));
    }

    fn swap(&mut self, channel: &MirrorInfo, frame_number: FrameNumber, desynchronized: bool) {
        self.calls
            .lock()
            .push(Call::Swap(channel.name.clone(), frame_number, desynchronized));
    }
}

/// Polls `probe` until it yields, for effects of the pump threads
pub(crate) fn eventually<T>(mut probe: impl FnMut() -> Option<T>) -> T {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        if let Some(value) = probe() {
            return value;
        }
        assert!(std::time::Instant::now() < deadline, "condition not reached in time");
        thread::sleep(std::time::Duration::from_millis(2));
    }
}
