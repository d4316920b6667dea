use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use parking_lot::Mutex;

use lockstep_shared::{
    packets::{
        ChannelFrameFinishPacket, ChannelFrameFinishReplyPacket, ConfigExitReplyPacket,
        ConfigInitReplyPacket,
    },
    Command, CommandCode, CommandError, CommandSender, Dispatcher, NodeId, ObjectId, QueueKind,
};

/// Plays every render node of a test: records what the server sends and
/// answers lifecycle and frame-finish requests straight into the server's
/// dispatcher.
pub(crate) struct ScriptedNodes {
    dispatcher: Arc<Dispatcher>,
    sent: Mutex<Vec<(NodeId, Command)>>,
    failing: Mutex<HashSet<ObjectId>>,
    silent: Mutex<HashSet<ObjectId>>,
    unreachable: Mutex<HashSet<NodeId>>,
}

impl ScriptedNodes {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>) -> Arc<Self> {
        Arc::new(Self {
            dispatcher,
            sent: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            silent: Mutex::new(HashSet::new()),
            unreachable: Mutex::new(HashSet::new()),
        })
    }

    /// The entity answers its init with a failure
    pub(crate) fn fail_init(&self, id: ObjectId) {
        self.failing.lock().insert(id);
    }

    /// The entity never answers
    pub(crate) fn silence(&self, id: ObjectId) {
        self.silent.lock().insert(id);
    }

    pub(crate) fn disconnect(&self, node: NodeId) {
        self.unreachable.lock().insert(node);
    }

    pub(crate) fn sent(&self, code: CommandCode) -> Vec<(NodeId, Command)> {
        self.sent
            .lock()
            .iter()
            .filter(|(_, command)| command.code == code)
            .cloned()
            .collect()
    }

    pub(crate) fn clear(&self) {
        self.sent.lock().clear();
    }

    fn answer(&self, command: &Command) -> Option<Command> {
        if self.silent.lock().contains(&command.target) {
            return None;
        }
        match command.code {
            CommandCode::ConfigInit => {
                let success = !self.failing.lock().contains(&command.target);
                Some(command.reply(&ConfigInitReplyPacket {
                    success,
                    error: if success {
                        String::new()
                    } else {
                        "no display".to_string()
                    },
                }))
            }
            CommandCode::ConfigExit => Some(command.reply(&ConfigExitReplyPacket {
                success: true,
                error: String::new(),
            })),
            CommandCode::ChannelFrameFinish => {
                let packet = command.read::<ChannelFrameFinishPacket>().ok()?;
                Some(command.reply(&ChannelFrameFinishReplyPacket {
                    frame_number: packet.frame_number,
                    start_time: 0.0,
                    end_time: 1.0,
                }))
            }
            _ => None,
        }
    }
}

impl CommandSender for ScriptedNodes {
    fn send(&self, node: NodeId, command: Command) -> Result<(), CommandError> {
        if self.unreachable.lock().contains(&node) {
            return Err(CommandError::Transport {
                node,
                reason: "disconnected".to_string(),
            });
        }
        self.sent.lock().push((node, command.clone()));
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

/// A config with one node per entry, each holding one pipe, one window and
/// one channel, wired to scripted nodes
pub(crate) struct TestConfig {
    pub(crate) config: crate::Config,
    pub(crate) nodes: Arc<ScriptedNodes>,
    pub(crate) channels: Vec<crate::ChannelPath>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    _pump: Pump,
}

impl TestConfig {
    pub(crate) fn new(server_config: crate::ServerConfig, node_count: u32) -> Self {
        let dispatcher = Arc::new(Dispatcher::new());
        let nodes = ScriptedNodes::new(dispatcher.clone());
        let pump = Pump::start(&dispatcher);
        let mut config = crate::Config::new(
            "wall",
            server_config,
            dispatcher.clone(),
            nodes.clone(),
            Arc::new(lockstep_shared::ObjectIdGenerator::new()),
        )
        .unwrap();

        let mut channels = Vec::new();
        for index in 0..node_count {
            let node = config
                .add_node(&format!("node-{}", index), NodeId::new(index + 2))
                .unwrap();
            let pipe = config.add_pipe(node, &format!("pipe-{}", index)).unwrap();
            let window = config
                .add_window(
                    pipe,
                    &format!("window-{}", index),
                    lockstep_shared::PixelViewport::new(0, 0, 1280, 720),
                )
                .unwrap();
            channels.push(
                config
                    .add_channel(
                        window,
                        &format!("channel-{}", index),
                        lockstep_shared::Viewport::FULL,
                    )
                    .unwrap(),
            );
        }

        Self {
            config,
            nodes,
            channels,
            dispatcher,
            _pump: pump,
        }
    }

    pub(crate) fn channel_id(&self, index: usize) -> ObjectId {
        self.config.channel(self.channels[index]).unwrap().id()
    }
}

/// Polls `probe` until it yields, for effects of the pump threads
pub(crate) fn eventually<T>(mut probe: impl FnMut() -> Option<T>) -> T {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        if let Some(value) = probe() {
            return value;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        thread::sleep(std::time::Duration::from_millis(1));
    }
}
