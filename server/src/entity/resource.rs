use std::{sync::Arc, time::Duration};

use log::warn;

use lockstep_shared::{
    packets::{
        ConfigExitPacket, ConfigExitReplyPacket, ConfigInitPacket, ConfigInitReplyPacket,
        CreateEntityPacket, DestroyEntityPacket,
    },
    Command, CommandCode, CommandError, CommandResult, CommandSender, Dispatcher,
    EntityKind, EntityLifecycle, Monitor, NodeId, ObjectId, QueueKind, RequestHandler, RequestId,
    State, StateError, TaskMask,
};

/// Where an entity's commands go: the render node hosting it
#[derive(Clone)]
pub struct NodeLink {
    node: NodeId,
    sender: Arc<dyn CommandSender>,
}

impl NodeLink {
    pub fn new(node: NodeId, sender: Arc<dyn CommandSender>) -> Self {
        Self { node, sender }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn send(&self, command: Command) -> Result<(), CommandError> {
        self.sender.send(self.node, command)
    }
}

/// What nodes, pipes, windows and channels have in common: identity, the
/// link to their render node, their lifecycle and the requests of the
/// lifecycle operation in flight.
pub struct ResourceCore {
    id: ObjectId,
    name: String,
    kind: EntityKind,
    link: NodeLink,
    lifecycle: EntityLifecycle,
    tasks: TaskMask,
    active: Monitor<u32>,
    init_replies: Arc<RequestHandler<ConfigInitReplyPacket>>,
    exit_replies: Arc<RequestHandler<ConfigExitReplyPacket>>,
    init_request: Option<RequestId>,
    exit_request: Option<RequestId>,
}

impl ResourceCore {
    pub(crate) fn new(id: ObjectId, name: &str, kind: EntityKind, link: NodeLink) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind,
            link,
            lifecycle: EntityLifecycle::new(&format!("{} {}", kind.name(), name)),
            tasks: TaskMask::NONE,
            active: Monitor::new(1),
            init_replies: Arc::new(RequestHandler::new()),
            exit_replies: Arc::new(RequestHandler::new()),
            init_request: None,
            exit_request: None,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn link(&self) -> &NodeLink {
        &self.link
    }

    pub fn lifecycle(&self) -> &EntityLifecycle {
        &self.lifecycle
    }

    pub fn state(&self) -> State {
        self.lifecycle.state()
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Union of the tasks of every compound using this entity or one of its
    /// children
    pub fn tasks(&self) -> TaskMask {
        self.tasks
    }

    pub(crate) fn add_tasks(&mut self, tasks: TaskMask) {
        self.tasks |= tasks;
    }

    pub fn is_active(&self) -> bool {
        self.active.get() > 0
    }

    pub fn activate(&self) {
        self.active.increment();
    }

    pub fn deactivate(&self) {
        if self.active.get() == 0 {
            warn!("{} is already inactive", self.lifecycle.name());
            return;
        }
        self.active.decrement();
    }

    /// Installs the handlers of the lifecycle replies
    pub(crate) fn register_handlers(&self, dispatcher: &Dispatcher) -> Result<(), CommandError> {
        let replies = self.init_replies.clone();
        let lifecycle = self.lifecycle.clone();
        dispatcher.register(
            self.id,
            CommandCode::ConfigInitReply,
            QueueKind::NodeThread,
            move |command| {
                let id = command.require_request_id()?;
                let reply = command.read::<ConfigInitReplyPacket>()?;
                if replies.fulfil(id, reply.clone()).is_err() {
                    return Ok(CommandResult::Handled);
                }
                lifecycle
                    .complete_init(reply.success, &reply.error)
                    .map_err(|err| rejected(command, err))?;
                Ok(CommandResult::Handled)
            },
        )?;

        let replies = self.exit_replies.clone();
        let lifecycle = self.lifecycle.clone();
        dispatcher.register(
            self.id,
            CommandCode::ConfigExitReply,
            QueueKind::NodeThread,
            move |command| {
                let id = command.require_request_id()?;
                let reply = command.read::<ConfigExitReplyPacket>()?;
                if replies.fulfil(id, reply.clone()).is_err() {
                    return Ok(CommandResult::Handled);
                }
                lifecycle
                    .complete_exit(reply.success, &reply.error)
                    .map_err(|err| rejected(command, err))?;
                Ok(CommandResult::Handled)
            },
        )
    }

    /// Asks the node to build its mirror of this entity
    pub(crate) fn send_create(&self, parent: Option<ObjectId>) -> Result<(), CommandError> {
        self.link.send(Command::new(
            ObjectId::LOCAL_NODE,
            &CreateEntityPacket {
                kind: self.kind,
                id: self.id,
                parent,
                name: self.name.clone(),
            },
        ))
    }

    pub(crate) fn send_destroy(&self) -> Result<(), CommandError> {
        self.link.send(Command::new(
            ObjectId::LOCAL_NODE,
            &DestroyEntityPacket { id: self.id },
        ))
    }

    // Init

    /// Sends the init request. A transport failure fails the init right
    /// away so the following sync reports it.
    pub(crate) fn start_config_init(&mut self, init_id: u32) -> Result<(), StateError> {
        self.lifecycle.start_init()?;
        let request = self.init_replies.register();
        self.init_request = Some(request.id());
        let command = Command::request(self.id, &ConfigInitPacket { init_id }, request.id());
        if let Err(err) = self.link.send(command) {
            self.init_replies.abandon(request.id());
            self.init_request = None;
            self.lifecycle.complete_init(false, &err.to_string())?;
        }
        Ok(())
    }

    pub(crate) fn sync_config_init(&mut self, timeout: Duration) -> Result<bool, StateError> {
        let result = self.lifecycle.sync_init(timeout);
        if let Some(id) = self.init_request.take() {
            self.init_replies.abandon(id);
        }
        result
    }

    // Exit

    pub(crate) fn start_config_exit(&mut self) -> Result<(), StateError> {
        self.lifecycle.start_exit()?;
        let request = self.exit_replies.register();
        self.exit_request = Some(request.id());
        let command = Command::request(self.id, &ConfigExitPacket {}, request.id());
        if let Err(err) = self.link.send(command) {
            self.exit_replies.abandon(request.id());
            self.exit_request = None;
            self.lifecycle.complete_exit(false, &err.to_string())?;
        }
        Ok(())
    }

    pub(crate) fn sync_config_exit(&mut self, timeout: Duration) -> Result<bool, StateError> {
        let result = self.lifecycle.sync_exit(timeout);
        if let Some(id) = self.exit_request.take() {
            self.exit_replies.abandon(id);
        }
        result
    }
}

fn rejected(command: &Command, err: StateError) -> CommandError {
    CommandError::Rejected {
        code: command.code,
        target: command.target,
        reason: err.to_string(),
    }
}
