use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

use crate::{
    command::{Command, CommandCode, CommandError, CommandQueue, QueueKind},
    types::ObjectId,
};

/// Outcome of a handler
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandResult {
    Handled,
    /// A prerequisite is missing; put the command back at the end of its
    /// queue and try again later
    Redispatch,
}

pub type CommandHandler =
    Box<dyn FnMut(&Command) -> Result<CommandResult, CommandError> + Send + 'static>;

struct Route {
    queue: QueueKind,
    handler: Arc<Mutex<CommandHandler>>,
}

/// Routes incoming commands to the queue of the thread that handles them
/// and runs their handlers there.
///
/// Commands on one queue are handled in arrival order. There is no ordering
/// between the two queues. Handlers may register further handlers.
pub struct Dispatcher {
    routes: RwLock<HashMap<(ObjectId, CommandCode), Route>>,
    node_queue: CommandQueue,
    command_queue: CommandQueue,
    defer_unrouted: bool,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            node_queue: CommandQueue::new(),
            command_queue: CommandQueue::new(),
            defer_unrouted: false,
        }
    }

    /// A dispatcher whose handlers are installed by earlier commands, as on
    /// a render node where creating an entity registers its handlers.
    /// Commands without a handler are queued on the node thread and routed
    /// when their turn comes, after the commands that arrived before them.
    pub fn deferring() -> Self {
        Self {
            defer_unrouted: true,
            ..Self::new()
        }
    }

    pub fn register<F>(
        &self,
        target: ObjectId,
        code: CommandCode,
        queue: QueueKind,
        handler: F,
    ) -> Result<(), CommandError>
    where
        F: FnMut(&Command) -> Result<CommandResult, CommandError> + Send + 'static,
    {
        let mut routes = self.routes.write();
        if routes.contains_key(&(target, code)) {
            return Err(CommandError::HandlerAlreadyRegistered { code, target });
        }
        let handler: CommandHandler = Box::new(handler);
        routes.insert(
            (target, code),
            Route {
                queue,
                handler: Arc::new(Mutex::new(handler)),
            },
        );
        Ok(())
    }

    pub fn deregister(&self, target: ObjectId, code: CommandCode) -> bool {
        self.routes.write().remove(&(target, code)).is_some()
    }

    /// Drops every handler of one object. Returns how many were removed.
    pub fn deregister_object(&self, target: ObjectId) -> usize {
        let mut routes = self.routes.write();
        let before = routes.len();
        routes.retain(|(route_target, _), _| *route_target != target);
        before - routes.len()
    }

    pub fn is_registered(&self, target: ObjectId, code: CommandCode) -> bool {
        self.routes.read().contains_key(&(target, code))
    }

    pub fn queue(&self, kind: QueueKind) -> &CommandQueue {
        match kind {
            QueueKind::NodeThread => &self.node_queue,
            QueueKind::CommandThread => &self.command_queue,
        }
    }

    /// Queues an incoming command for its handler's thread. Commands nobody
    /// handles are protocol errors and are dropped.
    pub fn dispatch(&self, command: Command) -> Result<(), CommandError> {
        let Some(queue) = self
            .routes
            .read()
            .get(&(command.target, command.code))
            .map(|route| route.queue)
        else {
            if self.defer_unrouted {
                self.node_queue.push(command);
                return Ok(());
            }
            warn!(
                "Dropping {} for {}: no handler registered",
                command.code, command.target
            );
            return Err(CommandError::UnknownCommand {
                code: command.code,
                target: command.target,
            });
        };
        self.queue(queue).push(command);
        Ok(())
    }

    /// Handles every command queued at the time of the call. Redispatched
    /// commands are requeued and left for a later call. Returns how many
    /// commands were taken off the queue.
    pub fn process_pending(&self, kind: QueueKind) -> usize {
        let count = self.queue(kind).len();
        let mut processed = 0;
        for _ in 0..count {
            let Some(command) = self.queue(kind).try_pop() else {
                break;
            };
            self.invoke(kind, command);
            processed += 1;
        }
        processed
    }

    /// Waits up to `timeout` for one command and handles it. Returns false
    /// if none arrived.
    pub fn process_next(&self, kind: QueueKind, timeout: Duration) -> bool {
        let Some(command) = self.queue(kind).pop_timeout(timeout) else {
            return false;
        };
        if self.invoke(kind, command) == CommandResult::Redispatch {
            // give the missing prerequisite a chance to arrive
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Runs a queue's thread loop until `stop` is raised
    pub fn run(&self, kind: QueueKind, stop: &AtomicBool) {
        info!("{:?} queue running", kind);
        while !stop.load(Ordering::SeqCst) {
            self.process_next(kind, Duration::from_millis(5));
        }
        info!("{:?} queue stopped", kind);
    }

    fn invoke(&self, kind: QueueKind, command: Command) -> CommandResult {
        let route = self
            .routes
            .read()
            .get(&(command.target, command.code))
            .map(|route| (route.queue, route.handler.clone()));
        let Some((queue, handler)) = route else {
            warn!(
                "Dropping {} for {}: no handler registered",
                command.code, command.target
            );
            return CommandResult::Handled;
        };
        if queue != kind {
            // deferred before its handler existed
            self.queue(queue).push(command);
            return CommandResult::Handled;
        }

        let result = {
            let mut guard = handler.lock();
            let handler = &mut *guard;
            handler(&command)
        };
        match result {
            Ok(CommandResult::Handled) => CommandResult::Handled,
            Ok(CommandResult::Redispatch) => {
                debug!("Redispatching {} for {}", command.code, command.target);
                self.queue(kind).push(command);
                CommandResult::Redispatch
            }
            Err(err) => {
                warn!("{} for {} failed: {}", command.code, command.target, err);
                CommandResult::Handled
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
