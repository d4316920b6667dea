use std::{collections::HashMap, sync::Arc};

use log::{info, warn};
use parking_lot::Mutex;

use lockstep_shared::{
    fulfil_reply,
    packets::{ObjectDeltaPacket, ObjectMapPacket, ObjectMapReplyPacket, ObjectUnmapPacket},
    Command, CommandCode, CommandError, CommandResult, InstanceId, ObjectDelta, ObjectId,
    ObjectSlave, QueueKind, ReplicationError, RequestHandler, SlaveInbox, Version, View,
};

use crate::{
    error::ClientError,
    render_node::{NodeShared, RenderNode},
    renderer::Renderer,
};

/// The views a render node mirrors
pub(crate) struct ViewSlaves {
    inboxes: Arc<Mutex<HashMap<ObjectId, Arc<SlaveInbox>>>>,
    slaves: Mutex<HashMap<ObjectId, ObjectSlave<View>>>,
    map_replies: Arc<RequestHandler<ObjectMapReplyPacket>>,
}

impl Default for ViewSlaves {
    fn default() -> Self {
        Self {
            inboxes: Arc::new(Mutex::new(HashMap::new())),
            slaves: Mutex::new(HashMap::new()),
            map_replies: Arc::new(RequestHandler::new()),
        }
    }
}

impl ViewSlaves {
    pub(crate) fn ids(&self) -> Vec<ObjectId> {
        self.slaves.lock().keys().copied().collect()
    }
}

impl<R: Renderer> RenderNode<R> {
    fn instance_id(&self) -> InstanceId {
        InstanceId::from(self.shared.node)
    }

    /// Maps a slave of a view the server masters. Returns the version the
    /// slave starts at.
    pub fn map_view(&self, view: ObjectId) -> Result<Version, ClientError> {
        let shared = &self.shared;
        if shared.views.slaves.lock().contains_key(&view) {
            return Err(ReplicationError::SlaveAlreadyMapped {
                object_id: view,
                instance_id: self.instance_id(),
            }
            .into());
        }

        register_view_handlers(shared, view)?;
        let slave = self.request_snapshot(view).and_then(|snapshot| {
            Ok(ObjectSlave::from_snapshot(
                self.instance_id(),
                View::new(""),
                &snapshot,
                &shared.client_config.protocol,
            )?)
        });
        let slave = match slave {
            Ok(slave) => slave,
            Err(err) => {
                shared.dispatcher.deregister_object(view);
                return Err(err);
            }
        };

        let version = slave.version();
        shared.views.inboxes.lock().insert(view, slave.inbox());
        shared.views.slaves.lock().insert(view, slave);
        Ok(version)
    }

    /// Replaces a slave that lost deltas with a fresh snapshot
    pub fn remap_view(&self, view: ObjectId) -> Result<Version, ClientError> {
        if !self.shared.views.slaves.lock().contains_key(&view) {
            return Err(ClientError::ViewNotMapped { view });
        }
        self.send_unmap(view)?;
        let snapshot = self.request_snapshot(view)?;

        let mut slaves = self.shared.views.slaves.lock();
        let slave = slaves
            .get_mut(&view)
            .ok_or(ClientError::ViewNotMapped { view })?;
        let version = slave.apply_snapshot(&snapshot)?;
        info!("{} remapped {} at {}", self.shared.node, view, version);
        Ok(version)
    }

    pub fn unmap_view(&self, view: ObjectId) -> Result<(), ClientError> {
        if self.shared.views.slaves.lock().remove(&view).is_none() {
            return Err(ClientError::ViewNotMapped { view });
        }
        self.shared.views.inboxes.lock().remove(&view);
        self.shared.dispatcher.deregister_object(view);
        self.send_unmap(view)
    }

    /// Blocks until the view reached `version`, applying buffered deltas in
    /// order
    pub fn sync_view(&self, view: ObjectId, version: Version) -> Result<Version, ClientError> {
        let mut slaves = self.shared.views.slaves.lock();
        let slave = slaves
            .get_mut(&view)
            .ok_or(ClientError::ViewNotMapped { view })?;
        Ok(slave.sync(version, self.shared.client_config.view_sync_timeout)?)
    }

    /// Applies whatever arrived without waiting
    pub fn sync_view_latest(&self, view: ObjectId) -> Result<Version, ClientError> {
        let mut slaves = self.shared.views.slaves.lock();
        let slave = slaves
            .get_mut(&view)
            .ok_or(ClientError::ViewNotMapped { view })?;
        Ok(slave.sync_latest()?)
    }

    pub fn view(&self, view: ObjectId) -> Option<View> {
        self.shared
            .views
            .slaves
            .lock()
            .get(&view)
            .map(|slave| slave.state().clone())
    }

    pub fn view_version(&self, view: ObjectId) -> Option<Version> {
        self.shared
            .views
            .slaves
            .lock()
            .get(&view)
            .map(|slave| slave.version())
    }

    pub fn view_needs_resync(&self, view: ObjectId) -> bool {
        self.shared
            .views
            .slaves
            .lock()
            .get(&view)
            .is_some_and(|slave| slave.needs_resync())
    }

    fn request_snapshot(&self, view: ObjectId) -> Result<ObjectDelta, ClientError> {
        let shared = &self.shared;
        let replies = &shared.views.map_replies;
        let request = replies.register();
        let command = Command::request(
            view,
            &ObjectMapPacket {
                instance_id: self.instance_id(),
                node: shared.node,
            },
            request.id(),
        );
        if let Err(err) = shared.send_to_server(command) {
            replies.abandon(request.id());
            return Err(err.into());
        }
        let reply = replies.wait(request.id(), shared.client_config.protocol.request_timeout)?;
        reply.snapshot.ok_or(ClientError::MapRefused { view })
    }

    fn send_unmap(&self, view: ObjectId) -> Result<(), ClientError> {
        let command = Command::new(
            view,
            &ObjectUnmapPacket {
                instance_id: self.instance_id(),
            },
        );
        Ok(self.shared.send_to_server(command)?)
    }
}

fn register_view_handlers<R: Renderer>(
    shared: &Arc<NodeShared<R>>,
    view: ObjectId,
) -> Result<(), CommandError> {
    let replies = shared.views.map_replies.clone();
    shared.dispatcher.register(
        view,
        CommandCode::ObjectMapReply,
        QueueKind::CommandThread,
        move |command| fulfil_reply(&replies, command),
    )?;

    let inboxes = shared.views.inboxes.clone();
    shared.dispatcher.register(
        view,
        CommandCode::ObjectDelta,
        QueueKind::CommandThread,
        move |command| {
            let packet = command.read::<ObjectDeltaPacket>()?;
            let Some(inbox) = inboxes.lock().get(&command.target).cloned() else {
                // overtook the map reply
                return Ok(CommandResult::Redispatch);
            };
            if let Err(err @ ReplicationError::GapOverflow { .. }) = inbox.receive(packet.delta) {
                warn!("{}", err);
            }
            Ok(CommandResult::Handled)
        },
    )
}

#[cfg(test)]
mod tests {
    use lockstep_shared::{Dispatcher, NodeId};

    use super::*;
    use crate::{
        client_config::ClientConfig,
        test_support::{Pump, RecordingRenderer, ScriptedServer},
    };

    const VIEW: ObjectId = ObjectId::new(40);

    fn node() -> (RenderNode<RecordingRenderer>, Arc<ScriptedServer>, Pump) {
        let dispatcher = Arc::new(Dispatcher::deferring());
        let pump = Pump::start(&dispatcher);
        let server = ScriptedServer::new(dispatcher.clone());
        let node = RenderNode::new(
            NodeId::new(2),
            ClientConfig::default(),
            dispatcher,
            server.clone(),
            RecordingRenderer::default(),
        )
        .unwrap();
        (node, server, pump)
    }

    #[test]
    fn mapped_view_follows_master_commits() {
        let (node, server, _pump) = node();
        let mut center = View::new("center");
        center.set_near_far(0.1, 100.0);
        server.add_view(VIEW, center);

        assert_eq!(node.map_view(VIEW).unwrap(), Version::FIRST);
        assert_eq!(node.view(VIEW).unwrap().name(), "center");

        server.change_view(VIEW, NodeId::new(2), |view| view.set_near_far(0.5, 50.0));
        server.change_view(VIEW, NodeId::new(2), |view| view.set_name("left"));

        let target = Version::FIRST.next().next();
        assert_eq!(node.sync_view(VIEW, target).unwrap(), target);
        let view = node.view(VIEW).unwrap();
        let mut expected = View::new("left");
        expected.set_near_far(0.5, 50.0);
        assert_eq!(view.name(), "left");
        assert_eq!(view.frustum(), expected.frustum());
    }

    #[test]
    fn second_map_is_refused_locally() {
        let (node, server, _pump) = node();
        server.add_view(VIEW, View::new("center"));
        node.map_view(VIEW).unwrap();

        assert!(matches!(
            node.map_view(VIEW),
            Err(ClientError::Replication(ReplicationError::SlaveAlreadyMapped { .. }))
        ));
    }

    #[test]
    fn unknown_view_is_refused_and_forgotten() {
        let (node, _server, _pump) = node();

        assert_eq!(
            node.map_view(VIEW),
            Err(ClientError::MapRefused { view: VIEW })
        );
        assert!(!node
            .shared
            .dispatcher
            .is_registered(VIEW, CommandCode::ObjectDelta));
    }

    #[test]
    fn remap_restores_a_slave() {
        let (node, server, _pump) = node();
        server.add_view(VIEW, View::new("center"));
        node.map_view(VIEW).unwrap();
        server.change_view(VIEW, NodeId::new(2), |view| view.set_name("left"));

        let version = node.remap_view(VIEW).unwrap();

        assert_eq!(version, Version::FIRST.next());
        assert_eq!(node.view(VIEW).unwrap().name(), "left");
        assert!(!node.view_needs_resync(VIEW));

        node.unmap_view(VIEW).unwrap();
        assert_eq!(node.view(VIEW), None);
        assert_eq!(
            node.sync_view_latest(VIEW),
            Err(ClientError::ViewNotMapped { view: VIEW })
        );
    }
}
