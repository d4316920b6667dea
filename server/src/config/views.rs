use std::{collections::HashMap, sync::Arc};

use log::{debug, warn};
use parking_lot::Mutex;

use lockstep_shared::{
    packets::{ObjectDeltaPacket, ObjectMapPacket, ObjectMapReplyPacket, ObjectUnmapPacket},
    Command, CommandCode, CommandError, CommandResult, CommandSender, Dispatcher, InstanceId,
    NodeId, ObjectId, QueueKind, SharedMaster, View,
};

use crate::{config::Config, error::ConfigError, layout::Layout};

impl Config {
    pub fn add_layout(&mut self, name: &str) -> ObjectId {
        let id = self.ids.generate();
        self.layouts.push(Layout::new(id, name));
        id
    }

    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    pub fn layout(&self, id: ObjectId) -> Option<&Layout> {
        self.layouts.iter().find(|layout| layout.id() == id)
    }

    /// Adds a view to a layout and makes it mappable by render nodes.
    /// Returns the view's object id.
    pub fn add_view(&mut self, layout: ObjectId, view: View) -> Result<ObjectId, ConfigError> {
        let view_id = self.ids.generate();
        let Some(target) = self.layouts.iter_mut().find(|entry| entry.id() == layout) else {
            return Err(ConfigError::UnknownLayout {
                config: self.name.clone(),
                layout,
            });
        };
        let master = target.add_view(view_id, view);
        register_view_handlers(
            &self.dispatcher,
            view_id,
            master,
            self.sender.clone(),
            self.slave_nodes.clone(),
        )?;
        Ok(view_id)
    }

    pub fn view(&self, view_id: ObjectId) -> Option<SharedMaster<View>> {
        self.layouts.iter().find_map(|layout| layout.view(view_id))
    }

    /// Publishes pending view changes to every node mapping them
    pub fn commit_views(&mut self) -> Result<(), ConfigError> {
        for layout in &self.layouts {
            for view in layout.views() {
                let mut master = view.lock();
                master.commit()?;
                let slaves: Vec<InstanceId> = master.slaves().collect();
                for instance_id in slaves {
                    let deltas = master.take_outgoing(instance_id);
                    if deltas.is_empty() {
                        continue;
                    }
                    let Some(node) = self.slave_nodes.lock().get(&instance_id).copied() else {
                        warn!("No node known for {}", instance_id);
                        continue;
                    };
                    for delta in deltas {
                        let command =
                            Command::new(master.object_id(), &ObjectDeltaPacket { delta });
                        if let Err(err) = self.sender.send(node, command) {
                            warn!("Could not update {} on {}: {}", master.object_id(), node, err);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Detaches the slaves of nodes that are gone
    pub(crate) fn release_views(&mut self) {
        for layout in &self.layouts {
            for view in layout.views() {
                let mut master = view.lock();
                let slaves: Vec<InstanceId> = master.slaves().collect();
                for instance_id in slaves {
                    if let Err(err) = master.unmap_slave(instance_id) {
                        warn!("{}", err);
                    }
                }
            }
        }
    }
}

fn register_view_handlers(
    dispatcher: &Dispatcher,
    view_id: ObjectId,
    master: SharedMaster<View>,
    sender: Arc<dyn CommandSender>,
    slave_nodes: Arc<Mutex<HashMap<InstanceId, NodeId>>>,
) -> Result<(), CommandError> {
    let map_master = master.clone();
    dispatcher.register(
        view_id,
        CommandCode::ObjectMap,
        QueueKind::NodeThread,
        move |command| {
            let packet = command.read::<ObjectMapPacket>()?;
            let snapshot = match map_master.lock().map_slave(packet.instance_id) {
                Ok(snapshot) => {
                    slave_nodes.lock().insert(packet.instance_id, packet.node);
                    debug!("{} mapped by {}", command.target, packet.instance_id);
                    Some(snapshot)
                }
                Err(err) => {
                    warn!("{}", err);
                    None
                }
            };
            sender.send(packet.node, command.reply(&ObjectMapReplyPacket { snapshot }))?;
            Ok(CommandResult::Handled)
        },
    )?;

    dispatcher.register(
        view_id,
        CommandCode::ObjectUnmap,
        QueueKind::NodeThread,
        move |command| {
            let packet = command.read::<ObjectUnmapPacket>()?;
            if let Err(err) = master.lock().unmap_slave(packet.instance_id) {
                warn!("{}", err);
            }
            Ok(CommandResult::Handled)
        },
    )
}
