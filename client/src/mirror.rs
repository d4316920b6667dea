use std::collections::HashMap;

use lockstep_shared::{EntityKind, EntityLifecycle, ObjectId, State};

use crate::error::ClientError;

/// What a render node knows about an entity it hosts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorInfo {
    pub id: ObjectId,
    pub kind: EntityKind,
    pub parent: Option<ObjectId>,
    pub name: String,
}

pub(crate) struct Mirror {
    info: MirrorInfo,
    lifecycle: EntityLifecycle,
}

impl Mirror {
    pub(crate) fn info(&self) -> &MirrorInfo {
        &self.info
    }

    pub(crate) fn lifecycle(&self) -> &EntityLifecycle {
        &self.lifecycle
    }
}

/// The entity tree a render node hosts, keyed by object id
#[derive(Default)]
pub(crate) struct Mirrors {
    entries: HashMap<ObjectId, Mirror>,
}

impl Mirrors {
    pub(crate) fn get(&self, id: ObjectId) -> Option<&Mirror> {
        self.entries.get(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Adds an entity below its parent. A node's parent is its config,
    /// which is not mirrored; every other kind lives under the kind one
    /// level up.
    pub(crate) fn insert(&mut self, info: MirrorInfo) -> Result<(), ClientError> {
        if self.entries.contains_key(&info.id) {
            return Err(ClientError::DuplicateEntity { id: info.id });
        }
        let expected_parent = match info.kind {
            EntityKind::Node => None,
            EntityKind::Pipe => Some(EntityKind::Node),
            EntityKind::Window => Some(EntityKind::Pipe),
            EntityKind::Channel => Some(EntityKind::Window),
        };
        if let Some(expected) = expected_parent {
            let parent_kind = info
                .parent
                .and_then(|parent| self.entries.get(&parent))
                .map(|parent| parent.info.kind);
            if parent_kind != Some(expected) {
                return Err(ClientError::InvalidParent {
                    id: info.id,
                    kind: info.kind,
                    parent: info.parent,
                });
            }
        }

        let lifecycle = EntityLifecycle::new(&format!("{} {}", info.kind.name(), info.name));
        self.entries.insert(info.id, Mirror { info, lifecycle });
        Ok(())
    }

    pub(crate) fn ids(&self) -> Vec<ObjectId> {
        self.entries.keys().copied().collect()
    }

    /// An entity and everything below it, children first
    pub(crate) fn subtree(&self, id: ObjectId) -> Result<Vec<ObjectId>, ClientError> {
        if !self.entries.contains_key(&id) {
            return Err(ClientError::UnknownEntity { id });
        }
        let mut ids = Vec::new();
        self.collect_subtree(id, &mut ids);
        Ok(ids)
    }

    /// Removes an entity together with everything below it. Returns the
    /// removed ids, children first.
    pub(crate) fn remove(&mut self, id: ObjectId) -> Result<Vec<ObjectId>, ClientError> {
        let removed = self.subtree(id)?;
        for id in &removed {
            self.entries.remove(id);
        }
        Ok(removed)
    }

    fn collect_subtree(&self, id: ObjectId, out: &mut Vec<ObjectId>) {
        let children: Vec<ObjectId> = self
            .entries
            .values()
            .filter(|mirror| mirror.info.parent == Some(id))
            .map(|mirror| mirror.info.id)
            .collect();
        for child in children {
            self.collect_subtree(child, out);
        }
        out.push(id);
    }

    /// An entity may only initialize once its parent is running
    pub(crate) fn parent_running(&self, id: ObjectId) -> bool {
        let Some(mirror) = self.entries.get(&id) else {
            return false;
        };
        if mirror.info.kind == EntityKind::Node {
            return true;
        }
        mirror
            .info
            .parent
            .and_then(|parent| self.entries.get(&parent))
            .is_some_and(|parent| parent.lifecycle.state() == State::Running)
    }
}
