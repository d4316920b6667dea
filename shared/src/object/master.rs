use std::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
    thread,
};

use log::{error, info};
use parking_lot::Mutex;

use crate::{
    object::{ChangeType, DirtyBits, ObjectDelta, ReplicationError, Replicate},
    types::{InstanceId, ObjectId, Version},
};

/// A master shared between the thread that mutates it and the command
/// handlers that map and unmap slaves
pub type SharedMaster<T> = Arc<Mutex<ObjectMaster<T>>>;

/// The authoritative copy of a replicated object.
///
/// Mutate the state through `state_mut`, then `commit` to turn the dirty
/// field groups into a new version queued for every mapped slave.
pub struct ObjectMaster<T: Replicate> {
    object_id: ObjectId,
    state: T,
    version: Version,
    transmitted: bool,
    outboxes: BTreeMap<InstanceId, VecDeque<ObjectDelta>>,
}

impl<T: Replicate> ObjectMaster<T> {
    pub fn new(object_id: ObjectId, mut state: T) -> Self {
        state.clear_dirty();
        Self {
            object_id,
            state,
            version: Version::FIRST,
            transmitted: false,
            outboxes: BTreeMap::new(),
        }
    }

    pub fn into_shared(self) -> SharedMaster<T> {
        Arc::new(Mutex::new(self))
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn change_type(&self) -> ChangeType {
        self.state.change_type()
    }

    pub fn state(&self) -> &T {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut T {
        &mut self.state
    }

    pub fn is_dirty(&self) -> bool {
        !self.state.dirty_bits().is_clear()
    }

    /// Publishes the dirty field groups as a new version.
    ///
    /// Returns the current version unchanged if nothing is dirty. A static
    /// object may only be changed before its first transmission; such
    /// changes travel with the snapshot and never produce a version.
    pub fn commit(&mut self) -> Result<Version, ReplicationError> {
        let dirty = self.state.dirty_bits();
        if dirty.is_clear() {
            return Ok(self.version);
        }

        let change_type = self.state.change_type();
        if change_type == ChangeType::Static {
            if self.transmitted {
                error!(
                    "{} is static but was modified after its first transmission",
                    self.object_id
                );
                return Err(ReplicationError::StaticCommit {
                    object_id: self.object_id,
                });
            }
            self.state.clear_dirty();
            return Ok(self.version);
        }

        self.version = self.version.next();
        let delta = ObjectDelta::capture(self.object_id, self.version, dirty, &self.state);
        self.state.clear_dirty();

        for outbox in self.outboxes.values_mut() {
            if change_type == ChangeType::Unbuffered && !outbox.is_empty() {
                // only the latest version is kept, carrying every field group
                // the replaced versions touched
                let merged = outbox
                    .drain(..)
                    .fold(dirty, |bits, pending| bits | pending.dirty);
                outbox.push_back(Self::capture_merged(&delta, merged, dirty, &self.state));
            } else {
                outbox.push_back(delta.clone());
            }
        }

        Ok(self.version)
    }

    fn capture_merged(
        delta: &ObjectDelta,
        merged: DirtyBits,
        dirty: DirtyBits,
        state: &T,
    ) -> ObjectDelta {
        if merged == dirty {
            return delta.clone();
        }
        ObjectDelta::capture(delta.object_id, delta.version, merged, state)
    }

    // Slaves

    /// Attaches a slave and returns the full snapshot it starts from,
    /// tagged with the current version. Uncommitted changes of a buffered
    /// object are included and will be sent again by the next commit.
    pub fn map_slave(&mut self, instance_id: InstanceId) -> Result<ObjectDelta, ReplicationError> {
        if self.outboxes.contains_key(&instance_id) {
            return Err(ReplicationError::SlaveAlreadyMapped {
                object_id: self.object_id,
                instance_id,
            });
        }
        if self.state.change_type() == ChangeType::Static {
            self.state.clear_dirty();
        }

        self.outboxes.insert(instance_id, VecDeque::new());
        self.transmitted = true;
        info!("{} mapped slave {} at {}", self.object_id, instance_id, self.version);

        Ok(ObjectDelta::snapshot(self.object_id, self.version, &self.state))
    }

    pub fn unmap_slave(&mut self, instance_id: InstanceId) -> Result<(), ReplicationError> {
        if self.outboxes.remove(&instance_id).is_none() {
            return Err(ReplicationError::SlaveNotMapped {
                object_id: self.object_id,
                instance_id,
            });
        }
        info!("{} unmapped slave {}", self.object_id, instance_id);
        Ok(())
    }

    pub fn is_mapped(&self, instance_id: InstanceId) -> bool {
        self.outboxes.contains_key(&instance_id)
    }

    pub fn slave_count(&self) -> usize {
        self.outboxes.len()
    }

    pub fn slaves(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.outboxes.keys().copied()
    }

    /// Drains the deltas queued for one slave, oldest first
    pub fn take_outgoing(&mut self, instance_id: InstanceId) -> Vec<ObjectDelta> {
        match self.outboxes.get_mut(&instance_id) {
            Some(outbox) => outbox.drain(..).collect(),
            None => Vec::new(),
        }
    }

    /// A master may only go away once every slave has been unmapped
    pub fn check_destroy(&self) -> Result<(), ReplicationError> {
        if self.outboxes.is_empty() {
            return Ok(());
        }
        Err(ReplicationError::SlavesStillMapped {
            object_id: self.object_id,
            slaves: self.outboxes.len(),
        })
    }
}

impl<T: Replicate> Drop for ObjectMaster<T> {
    fn drop(&mut self) {
        if thread::panicking() {
            return;
        }
        if let Err(err) = self.check_destroy() {
            error!("{}", err);
        }
    }
}
