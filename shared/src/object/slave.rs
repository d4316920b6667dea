use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use log::{info, warn};
use parking_lot::Mutex;

use crate::{
    base::monitor::Monitor,
    object::{ChangeType, ObjectDelta, ReplicationError, Replicate},
    protocol_config::ProtocolConfig,
    types::{InstanceId, ObjectId, Version},
};

/// Receive side of a slave. Shared with the thread that handles incoming
/// deltas while the owning thread syncs the slave's state.
pub struct SlaveInbox {
    object_id: ObjectId,
    change_type: ChangeType,
    max_pending: usize,
    applied: AtomicU64,
    deltas: Mutex<BTreeMap<Version, ObjectDelta>>,
    available: Monitor<Version>,
    needs_resync: AtomicBool,
}

impl SlaveInbox {
    fn new(
        object_id: ObjectId,
        change_type: ChangeType,
        max_pending: usize,
        version: Version,
    ) -> Self {
        Self {
            object_id,
            change_type,
            max_pending,
            applied: AtomicU64::new(version.value()),
            deltas: Mutex::new(BTreeMap::new()),
            available: Monitor::new(version),
            needs_resync: AtomicBool::new(false),
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub fn needs_resync(&self) -> bool {
        self.needs_resync.load(Ordering::SeqCst)
    }

    /// Newest version a sync can reach without waiting
    pub fn available(&self) -> Version {
        self.available.get()
    }

    pub fn pending_count(&self) -> usize {
        self.deltas.lock().len()
    }

    fn applied(&self) -> Version {
        Version::new(self.applied.load(Ordering::SeqCst))
    }

    /// Buffers an incoming delta. Safe to call from any thread.
    ///
    /// Stale and duplicate deltas are discarded. A slave holding more than
    /// the configured number of unapplied deltas drops them all and must be
    /// remapped. This holds for unbuffered objects too, whose deltas pile up
    /// when the slave never syncs.
    pub fn receive(&self, delta: ObjectDelta) -> Result<(), ReplicationError> {
        if delta.object_id != self.object_id {
            return Err(ReplicationError::WrongObject {
                expected: self.object_id,
                received: delta.object_id,
            });
        }
        if self.needs_resync() {
            warn!("{} awaits remap, discarding {}", self.object_id, delta.version);
            return Err(ReplicationError::ResyncRequired {
                object_id: self.object_id,
            });
        }

        let mut deltas = self.deltas.lock();
        let applied = self.applied();
        if delta.version <= applied {
            warn!(
                "{}: discarding stale {} (applied {})",
                self.object_id, delta.version, applied
            );
            return Err(ReplicationError::StaleDelta {
                object_id: self.object_id,
                version: delta.version,
                applied,
            });
        }
        if deltas.contains_key(&delta.version) {
            warn!("{}: discarding duplicate {}", self.object_id, delta.version);
            return Err(ReplicationError::DuplicateDelta {
                object_id: self.object_id,
                version: delta.version,
            });
        }
        deltas.insert(delta.version, delta);

        if deltas.len() > self.max_pending {
            let pending = deltas.len();
            deltas.clear();
            self.needs_resync.store(true, Ordering::SeqCst);
            // wake syncs blocked on this slave
            self.available.update(|_| {});
            warn!(
                "{}: {} deltas pending past {}, remap required",
                self.object_id, pending, applied
            );
            return Err(ReplicationError::GapOverflow {
                object_id: self.object_id,
                applied,
                pending,
            });
        }

        let reachable = self.reachable(&deltas, applied);
        self.available.update(|available| {
            if reachable > *available {
                *available = reachable;
            }
        });
        Ok(())
    }

    /// Newest version that can be applied given what is buffered
    fn reachable(&self, deltas: &BTreeMap<Version, ObjectDelta>, applied: Version) -> Version {
        if self.change_type == ChangeType::Unbuffered {
            return deltas.keys().next_back().copied().unwrap_or(applied);
        }
        let mut head = applied;
        while deltas.contains_key(&head.next()) {
            head = head.next();
        }
        head
    }

    fn reset(&self, version: Version) {
        let mut deltas = self.deltas.lock();
        deltas.retain(|buffered, _| *buffered > version);
        self.applied.store(version.value(), Ordering::SeqCst);
        self.needs_resync.store(false, Ordering::SeqCst);
        let reachable = self.reachable(&deltas, version);
        self.available.set(reachable);
    }
}

/// A read-only mirror of an object mastered elsewhere.
///
/// Deltas are applied in strictly increasing version order; an unbuffered
/// object may skip versions but never goes backwards.
pub struct ObjectSlave<T: Replicate> {
    instance_id: InstanceId,
    state: T,
    version: Version,
    inbox: Arc<SlaveInbox>,
}

impl<T: Replicate> ObjectSlave<T> {
    /// Builds a slave from the snapshot its master returned on mapping.
    /// `state` only provides the value the snapshot is read into.
    pub fn from_snapshot(
        instance_id: InstanceId,
        mut state: T,
        snapshot: &ObjectDelta,
        config: &ProtocolConfig,
    ) -> Result<Self, ReplicationError> {
        if !snapshot.is_snapshot() {
            return Err(ReplicationError::NotASnapshot {
                object_id: snapshot.object_id,
                version: snapshot.version,
            });
        }
        snapshot.apply_to(&mut state)?;
        state.clear_dirty();

        let inbox = SlaveInbox::new(
            snapshot.object_id,
            state.change_type(),
            config.max_pending_deltas,
            snapshot.version,
        );
        info!(
            "{} slave {} created at {}",
            snapshot.object_id, instance_id, snapshot.version
        );

        Ok(Self {
            instance_id,
            state,
            version: snapshot.version,
            inbox: Arc::new(inbox),
        })
    }

    pub fn object_id(&self) -> ObjectId {
        self.inbox.object_id
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn state(&self) -> &T {
        &self.state
    }

    pub fn inbox(&self) -> Arc<SlaveInbox> {
        self.inbox.clone()
    }

    pub fn needs_resync(&self) -> bool {
        self.inbox.needs_resync()
    }

    /// Blocks until `target` is available, then applies every buffered
    /// delta up to it. Returns immediately if `target` is already applied.
    pub fn sync(
        &mut self,
        target: Version,
        timeout: Duration,
    ) -> Result<Version, ReplicationError> {
        if self.inbox.needs_resync() {
            return Err(ReplicationError::ResyncRequired {
                object_id: self.object_id(),
            });
        }
        if self.version >= target {
            return Ok(self.version);
        }

        let inbox = self.inbox.clone();
        let reached = inbox
            .available
            .wait_for_timeout(|available| *available >= target || inbox.needs_resync(), timeout);
        if inbox.needs_resync() {
            return Err(ReplicationError::ResyncRequired {
                object_id: self.object_id(),
            });
        }
        if reached.is_none() {
            return Err(ReplicationError::SyncTimeout {
                object_id: self.object_id(),
                target,
                applied: self.version,
                waited: timeout,
            });
        }

        self.apply_up_to(target)
    }

    /// Applies the oldest applicable delta, if any
    pub fn sync_next(&mut self) -> Result<Option<Version>, ReplicationError> {
        let Some(delta) = self.pop_applicable(Version::new(u64::MAX)) else {
            return Ok(None);
        };
        self.apply(&delta)?;
        Ok(Some(self.version))
    }

    /// Applies everything that is applicable without waiting
    pub fn sync_latest(&mut self) -> Result<Version, ReplicationError> {
        self.apply_up_to(Version::new(u64::MAX))
    }

    /// Resets the slave to a fresh snapshot from its master. Buffered
    /// deltas newer than the snapshot are kept.
    pub fn apply_snapshot(&mut self, snapshot: &ObjectDelta) -> Result<Version, ReplicationError> {
        if snapshot.object_id != self.object_id() {
            return Err(ReplicationError::WrongObject {
                expected: self.object_id(),
                received: snapshot.object_id,
            });
        }
        if !snapshot.is_snapshot() {
            return Err(ReplicationError::NotASnapshot {
                object_id: snapshot.object_id,
                version: snapshot.version,
            });
        }
        snapshot.apply_to(&mut self.state)?;
        self.state.clear_dirty();
        self.version = snapshot.version;
        self.inbox.reset(snapshot.version);
        info!("{} slave {} resynced at {}", self.object_id(), self.instance_id, self.version);
        Ok(self.version)
    }

    fn apply_up_to(&mut self, target: Version) -> Result<Version, ReplicationError> {
        while let Some(delta) = self.pop_applicable(target) {
            self.apply(&delta)?;
        }
        Ok(self.version)
    }

    /// Removes the next delta to apply, dropping any that a concurrent
    /// receive let in while the previous one was being applied
    fn pop_applicable(&self, target: Version) -> Option<ObjectDelta> {
        let mut deltas = self.inbox.deltas.lock();
        loop {
            let next = deltas.keys().next().copied()?;
            if next <= self.version {
                deltas.remove(&next);
                continue;
            }
            if next > target {
                return None;
            }
            if self.inbox.change_type != ChangeType::Unbuffered && next != self.version.next() {
                return None;
            }
            return deltas.remove(&next);
        }
    }

    fn apply(&mut self, delta: &ObjectDelta) -> Result<(), ReplicationError> {
        if let Err(err) = delta.apply_to(&mut self.state) {
            self.inbox.needs_resync.store(true, Ordering::SeqCst);
            warn!("{}: malformed {}, remap required", self.object_id(), delta.version);
            return Err(err.into());
        }
        self.state.clear_dirty();
        self.version = delta.version;
        self.inbox.applied.store(delta.version.value(), Ordering::SeqCst);
        Ok(())
    }
}
