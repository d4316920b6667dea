use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, warn};
use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use thiserror::Error;

use lockstep_shared::{
    packets::{SwapBarrierEnterPacket, SwapBarrierReleasePacket},
    Command, CommandSender, FrameNumber, NodeId, ObjectId,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BarrierError {
    /// No barrier with that name exists in the config
    #[error("Unknown swap barrier {name}")]
    UnknownBarrier { name: String },

    /// The frame was never expected or has been forgotten
    #[error("Swap barrier {barrier} does not expect frame {frame_number}")]
    FrameNotRegistered {
        barrier: String,
        frame_number: FrameNumber,
    },

    /// The channel does not take part in the frame's rendezvous
    #[error("{channel} does not take part in frame {frame_number} of swap barrier {barrier}")]
    UnknownParticipant {
        barrier: String,
        frame_number: FrameNumber,
        channel: ObjectId,
    },

    /// A blocking participant gave up before the barrier released
    #[error("Gave up on swap barrier {barrier} for frame {frame_number} after {waited:?}")]
    WaitTimeout {
        barrier: String,
        frame_number: FrameNumber,
        waited: Duration,
    },
}

/// A channel that has to rendezvous at a barrier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub channel: ObjectId,
    pub name: String,
    pub node: NodeId,
}

/// The outcome of one frame at one barrier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarrierRelease {
    pub barrier: String,
    pub frame_number: FrameNumber,
    /// Participants allowed to swap by this release
    pub released: Vec<Participant>,
    /// Participants that had not arrived when the barrier timed out
    pub missing: Vec<Participant>,
    /// Set when not all participants swapped together
    pub desynchronized: bool,
}

struct FrameSlot {
    expected: Vec<Participant>,
    arrived: Vec<Participant>,
    deadline: Instant,
    outcome: Option<BarrierRelease>,
}

/// Sends releases to the participants' nodes and keeps the desynchronized
/// ones until the application takes them
struct ReleaseOutbox {
    sender: Arc<dyn CommandSender>,
    reports: Mutex<Vec<BarrierRelease>>,
}

impl ReleaseOutbox {
    fn deliver(&self, release: BarrierRelease) {
        if release.desynchronized {
            self.reports.lock().push(release.clone());
        } else {
            debug!(
                "Swap barrier {} released frame {}",
                release.barrier, release.frame_number
            );
        }
        for participant in &release.released {
            let command = Command::new(
                participant.channel,
                &SwapBarrierReleasePacket {
                    barrier: release.barrier.clone(),
                    frame_number: release.frame_number,
                    desynchronized: release.desynchronized,
                },
            );
            if let Err(err) = self.sender.send(participant.node, command) {
                warn!("Could not release {}: {}", participant.name, err);
            }
        }
    }
}

/// Holds the channels of one frame back until all of them finished drawing,
/// so they swap together. After the timeout the channels that did arrive
/// are released and the frame is reported desynchronized; latecomers are
/// released on arrival.
pub struct SwapBarrier {
    name: String,
    timeout: Duration,
    frames: Mutex<BTreeMap<FrameNumber, FrameSlot>>,
    released: Condvar,
    outbox: Option<Arc<ReleaseOutbox>>,
}

impl SwapBarrier {
    pub fn new(name: &str, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            timeout,
            frames: Mutex::new(BTreeMap::new()),
            released: Condvar::new(),
            outbox: None,
        }
    }

    fn with_outbox(name: &str, timeout: Duration, outbox: Arc<ReleaseOutbox>) -> Self {
        Self {
            outbox: Some(outbox),
            ..Self::new(name, timeout)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Announces who has to arrive for `frame_number`. The timeout starts
    /// now.
    pub fn expect(&self, frame_number: FrameNumber, participants: Vec<Participant>, now: Instant) {
        if participants.is_empty() {
            return;
        }
        debug!(
            "Swap barrier {} expects {} channels for frame {}",
            self.name,
            participants.len(),
            frame_number
        );
        let previous = self.frames.lock().insert(
            frame_number,
            FrameSlot {
                expected: participants,
                arrived: Vec::new(),
                deadline: now + self.timeout,
                outcome: None,
            },
        );
        if previous.is_some() {
            warn!(
                "Swap barrier {} replaced the participants of frame {}",
                self.name, frame_number
            );
        }
    }

    pub fn is_pending(&self, frame_number: FrameNumber) -> bool {
        self.frames
            .lock()
            .get(&frame_number)
            .is_some_and(|slot| slot.outcome.is_none())
    }

    /// Records a channel's arrival and returns the releases it triggers: the
    /// full release when it was the last one, an expiry of the frame if the
    /// deadline already passed, and its own desynchronized release if it
    /// came after the barrier gave up on it.
    pub fn arrive(
        &self,
        frame_number: FrameNumber,
        channel: ObjectId,
        now: Instant,
    ) -> Result<Vec<BarrierRelease>, BarrierError> {
        let mut frames = self.frames.lock();
        let mut releases = self.expire_locked(&mut frames, now);

        let Some(slot) = frames.get_mut(&frame_number) else {
            return Err(BarrierError::FrameNotRegistered {
                barrier: self.name.clone(),
                frame_number,
            });
        };
        let Some(participant) = slot
            .expected
            .iter()
            .find(|participant| participant.channel == channel)
            .cloned()
        else {
            return Err(BarrierError::UnknownParticipant {
                barrier: self.name.clone(),
                frame_number,
                channel,
            });
        };

        if slot.arrived.contains(&participant) {
            warn!(
                "{} entered swap barrier {} twice for frame {}",
                participant.name, self.name, frame_number
            );
            return Ok(releases);
        }
        slot.arrived.push(participant.clone());

        if slot.outcome.is_some() {
            warn!(
                "{} arrived late at swap barrier {} for frame {}",
                participant.name, self.name, frame_number
            );
            releases.push(BarrierRelease {
                barrier: self.name.clone(),
                frame_number,
                released: vec![participant],
                missing: Vec::new(),
                desynchronized: true,
            });
            return Ok(releases);
        }

        if slot.arrived.len() == slot.expected.len() {
            let release = BarrierRelease {
                barrier: self.name.clone(),
                frame_number,
                released: slot.arrived.clone(),
                missing: Vec::new(),
                desynchronized: false,
            };
            slot.outcome = Some(release.clone());
            self.released.notify_all();
            releases.push(release);
        }
        Ok(releases)
    }

    /// Releases every frame whose deadline passed
    pub fn expire(&self, now: Instant) -> Vec<BarrierRelease> {
        let mut frames = self.frames.lock();
        self.expire_locked(&mut frames, now)
    }

    fn expire_locked(
        &self,
        frames: &mut BTreeMap<FrameNumber, FrameSlot>,
        now: Instant,
    ) -> Vec<BarrierRelease> {
        let mut releases = Vec::new();
        for (frame_number, slot) in frames.iter_mut() {
            if slot.outcome.is_some() || slot.deadline > now {
                continue;
            }
            let missing: Vec<Participant> = slot
                .expected
                .iter()
                .filter(|participant| !slot.arrived.contains(participant))
                .cloned()
                .collect();
            warn!(
                "Swap barrier {} timed out for frame {}, {} of {} channels missing",
                self.name,
                frame_number,
                missing.len(),
                slot.expected.len()
            );
            let release = BarrierRelease {
                barrier: self.name.clone(),
                frame_number: *frame_number,
                released: slot.arrived.clone(),
                missing,
                desynchronized: true,
            };
            slot.outcome = Some(release.clone());
            releases.push(release);
        }
        if !releases.is_empty() {
            self.released.notify_all();
        }
        releases
    }

    /// Arrives and blocks until the frame is released, for participants
    /// living in the same process. Gives up after `timeout`.
    ///
    /// Releases triggered by the call, by this arrival or by a timeout
    /// noticed while waiting, go to every participant they let through when
    /// the barrier belongs to a [`SwapBarrierSet`].
    pub fn wait_release(
        &self,
        frame_number: FrameNumber,
        channel: ObjectId,
        timeout: Duration,
    ) -> Result<BarrierRelease, BarrierError> {
        let releases = self.arrive(frame_number, channel, Instant::now())?;
        let own = releases
            .iter()
            .find(|release| {
                release.frame_number == frame_number
                    && release
                        .released
                        .iter()
                        .any(|participant| participant.channel == channel)
            })
            .cloned();
        self.pass_on(releases);
        if let Some(release) = own {
            return Ok(release);
        }

        let give_up = Instant::now() + timeout;
        let mut frames = self.frames.lock();
        loop {
            let Some(slot) = frames.get(&frame_number) else {
                return Err(BarrierError::FrameNotRegistered {
                    barrier: self.name.clone(),
                    frame_number,
                });
            };
            if let Some(outcome) = &slot.outcome {
                return Ok(outcome.clone());
            }
            let wake = slot.deadline.min(give_up);
            if self.released.wait_until(&mut frames, wake).timed_out() {
                let now = Instant::now();
                let expired = self.expire_locked(&mut frames, now);
                if !expired.is_empty() {
                    MutexGuard::unlocked(&mut frames, || self.pass_on(expired));
                    continue;
                }
                if now >= give_up && self.is_open(&frames, frame_number) {
                    return Err(BarrierError::WaitTimeout {
                        barrier: self.name.clone(),
                        frame_number,
                        waited: timeout,
                    });
                }
            }
        }
    }

    fn pass_on(&self, releases: Vec<BarrierRelease>) {
        if let Some(outbox) = &self.outbox {
            for release in releases {
                outbox.deliver(release);
            }
        }
    }

    fn is_open(
        &self,
        frames: &BTreeMap<FrameNumber, FrameSlot>,
        frame_number: FrameNumber,
    ) -> bool {
        frames
            .get(&frame_number)
            .is_some_and(|slot| slot.outcome.is_none())
    }

    /// Drops the bookkeeping of frames before `frame_number`
    pub fn forget_before(&self, frame_number: FrameNumber) {
        let mut frames = self.frames.lock();
        *frames = frames.split_off(&frame_number);
    }
}

/// The swap barriers of one config, keyed by name. Releases are sent to the
/// participants' nodes; desynchronized ones are kept for the application.
pub struct SwapBarrierSet {
    timeout: Duration,
    outbox: Arc<ReleaseOutbox>,
    barriers: RwLock<HashMap<String, Arc<SwapBarrier>>>,
}

impl SwapBarrierSet {
    pub fn new(timeout: Duration, sender: Arc<dyn CommandSender>) -> Self {
        Self {
            timeout,
            outbox: Arc::new(ReleaseOutbox {
                sender,
                reports: Mutex::new(Vec::new()),
            }),
            barriers: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_or_create(&self, name: &str) -> Arc<SwapBarrier> {
        if let Some(barrier) = self.get(name) {
            return barrier;
        }
        self.barriers
            .write()
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(SwapBarrier::with_outbox(
                    name,
                    self.timeout,
                    self.outbox.clone(),
                ))
            })
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<SwapBarrier>> {
        self.barriers.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.barriers.read().keys().cloned().collect()
    }

    /// Handles a channel entering a barrier
    pub fn enter(&self, packet: &SwapBarrierEnterPacket, now: Instant) -> Result<(), BarrierError> {
        let barrier = self
            .get(&packet.barrier)
            .ok_or_else(|| BarrierError::UnknownBarrier {
                name: packet.barrier.clone(),
            })?;
        for release in barrier.arrive(packet.frame_number, packet.channel, now)? {
            self.outbox.deliver(release);
        }
        Ok(())
    }

    /// Expires overdue frames of every barrier
    pub fn poll(&self, now: Instant) {
        let barriers: Vec<Arc<SwapBarrier>> = self.barriers.read().values().cloned().collect();
        for barrier in barriers {
            for release in barrier.expire(now) {
                self.outbox.deliver(release);
            }
        }
    }

    pub fn forget_before(&self, frame_number: FrameNumber) {
        for barrier in self.barriers.read().values() {
            barrier.forget_before(frame_number);
        }
    }

    /// Desynchronized releases since the last call
    pub fn take_reports(&self) -> Vec<BarrierRelease> {
        std::mem::take(&mut *self.outbox.reports.lock())
    }
}
