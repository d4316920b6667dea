use std::{collections::HashMap, time::Duration};

use lockstep_shared::{FrameNumber, Monitor, ObjectId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Release {
    frame_number: FrameNumber,
    desynchronized: bool,
}

/// Where channels wait for the server to release their swap barrier.
///
/// Releases arrive on the command thread while the channel waits on the
/// node thread.
#[derive(Default)]
pub(crate) struct SwapGate {
    released: Monitor<HashMap<ObjectId, Release>>,
}

impl SwapGate {
    /// Records that `channel` may swap frame `frame_number`. Releases of
    /// older frames than one already recorded are ignored.
    pub(crate) fn release(
        &self,
        channel: ObjectId,
        frame_number: FrameNumber,
        desynchronized: bool,
    ) {
        self.released.update(|released| {
            let release = released.entry(channel).or_insert(Release {
                frame_number,
                desynchronized,
            });
            if release.frame_number < frame_number {
                *release = Release {
                    frame_number,
                    desynchronized,
                };
            }
        });
    }

    /// Blocks until `channel` is released for `frame_number` or a later
    /// frame. Returns whether the release was desynchronized, or `None` if
    /// nothing arrived in time.
    pub(crate) fn wait(
        &self,
        channel: ObjectId,
        frame_number: FrameNumber,
        timeout: Duration,
    ) -> Option<bool> {
        let released = self.released.wait_for_timeout(
            |released| {
                released
                    .get(&channel)
                    .is_some_and(|release| release.frame_number >= frame_number)
            },
            timeout,
        )?;
        released
            .get(&channel)
            .map(|release| release.frame_number > frame_number || release.desynchronized)
    }

    pub(crate) fn forget(&self, channel: ObjectId) {
        self.released.update(|released| {
            released.remove(&channel);
        });
    }
}
