use std::{collections::HashMap, time::Instant};

use log::debug;

use lockstep_shared::{FrameNumber, Frustum, ObjectId, VisitorResult};

use crate::{
    compound::{ChannelUpdateVisitor, CompoundUpdateDataVisitor},
    config::Config,
    entity::{find_channel, find_channel_mut},
    error::ConfigError,
    swap_barrier::Participant,
};

impl Config {
    /// Starts the next frame: publishes view changes, updates the compound
    /// tree, arms the swap barriers and sends every channel its render work
    /// followed by a frame-finish request. Returns the new frame number.
    pub fn start_frame(&mut self, frame_id: u32) -> Result<FrameNumber, ConfigError> {
        if !self.lifecycle.is_running() {
            return Err(ConfigError::NotRunning {
                config: self.name.clone(),
                state: self.lifecycle.state(),
            });
        }
        self.frame_number += 1;
        let frame_number = self.frame_number;
        debug!("{} starts frame {}", self.name, frame_number);

        self.commit_views()?;
        self.update_compounds(frame_number);
        self.expect_swap_barriers(frame_number);

        for path in self.active_channels() {
            let Some(channel) = find_channel(&self.nodes, &path) else {
                continue;
            };
            if !channel.is_running() || !channel.is_used() {
                continue;
            }
            let last_draw = channel.last_draw_compound().cloned();
            let mut visitor = ChannelUpdateVisitor::new(
                self.id,
                path,
                frame_id,
                frame_number,
                last_draw.as_ref(),
            );
            for compound in self.compounds.iter_mut() {
                if compound.accept(&mut visitor) == VisitorResult::Terminate {
                    break;
                }
            }
            let draws = visitor.into_draws();

            let Some(channel) = find_channel_mut(&mut self.nodes, &path) else {
                continue;
            };
            channel.update_draw(draws)?;
            channel.update_post(frame_id, frame_number)?;
        }

        self.barriers.poll(Instant::now());
        Ok(frame_number)
    }

    /// Waits until no more than `latency` frames are in flight. Returns the
    /// number of the last finished frame.
    pub fn finish_frame(&mut self) -> Result<FrameNumber, ConfigError> {
        let latency = self.server_config.latency;
        if self.frame_number <= latency {
            return Ok(self.finished_frame);
        }
        self.wait_frames(self.frame_number - latency)
    }

    /// Waits until every started frame is finished
    pub fn finish_all_frames(&mut self) -> Result<FrameNumber, ConfigError> {
        self.wait_frames(self.frame_number)
    }

    fn wait_frames(&mut self, frame_number: FrameNumber) -> Result<FrameNumber, ConfigError> {
        if frame_number <= self.finished_frame {
            return Ok(self.finished_frame);
        }
        let timeout = self.server_config.frame_finish_timeout;
        let barriers = self.barriers.clone();
        for channel in self.channels_mut() {
            channel.wait_frame_finished(frame_number, timeout, || {
                barriers.poll(Instant::now())
            })?;
        }

        debug!("{} finished frame {}", self.name, frame_number);
        self.finished_frame = frame_number;
        self.barriers.poll(Instant::now());
        self.barriers.forget_before(frame_number.saturating_sub(1));
        Ok(frame_number)
    }

    /// Refreshes the inherited attributes of every compound and finds each
    /// channel's last draw compound
    fn update_compounds(&mut self, frame_number: FrameNumber) {
        for channel in self.channels_mut() {
            channel.set_last_draw_compound(None);
        }
        let view_frusta = self.view_frusta();
        let mut visitor =
            CompoundUpdateDataVisitor::new(frame_number, &mut self.nodes, &view_frusta);
        for compound in self.compounds.iter_mut() {
            if compound.accept(&mut visitor) == VisitorResult::Terminate {
                break;
            }
        }
    }

    /// Registers, per barrier, the channels whose last draw compound uses it
    fn expect_swap_barriers(&mut self, frame_number: FrameNumber) {
        let now = Instant::now();
        let mut participants: HashMap<String, Vec<Participant>> = HashMap::new();
        for path in self.active_channels() {
            let Some(channel) = self.channel(path) else {
                continue;
            };
            if !channel.is_running() {
                continue;
            }
            let Some(barrier) = channel
                .last_draw_compound()
                .and_then(|compound| self.compound(compound))
                .and_then(|compound| compound.inherit().swap_barrier.clone())
            else {
                continue;
            };
            participants.entry(barrier).or_default().push(Participant {
                channel: channel.id(),
                name: channel.name().to_string(),
                node: channel.core().link().node(),
            });
        }
        for (barrier, participants) in participants {
            self.barriers
                .get_or_create(&barrier)
                .expect(frame_number, participants, now);
        }
    }

    fn view_frusta(&self) -> HashMap<ObjectId, Frustum> {
        self.layouts
            .iter()
            .flat_map(|layout| layout.views().iter())
            .map(|view| {
                let master = view.lock();
                (master.object_id(), *master.state().frustum())
            })
            .collect()
    }
}
