use lockstep_shared::{
    packets::ChannelFrameDrawPacket, FrameNumber, ObjectId, RenderContext, VisitorResult,
};

use crate::{
    compound::{Compound, CompoundPath, CompoundVisitor},
    entity::ChannelPath,
};

/// Collects the render work one channel performs in a frame, in traversal
/// order. The final draw of the channel's last draw compound carries the
/// swap barrier, if any.
pub struct ChannelUpdateVisitor<'a> {
    config: ObjectId,
    channel: ChannelPath,
    frame_id: u32,
    frame_number: FrameNumber,
    last_draw: Option<&'a CompoundPath>,
    draws: Vec<ChannelFrameDrawPacket>,
}

impl<'a> ChannelUpdateVisitor<'a> {
    pub fn new(
        config: ObjectId,
        channel: ChannelPath,
        frame_id: u32,
        frame_number: FrameNumber,
        last_draw: Option<&'a CompoundPath>,
    ) -> Self {
        Self {
            config,
            channel,
            frame_id,
            frame_number,
            last_draw,
            draws: Vec::new(),
        }
    }

    pub fn into_draws(self) -> Vec<ChannelFrameDrawPacket> {
        self.draws
    }

    fn collect(&mut self, compound: &Compound) {
        let inherit = compound.inherit();
        if compound.inherit_frame() != Some(self.frame_number)
            || !inherit.active
            || inherit.channel != Some(self.channel)
            || inherit.tasks.is_empty()
        {
            return;
        }

        let is_last_draw = self.last_draw == Some(compound.path());
        let eyes: Vec<_> = inherit.eyes.eyes().collect();
        for (index, eye) in eyes.iter().enumerate() {
            let swap_barrier = if is_last_draw && index + 1 == eyes.len() {
                inherit.swap_barrier.clone()
            } else {
                None
            };
            self.draws.push(ChannelFrameDrawPacket {
                config: self.config,
                context: RenderContext {
                    frame_id: self.frame_id,
                    frame_number: self.frame_number,
                    compound: compound.name().to_string(),
                    tasks: inherit.tasks,
                    eye: *eye,
                    viewport: inherit.viewport,
                    pixel_viewport: inherit.pixel_viewport,
                    frustum: inherit.frustum.sub_frustum(&inherit.viewport),
                },
                swap_barrier,
            });
        }
    }
}

impl CompoundVisitor for ChannelUpdateVisitor<'_> {
    fn visit_pre(&mut self, compound: &mut Compound) -> VisitorResult {
        self.collect(compound);
        VisitorResult::Continue
    }

    fn visit_leaf(&mut self, compound: &mut Compound) -> VisitorResult {
        self.collect(compound);
        VisitorResult::Continue
    }
}
