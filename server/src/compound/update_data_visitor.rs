use std::collections::HashMap;

use lockstep_shared::{FrameNumber, Frustum, ObjectId, TaskMask, VisitorResult};

use crate::{
    compound::{ChannelState, Compound, CompoundVisitor, InheritData},
    entity::{find_channel, find_channel_mut, Node},
};

/// Brings every compound's inherited attributes up to date for a frame and
/// records, per channel, the compound issuing its last draw
pub struct CompoundUpdateDataVisitor<'a> {
    frame_number: FrameNumber,
    nodes: &'a mut [Node],
    view_frusta: &'a HashMap<ObjectId, Frustum>,
    stack: Vec<InheritData>,
}

impl<'a> CompoundUpdateDataVisitor<'a> {
    pub fn new(
        frame_number: FrameNumber,
        nodes: &'a mut [Node],
        view_frusta: &'a HashMap<ObjectId, Frustum>,
    ) -> Self {
        Self {
            frame_number,
            nodes,
            view_frusta,
            stack: Vec::new(),
        }
    }

    fn update(&mut self, compound: &mut Compound) {
        compound.fire_update_pre(self.frame_number);

        let parent = self.stack.last();
        let channel_path = compound
            .channel()
            .or_else(|| parent.and_then(|data| data.channel));
        let view_frusta = self.view_frusta;
        let channel = channel_path
            .and_then(|path| find_channel(&*self.nodes, &path))
            .map(|channel| ChannelState {
                pixel_viewport: channel.pixel_viewport(),
                active: channel.is_active(),
                view_frustum: channel
                    .view()
                    .and_then(|view| view_frusta.get(&view).copied()),
            });
        compound.update_inherit_data(self.frame_number, parent, channel.as_ref());

        self.update_draw_finish(compound);
    }

    fn update_draw_finish(&mut self, compound: &Compound) {
        let inherit = compound.inherit();
        if !inherit.active || !inherit.tasks.contains(TaskMask::DRAW) {
            return;
        }
        let Some(path) = inherit.channel else {
            return;
        };
        if let Some(channel) = find_channel_mut(self.nodes, &path) {
            channel.set_last_draw_compound(Some(compound.path().clone()));
        }
    }
}

impl CompoundVisitor for CompoundUpdateDataVisitor<'_> {
    fn visit_pre(&mut self, compound: &mut Compound) -> VisitorResult {
        self.update(compound);
        self.stack.push(compound.inherit().clone());
        VisitorResult::Continue
    }

    fn visit_leaf(&mut self, compound: &mut Compound) -> VisitorResult {
        self.update(compound);
        VisitorResult::Continue
    }

    fn visit_post(&mut self, _compound: &mut Compound) -> VisitorResult {
        self.stack.pop();
        VisitorResult::Continue
    }
}
