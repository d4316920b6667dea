use std::sync::Arc;

use parking_lot::Mutex;

use lockstep_client::{MirrorInfo, Renderer};
use lockstep_shared::{FrameNumber, RenderContext};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Init(String),
    Exit(String),
    Draw(String, RenderContext),
    Finish(String, FrameNumber),
    Swap(String, FrameNumber, bool),
}

/// Renders nothing and records every call. Entities named in `fail_init`
/// report a failed init.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_init: Arc<Mutex<Vec<String>>>,
}

impl RecordingRenderer {
    pub fn fail_init(&self, name: &str) {
        self.fail_init.lock().push(name.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn draws(&self, channel: &str) -> Vec<RenderContext> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Draw(name, context) if name == channel => Some(context.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(frame_number, desynchronized)` of every swap of `channel`
    pub fn swaps(&self, channel: &str) -> Vec<(FrameNumber, bool)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Swap(name, frame_number, desynchronized) if name == channel => {
                    Some((*frame_number, *desynchronized))
                }
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl Renderer for RecordingRenderer {
    fn config_init(&mut self, entity: &MirrorInfo, _init_id: u32) -> Result<(), String> {
        self.calls.lock().push(Call::Init(entity.name.clone()));
        if self.fail_init.lock().contains(&entity.name) {
            return Err(format!("{} has no display", entity.name));
        }
        Ok(())
    }

    fn config_exit(&mut self, entity: &MirrorInfo) -> Result<(), String> {
        self.calls.lock().push(Call::Exit(entity.name.clone()));
        Ok(())
    }

    fn frame_draw(&mut self, channel: &MirrorInfo, context: &RenderContext) {
        self.calls
            .lock()
            .push(Call::Draw(channel.name.clone(), context.clone()));
    }

    fn frame_finish(&mut self, channel: &MirrorInfo, frame_number: FrameNumber) {
        self.calls
            .lock()
            .push(Call::Finish(channel.name.clone(), frame_number));
    }

    fn swap(&mut self, channel: &MirrorInfo, frame_number: FrameNumber, desynchronized: bool) {
        self.calls
            .lock()
            .push(Call::Swap(channel.name.clone(), frame_number, desynchronized));
    }
}
