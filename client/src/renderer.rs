use lockstep_shared::{FrameNumber, RenderContext};

use crate::mirror::MirrorInfo;

/// The rendering layer a [`RenderNode`](crate::RenderNode) drives.
///
/// Every call is made on the node thread, one at a time.
pub trait Renderer: Send + 'static {
    /// Acquires whatever the entity needs to render. An `Err` fails the
    /// entity's init with the given reason.
    fn config_init(&mut self, _entity: &MirrorInfo, _init_id: u32) -> Result<(), String> {
        Ok(())
    }

    /// Releases the entity's resources
    fn config_exit(&mut self, _entity: &MirrorInfo) -> Result<(), String> {
        Ok(())
    }

    /// Executes one compound's work on a channel. Called once per eye pass.
    fn frame_draw(&mut self, channel: &MirrorInfo, context: &RenderContext);

    /// All work of `frame_number` has been handed to the channel
    fn frame_finish(&mut self, _channel: &MirrorInfo, _frame_number: FrameNumber) {}

    /// Presents the channel's frame. `desynchronized` is set when the swap
    /// barrier gave up on some of its participants or on this channel.
    fn swap(&mut self, _channel: &MirrorInfo, _frame_number: FrameNumber, _desynchronized: bool) {}
}
