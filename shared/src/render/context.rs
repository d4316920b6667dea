use lockstep_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::{
    render::{Eye, Frustum, PixelViewport, TaskMask, Viewport},
    types::FrameNumber,
};

/// Everything a render node needs to execute one compound's work on one
/// channel
#[derive(Clone, Debug, PartialEq)]
pub struct RenderContext {
    pub frame_id: u32,
    pub frame_number: FrameNumber,
    pub compound: String,
    pub tasks: TaskMask,
    pub eye: Eye,
    pub viewport: Viewport,
    pub pixel_viewport: PixelViewport,
    pub frustum: Frustum,
}

impl Serde for RenderContext {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.frame_id.ser(writer);
        self.frame_number.ser(writer);
        self.compound.ser(writer);
        self.tasks.ser(writer);
        self.eye.ser(writer);
        self.viewport.ser(writer);
        self.pixel_viewport.ser(writer);
        self.frustum.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            frame_id: u32::de(reader)?,
            frame_number: FrameNumber::de(reader)?,
            compound: String::de(reader)?,
            tasks: TaskMask::de(reader)?,
            eye: Eye::de(reader)?,
            viewport: Viewport::de(reader)?,
            pixel_viewport: PixelViewport::de(reader)?,
            frustum: Frustum::de(reader)?,
        })
    }
}
