use lockstep_serde::{BitReader, BitWrite, Serde, SerdeErr};

/// A fractional viewport, relative to a parent area
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Viewport {
    pub const FULL: Viewport = Viewport {
        x: 0.0,
        y: 0.0,
        w: 1.0,
        h: 1.0,
    };

    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_valid(&self) -> bool {
        self.x >= 0.0 && self.y >= 0.0 && self.w >= 0.0 && self.h >= 0.0
    }

    pub fn has_area(&self) -> bool {
        self.w > 0.0 && self.h > 0.0
    }

    /// The area `sub` covers, expressed relative to whatever `self` is
    /// relative to
    pub fn apply(&self, sub: &Viewport) -> Viewport {
        Viewport {
            x: self.x + sub.x * self.w,
            y: self.y + sub.y * self.h,
            w: self.w * sub.w,
            h: self.h * sub.h,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::FULL
    }
}

impl Serde for Viewport {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.x.ser(writer);
        self.y.ser(writer);
        self.w.ser(writer);
        self.h.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            x: f32::de(reader)?,
            y: f32::de(reader)?,
            w: f32::de(reader)?,
            h: f32::de(reader)?,
        })
    }
}

/// A viewport in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelViewport {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl PixelViewport {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_valid(&self) -> bool {
        self.w >= 0 && self.h >= 0
    }

    pub fn has_area(&self) -> bool {
        self.w > 0 && self.h > 0
    }

    /// The pixel area a fractional viewport covers within `self`
    pub fn apply(&self, viewport: &Viewport) -> PixelViewport {
        let x = self.x + (viewport.x * self.w as f32).round() as i32;
        let y = self.y + (viewport.y * self.h as f32).round() as i32;
        let right = self.x + ((viewport.x + viewport.w) * self.w as f32).round() as i32;
        let top = self.y + ((viewport.y + viewport.h) * self.h as f32).round() as i32;
        PixelViewport {
            x,
            y,
            w: right - x,
            h: top - y,
        }
    }

    /// The fractional viewport `self` covers within `parent`
    pub fn viewport_in(&self, parent: &PixelViewport) -> Viewport {
        if !parent.has_area() {
            return Viewport::FULL;
        }
        Viewport {
            x: (self.x - parent.x) as f32 / parent.w as f32,
            y: (self.y - parent.y) as f32 / parent.h as f32,
            w: self.w as f32 / parent.w as f32,
            h: self.h as f32 / parent.h as f32,
        }
    }
}

impl Serde for PixelViewport {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.x.ser(writer);
        self.y.ser(writer);
        self.w.ser(writer);
        self.h.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            x: i32::de(reader)?,
            y: i32::de(reader)?,
            w: i32::de(reader)?,
            h: i32::de(reader)?,
        })
    }
}
