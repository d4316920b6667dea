use glam::Vec3;
use lockstep_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::render::Viewport;

/// A projection surface given by three of its corners
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wall {
    pub bottom_left: Vec3,
    pub bottom_right: Vec3,
    pub top_left: Vec3,
}

impl Wall {
    pub fn new(bottom_left: Vec3, bottom_right: Vec3, top_left: Vec3) -> Self {
        Self {
            bottom_left,
            bottom_right,
            top_left,
        }
    }

    pub fn width(&self) -> f32 {
        (self.bottom_right - self.bottom_left).length()
    }

    pub fn height(&self) -> f32 {
        (self.top_left - self.bottom_left).length()
    }

    /// Scales the wall horizontally around its center. Ratios of one or
    /// below zero leave the wall untouched.
    pub fn resize_horizontal(&mut self, ratio: f32) {
        if ratio == 1.0 || ratio < 0.0 {
            return;
        }
        let half_width = (self.bottom_right - self.bottom_left) * 0.5;
        let delta = half_width * (ratio - 1.0);
        self.bottom_left -= delta;
        self.bottom_right += delta;
        self.top_left -= delta;
    }

    /// Scales the wall vertically around its center
    pub fn resize_vertical(&mut self, ratio: f32) {
        if ratio == 1.0 || ratio < 0.0 {
            return;
        }
        let half_height = (self.top_left - self.bottom_left) * 0.5;
        let delta = half_height * (ratio - 1.0);
        self.bottom_left -= delta;
        self.bottom_right -= delta;
        self.top_left += delta;
    }

    /// The part of the wall a fractional viewport covers
    pub fn sub_wall(&self, viewport: &Viewport) -> Wall {
        let u = self.bottom_right - self.bottom_left;
        let v = self.top_left - self.bottom_left;
        let bottom_left = self.bottom_left + u * viewport.x + v * viewport.y;
        Wall {
            bottom_left,
            bottom_right: bottom_left + u * viewport.w,
            top_left: bottom_left + v * viewport.h,
        }
    }
}

impl Default for Wall {
    fn default() -> Self {
        Self {
            bottom_left: Vec3::new(-0.8, -0.5, -1.0),
            bottom_right: Vec3::new(0.8, -0.5, -1.0),
            top_left: Vec3::new(-0.8, 0.5, -1.0),
        }
    }
}

fn write_vec3(writer: &mut dyn BitWrite, value: Vec3) {
    value.x.ser(writer);
    value.y.ser(writer);
    value.z.ser(writer);
}

fn read_vec3(reader: &mut BitReader) -> Result<Vec3, SerdeErr> {
    Ok(Vec3::new(f32::de(reader)?, f32::de(reader)?, f32::de(reader)?))
}

impl Serde for Wall {
    fn ser(&self, writer: &mut dyn BitWrite) {
        write_vec3(writer, self.bottom_left);
        write_vec3(writer, self.bottom_right);
        write_vec3(writer, self.top_left);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            bottom_left: read_vec3(reader)?,
            bottom_right: read_vec3(reader)?,
            top_left: read_vec3(reader)?,
        })
    }
}

/// A viewing volume: the wall it projects onto plus near and far planes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    pub wall: Wall,
    pub near: f32,
    pub far: f32,
}

impl Frustum {
    pub fn new(wall: Wall, near: f32, far: f32) -> Self {
        Self { wall, near, far }
    }

    /// The sub-frustum covering a fractional viewport of this one
    pub fn sub_frustum(&self, viewport: &Viewport) -> Frustum {
        Frustum {
            wall: self.wall.sub_wall(viewport),
            near: self.near,
            far: self.far,
        }
    }
}

impl Default for Frustum {
    fn default() -> Self {
        Self {
            wall: Wall::default(),
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Serde for Frustum {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.wall.ser(writer);
        self.near.ser(writer);
        self.far.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            wall: Wall::de(reader)?,
            near: f32::de(reader)?,
            far: f32::de(reader)?,
        })
    }
}
