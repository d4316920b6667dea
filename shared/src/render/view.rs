use std::thread;

use lockstep_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::{
    object::{DirtyBits, Replicate},
    render::{Frustum, Viewport},
    types::ObjectId,
};

/// A named viewing setup inside a layout. Mastered on the server and
/// mirrored on every render node that maps it.
#[derive(Clone, Debug, PartialEq)]
pub struct View {
    name: String,
    viewport: Viewport,
    frustum: Frustum,
    layout: Option<ObjectId>,
    dirty: DirtyBits,
}

impl View {
    pub const DIRTY_FRUSTUM: DirtyBits = DirtyBits::bit(0);
    pub const DIRTY_VIEWPORT: DirtyBits = DirtyBits::bit(1);
    pub const DIRTY_NAME: DirtyBits = DirtyBits::bit(2);

    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            viewport: Viewport::FULL,
            frustum: Frustum::default(),
            layout: None,
            dirty: DirtyBits::NONE,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// The layout holding this view. Maintained by the layout.
    pub fn layout(&self) -> Option<ObjectId> {
        self.layout
    }

    pub fn set_layout(&mut self, layout: Option<ObjectId>) {
        self.layout = layout;
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.dirty.set(Self::DIRTY_NAME);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.dirty.set(Self::DIRTY_VIEWPORT);
    }

    pub fn set_frustum(&mut self, frustum: Frustum) {
        self.frustum = frustum;
        self.dirty.set(Self::DIRTY_FRUSTUM);
    }

    pub fn set_near_far(&mut self, near: f32, far: f32) {
        self.frustum.near = near;
        self.frustum.far = far;
        self.dirty.set(Self::DIRTY_FRUSTUM);
    }
}

impl Replicate for View {
    fn dirty_bits(&self) -> DirtyBits {
        self.dirty
    }

    fn set_dirty(&mut self, bits: DirtyBits) {
        self.dirty.set(bits);
    }

    fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    fn write(&self, writer: &mut dyn BitWrite, dirty: DirtyBits) {
        if dirty.contains(Self::DIRTY_FRUSTUM) {
            self.frustum.ser(writer);
        }
        if dirty.contains(Self::DIRTY_VIEWPORT) {
            self.viewport.ser(writer);
        }
        if dirty.contains(Self::DIRTY_NAME) {
            self.name.ser(writer);
        }
    }

    fn read(&mut self, reader: &mut BitReader, dirty: DirtyBits) -> Result<(), SerdeErr> {
        if dirty.contains(Self::DIRTY_FRUSTUM) {
            self.frustum = Frustum::de(reader)?;
        }
        if dirty.contains(Self::DIRTY_VIEWPORT) {
            self.viewport = Viewport::de(reader)?;
        }
        if dirty.contains(Self::DIRTY_NAME) {
            self.name = String::de(reader)?;
        }
        Ok(())
    }
}

impl Drop for View {
    fn drop(&mut self) {
        debug_assert!(
            self.layout.is_none() || thread::panicking(),
            "view {} destroyed while still held by {:?}",
            self.name,
            self.layout
        );
    }
}
