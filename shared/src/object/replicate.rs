use lockstep_serde::{BitReader, BitWrite, SerdeErr};

use crate::object::{ChangeType, DirtyBits};

/// State that can be mastered in one process and mirrored by slaves in
/// others.
///
/// Setters of an implementor mark the field groups they touch dirty;
/// `write` and `read` handle exactly the groups selected by `dirty`, in a
/// fixed order. `read` must not mark anything dirty.
pub trait Replicate: Send + 'static {
    fn dirty_bits(&self) -> DirtyBits;

    fn set_dirty(&mut self, bits: DirtyBits);

    fn clear_dirty(&mut self);

    fn write(&self, writer: &mut dyn BitWrite, dirty: DirtyBits);

    fn read(&mut self, reader: &mut BitReader, dirty: DirtyBits) -> Result<(), SerdeErr>;

    fn change_type(&self) -> ChangeType {
        ChangeType::Delta
    }
}
