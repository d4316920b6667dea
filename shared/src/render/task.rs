use std::ops::{BitOr, BitOrAssign};

use lockstep_serde::{BitReader, BitWrite, Serde, SerdeErr};

/// Rendering tasks a compound asks its channel to perform
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TaskMask(u32);

impl TaskMask {
    pub const NONE: TaskMask = TaskMask(0);
    pub const CLEAR: TaskMask = TaskMask(1 << 0);
    pub const DRAW: TaskMask = TaskMask(1 << 1);
    pub const ASSEMBLE: TaskMask = TaskMask(1 << 2);
    pub const READBACK: TaskMask = TaskMask(1 << 3);
    /// Tasks of a compound that does not set its own
    pub const DEFAULT: TaskMask = TaskMask(0b1111);

    pub const fn from_bits(bits: u32) -> TaskMask {
        TaskMask(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn contains(&self, other: TaskMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(&self, other: TaskMask) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for TaskMask {
    type Output = TaskMask;

    fn bitor(self, rhs: TaskMask) -> TaskMask {
        TaskMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for TaskMask {
    fn bitor_assign(&mut self, rhs: TaskMask) {
        self.0 |= rhs.0;
    }
}

impl Serde for TaskMask {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.0.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(TaskMask(u32::de(reader)?))
    }
}
