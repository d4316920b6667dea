use std::ops::{BitAnd, BitOr, BitOrAssign};

use lockstep_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

/// One bit per independently serialized field group of a replicated object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DirtyBits(u64);

impl DirtyBits {
    pub const NONE: DirtyBits = DirtyBits(0);
    /// Selects every field group; used for full snapshots
    pub const ALL: DirtyBits = DirtyBits(u64::MAX);

    pub const fn bit(index: u32) -> DirtyBits {
        DirtyBits(1 << index)
    }

    pub const fn from_bits(bits: u64) -> DirtyBits {
        DirtyBits(bits)
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }

    pub const fn is_clear(&self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set in `self`
    pub const fn contains(&self, other: DirtyBits) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(&self, other: DirtyBits) -> bool {
        self.0 & other.0 != 0
    }

    pub fn set(&mut self, other: DirtyBits) {
        self.0 |= other.0;
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

impl BitOr for DirtyBits {
    type Output = DirtyBits;

    fn bitor(self, rhs: DirtyBits) -> DirtyBits {
        DirtyBits(self.0 | rhs.0)
    }
}

impl BitOrAssign for DirtyBits {
    fn bitor_assign(&mut self, rhs: DirtyBits) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for DirtyBits {
    type Output = DirtyBits;

    fn bitand(self, rhs: DirtyBits) -> DirtyBits {
        DirtyBits(self.0 & rhs.0)
    }
}

impl Serde for DirtyBits {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<7>::new(self.0).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let value = UnsignedVariableInteger::<7>::de(reader)?.get();
        let Ok(bits) = u64::try_from(value) else {
            return Err(SerdeErr::IntegerOutOfRange {
                type_name: "DirtyBits",
                value,
            });
        };
        Ok(DirtyBits(bits))
    }
}
