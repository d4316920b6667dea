use std::fmt;

use lockstep_serde::{BitReader, BitWrite, Serde, SerdeErr};

/// One rendering pass of a frame
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Eye {
    Cyclop,
    Left,
    Right,
}

impl Eye {
    pub const ALL: [Eye; 3] = [Eye::Cyclop, Eye::Left, Eye::Right];

    fn index(&self) -> u8 {
        match self {
            Eye::Cyclop => 0,
            Eye::Left => 1,
            Eye::Right => 2,
        }
    }

    pub fn mask(&self) -> EyeMask {
        EyeMask(1 << self.index())
    }
}

impl fmt::Display for Eye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Eye::Cyclop => "cyclop eye",
            Eye::Left => "left eye",
            Eye::Right => "right eye",
        };
        f.write_str(name)
    }
}

impl Serde for Eye {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.index().ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        match u8::de(reader)? {
            0 => Ok(Eye::Cyclop),
            1 => Ok(Eye::Left),
            2 => Ok(Eye::Right),
            value => Err(SerdeErr::InvalidValue {
                type_name: "Eye",
                value: u64::from(value),
            }),
        }
    }
}

/// The set of eye passes a compound renders
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EyeMask(u8);

impl EyeMask {
    pub const NONE: EyeMask = EyeMask(0);
    pub const CYCLOP: EyeMask = EyeMask(1);
    pub const STEREO: EyeMask = EyeMask(0b110);
    pub const ALL: EyeMask = EyeMask(0b111);

    pub fn contains(&self, eye: Eye) -> bool {
        self.0 & eye.mask().0 != 0
    }

    pub fn intersection(&self, other: EyeMask) -> EyeMask {
        EyeMask(self.0 & other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn eyes(&self) -> impl Iterator<Item = Eye> + '_ {
        Eye::ALL.into_iter().filter(|eye| self.contains(*eye))
    }
}

impl Default for EyeMask {
    fn default() -> Self {
        EyeMask::CYCLOP
    }
}
