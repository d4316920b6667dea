use crate::{BitCounter, BitReader, BitWrite, SerdeErr};

/// A value that can be written to and read from a bit stream
pub trait Serde: Sized + Clone + PartialEq {
    /// Serialize Self to a BitWrite
    fn ser(&self, writer: &mut dyn BitWrite);

    /// Deserialize Self from a BitReader
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr>;

    /// Number of bits `ser` would write
    fn bit_length(&self) -> u32 {
        let mut counter = BitCounter::new();
        self.ser(&mut counter);
        counter.bits_needed()
    }
}

/// Implemented by types whose encoding always occupies the same number of bits
pub trait ConstBitLength {
    fn const_bit_length() -> u32;
}
