use crate::{BitReader, BitWrite, ConstBitLength, Serde, SerdeErr};

pub trait SerdeIntegerConversion<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> {
    fn from(value: &SerdeInteger<SIGNED, VARIABLE, BITS>) -> Self;
}

pub type UnsignedInteger<const BITS: u8> = SerdeInteger<false, false, BITS>;
pub type SignedInteger<const BITS: u8> = SerdeInteger<true, false, BITS>;
pub type UnsignedVariableInteger<const BITS: u8> = SerdeInteger<false, true, BITS>;
pub type SignedVariableInteger<const BITS: u8> = SerdeInteger<true, true, BITS>;

// The generic wrapper forwards to a non-generic inner type to keep
// monomorphization bloat down.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SerdeInteger<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> {
    inner: SerdeIntegerInner,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
struct SerdeIntegerInner {
    value: i128,
    signed: bool,
    variable: bool,
    bits: u8,
}

impl SerdeIntegerInner {
    fn new(signed: bool, variable: bool, bits: u8, value: i128) -> Self {
        if bits == 0 {
            panic!("can't create an integer with 0 bits...");
        }
        if bits > 127 {
            panic!("can't create an integer with more than 127 bits...");
        }
        if !signed && value < 0 {
            panic!("can't encode a negative number with an Unsigned Integer!");
        }
        if !variable {
            let max_value: i128 = 2_i128.pow(bits as u32);
            if value.abs() >= max_value {
                panic!(
                    "with {} bits, can't encode number of magnitude {}",
                    bits, value
                );
            }
        }

        Self {
            value,
            signed,
            variable,
            bits,
        }
    }

    fn ser(&self, writer: &mut dyn BitWrite) {
        let negative = self.value < 0;
        if self.signed {
            writer.write_bit(negative);
        }
        let mut magnitude: u128 = self.value.unsigned_abs();

        if self.variable {
            loop {
                let proceed = magnitude >= 2_u128.pow(self.bits as u32);
                writer.write_bit(proceed);
                for _ in 0..self.bits {
                    writer.write_bit(magnitude & 1 != 0);
                    magnitude >>= 1;
                }
                if !proceed {
                    return;
                }
            }
        } else {
            for _ in 0..self.bits {
                writer.write_bit(magnitude & 1 != 0);
                magnitude >>= 1;
            }
        }
    }

    fn de(
        reader: &mut BitReader,
        signed: bool,
        variable: bool,
        bits: u8,
    ) -> Result<Self, SerdeErr> {
        let negative = if signed { reader.read_bit()? } else { false };

        let mut magnitude: u128 = 0;
        let mut shift: u32 = 0;

        if variable {
            loop {
                let proceed = reader.read_bit()?;
                if shift + bits as u32 > 127 {
                    return Err(SerdeErr::IntegerOverflow { max_bits: 127 });
                }
                for index in 0..bits as u32 {
                    if reader.read_bit()? {
                        magnitude |= 1u128 << (shift + index);
                    }
                }
                shift += bits as u32;
                if !proceed {
                    break;
                }
            }
        } else {
            for index in 0..bits as u32 {
                if reader.read_bit()? {
                    magnitude |= 1u128 << index;
                }
            }
        }

        let value = magnitude as i128;
        Ok(Self {
            value: if negative { -value } else { value },
            signed,
            variable,
            bits,
        })
    }

    fn bit_length(&self) -> u32 {
        let mut output: u32 = 0;
        if self.signed {
            output += 1;
        }
        if self.variable {
            let mut magnitude = self.value.unsigned_abs();
            loop {
                let proceed = magnitude >= 2_u128.pow(self.bits as u32);
                output += 1 + self.bits as u32;
                magnitude >>= self.bits;
                if !proceed {
                    break;
                }
            }
        } else {
            output += self.bits as u32;
        }
        output
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8>
    SerdeInteger<SIGNED, VARIABLE, BITS>
{
    pub fn new<T: Into<i128>>(value: T) -> Self {
        Self {
            inner: SerdeIntegerInner::new(SIGNED, VARIABLE, BITS, value.into()),
        }
    }

    pub fn get(&self) -> i128 {
        self.inner.value
    }

    pub fn set<T: Into<i128>>(&mut self, value: T) {
        self.inner = SerdeIntegerInner::new(SIGNED, VARIABLE, BITS, value.into());
    }

    pub fn to<T: SerdeIntegerConversion<SIGNED, VARIABLE, BITS>>(&self) -> T {
        T::from(self)
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> Serde
    for SerdeInteger<SIGNED, VARIABLE, BITS>
{
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.inner.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let inner = SerdeIntegerInner::de(reader, SIGNED, VARIABLE, BITS)?;
        Ok(Self { inner })
    }

    fn bit_length(&self) -> u32 {
        self.inner.bit_length()
    }
}

impl<const SIGNED: bool, const BITS: u8> ConstBitLength for SerdeInteger<SIGNED, false, BITS> {
    fn const_bit_length() -> u32 {
        let mut output: u32 = BITS as u32;
        if SIGNED {
            output += 1;
        }
        output
    }
}

macro_rules! impl_conversion {
    ($($ty:ty),*) => {$(
        impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8>
            SerdeIntegerConversion<SIGNED, VARIABLE, BITS> for $ty
        {
            fn from(value: &SerdeInteger<SIGNED, VARIABLE, BITS>) -> Self {
                value.inner.value as $ty
            }
        }
    )*};
}

impl_conversion!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);
