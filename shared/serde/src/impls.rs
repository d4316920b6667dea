use crate::{
    BitReader, BitWrite, ConstBitLength, Serde, SerdeErr, UnsignedVariableInteger,
    MAX_COLLECTION_LENGTH, MAX_STRING_BYTES,
};

// Unit

impl Serde for () {
    fn ser(&self, _: &mut dyn BitWrite) {}

    fn de(_: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(())
    }

    fn bit_length(&self) -> u32 {
        0
    }
}

impl ConstBitLength for () {
    fn const_bit_length() -> u32 {
        0
    }
}

// Boolean

impl Serde for bool {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bit(*self);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        reader.read_bit()
    }

    fn bit_length(&self) -> u32 {
        1
    }
}

impl ConstBitLength for bool {
    fn const_bit_length() -> u32 {
        1
    }
}

// Fixed-width numbers, little endian

macro_rules! impl_fixed_number {
    ($($ty:ty),*) => {$(
        impl Serde for $ty {
            fn ser(&self, writer: &mut dyn BitWrite) {
                writer.write_bytes(&self.to_le_bytes());
            }

            fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                for byte in bytes.iter_mut() {
                    *byte = reader.read_byte()?;
                }
                Ok(<$ty>::from_le_bytes(bytes))
            }

            fn bit_length(&self) -> u32 {
                <Self as ConstBitLength>::const_bit_length()
            }
        }

        impl ConstBitLength for $ty {
            fn const_bit_length() -> u32 {
                (std::mem::size_of::<$ty>() * 8) as u32
            }
        }
    )*};
}

impl_fixed_number!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

// Lengths are written as variable integers so small collections stay small

fn write_length(writer: &mut dyn BitWrite, length: usize) {
    UnsignedVariableInteger::<7>::new(length as u64).ser(writer);
}

fn read_length(reader: &mut BitReader, max: u64) -> Result<usize, SerdeErr> {
    let length: u64 = UnsignedVariableInteger::<7>::de(reader)?.to();
    if length > max {
        return Err(SerdeErr::LengthTooLarge { length, max });
    }
    Ok(length as usize)
}

// String

impl Serde for String {
    fn ser(&self, writer: &mut dyn BitWrite) {
        write_length(writer, self.len());
        writer.write_bytes(self.as_bytes());
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length = read_length(reader, MAX_STRING_BYTES)?;
        let bytes = reader.read_bytes(length)?;
        String::from_utf8(bytes).map_err(|_| SerdeErr::InvalidUtf8)
    }
}

// Option

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            Some(value) => {
                writer.write_bit(true);
                value.ser(writer);
            }
            None => writer.write_bit(false),
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(Some(T::de(reader)?))
        } else {
            Ok(None)
        }
    }
}

// Vec

impl<T: Serde> Serde for Vec<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        write_length(writer, self.len());
        for item in self {
            item.ser(writer);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length = read_length(reader, MAX_COLLECTION_LENGTH)?;
        let mut output = Vec::with_capacity(length.min(1024));
        for _ in 0..length {
            output.push(T::de(reader)?);
        }
        Ok(output)
    }
}

// Box

impl<T: Serde> Serde for Box<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.as_ref().ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Box::new(T::de(reader)?))
    }
}

// Arrays

impl<T: Serde, const N: usize> Serde for [T; N] {
    fn ser(&self, writer: &mut dyn BitWrite) {
        for item in self {
            item.ser(writer);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let mut items = Vec::with_capacity(N);
        for _ in 0..N {
            items.push(T::de(reader)?);
        }
        let Ok(array) = <[T; N]>::try_from(items) else {
            unreachable!("exactly N items were read");
        };
        Ok(array)
    }
}

// Tuples

impl<A: Serde, B: Serde> Serde for (A, B) {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.0.ser(writer);
        self.1.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok((A::de(reader)?, B::de(reader)?))
    }
}

impl<A: Serde, B: Serde, C: Serde> Serde for (A, B, C) {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.0.ser(writer);
        self.1.ser(writer);
        self.2.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok((A::de(reader)?, B::de(reader)?, C::de(reader)?))
    }
}
