use crate::SerdeErr;

/// Reads bits and bytes, LSB first, out of a borrowed buffer.
pub struct BitReader<'b> {
    buffer: &'b [u8],
    bit_index: usize,
}

impl<'b> BitReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            bit_index: 0,
        }
    }

    pub fn read_bit(&mut self) -> Result<bool, SerdeErr> {
        let Some(byte) = self.buffer.get(self.bit_index / 8) else {
            return Err(SerdeErr::UnexpectedEnd {
                bit_index: self.bit_index,
                buffer_bits: self.buffer.len() * 8,
            });
        };
        let bit = (byte >> (self.bit_index % 8)) & 1 != 0;
        self.bit_index += 1;
        Ok(bit)
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        if self.bit_index % 8 == 0 {
            let Some(byte) = self.buffer.get(self.bit_index / 8) else {
                return Err(SerdeErr::UnexpectedEnd {
                    bit_index: self.bit_index,
                    buffer_bits: self.buffer.len() * 8,
                });
            };
            self.bit_index += 8;
            return Ok(*byte);
        }

        let mut output = 0u8;
        for index in 0..8 {
            if self.read_bit()? {
                output |= 1 << index;
            }
        }
        Ok(output)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, SerdeErr> {
        let mut output = Vec::with_capacity(count);
        for _ in 0..count {
            output.push(self.read_byte()?);
        }
        Ok(output)
    }

    pub fn bits_read(&self) -> usize {
        self.bit_index
    }

    pub fn bits_remaining(&self) -> usize {
        (self.buffer.len() * 8).saturating_sub(self.bit_index)
    }
}

/// A BitReader that owns its buffer, handy when a payload has to outlive the
/// packet it arrived in.
pub struct OwnedBitReader {
    buffer: Box<[u8]>,
}

impl OwnedBitReader {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            buffer: bytes.into(),
        }
    }

    pub fn borrow(&self) -> BitReader<'_> {
        BitReader::new(&self.buffer)
    }

    pub fn take_buffer(self) -> Box<[u8]> {
        self.buffer
    }
}
