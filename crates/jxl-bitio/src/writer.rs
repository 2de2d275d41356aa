/// Bitstream writer collecting bits LSB-first into an owned buffer.
///
/// The bit layout mirrors [`Bitstream`](crate::Bitstream): the first bit
/// written lands in the lowest bit of the first byte.
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    buf: u64,
    buf_bits: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of bits written so far.
    #[inline]
    pub fn num_written_bits(&self) -> usize {
        self.bytes.len() * 8 + self.buf_bits
    }

    /// Writes the lowest `n` bits of `value`.
    #[inline]
    pub fn write_bits(&mut self, value: u64, n: usize) {
        debug_assert!(n <= 56);
        self.buf |= (value & ((1u64 << n) - 1)) << self.buf_bits;
        self.buf_bits += n;
        while self.buf_bits >= 8 {
            self.bytes.push(self.buf as u8);
            self.buf >>= 8;
            self.buf_bits -= 8;
        }
    }

    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.write_bits(value as u64, 1);
    }

    /// Writes an `U64` as defined in the JPEG XL specification.
    pub fn write_u64(&mut self, value: u64) {
        match value {
            0 => self.write_bits(0, 2),
            1..=16 => {
                self.write_bits(1, 2);
                self.write_bits(value - 1, 4);
            },
            17..=272 => {
                self.write_bits(2, 2);
                self.write_bits(value - 17, 8);
            },
            _ => {
                self.write_bits(3, 2);
                self.write_bits(value, 12);
                let mut shift = 12u32;
                loop {
                    if value >> shift == 0 {
                        self.write_bits(0, 1);
                        break;
                    }
                    self.write_bits(1, 1);
                    if shift == 60 {
                        self.write_bits(value >> shift, 4);
                        break;
                    }
                    self.write_bits(value >> shift, 8);
                    shift += 8;
                }
            },
        }
    }

    /// Pads the stream with zero bits up to the next byte boundary.
    pub fn zero_pad_to_byte(&mut self) {
        if self.buf_bits > 0 {
            self.write_bits(0, 8 - self.buf_bits);
        }
    }

    /// Finalizes the stream, padding the last partial byte with zeros.
    pub fn finish(mut self) -> Vec<u8> {
        if self.buf_bits > 0 {
            self.bytes.push(self.buf as u8);
        }
        self.bytes
    }
}
