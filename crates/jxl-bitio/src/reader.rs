use crate::{Error, Result};

/// Bitstream reader over a borrowed in-memory buffer.
///
/// Bits are read LSB-first within each byte. The reader keeps a bit cursor
/// into the buffer rather than consuming the slice, so cloning it snapshots
/// a position. Reads are eager: a read that would cross the end of the
/// buffer fails with `UnexpectedEof` and consumes nothing, so everything
/// decoded before the failure is a faithful prefix of what the full stream
/// would decode to.
#[derive(Debug, Clone)]
pub struct Bitstream<'buf> {
    bytes: &'buf [u8],
    pos: usize,
}

impl<'buf> Bitstream<'buf> {
    #[inline]
    pub fn new(bytes: &'buf [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Returns the number of bits that are read or skipped.
    #[inline]
    pub fn num_read_bits(&self) -> usize {
        self.pos
    }

    #[inline]
    fn remaining_bits(&self) -> usize {
        self.bytes.len() * 8 - self.pos
    }

    #[cold]
    fn eof() -> Error {
        Error::Io(std::io::ErrorKind::UnexpectedEof.into())
    }

    /// Reads `n` bits, `n <= 32`.
    #[inline]
    pub fn read_bits(&mut self, n: usize) -> Result<u32> {
        debug_assert!(n <= 32);
        if n > self.remaining_bits() {
            return Err(Self::eof());
        }

        let base = self.pos >> 3;
        let shift = self.pos & 7;
        // shift + n <= 39, so the read spans at most five bytes.
        let mut window = 0u64;
        let num_bytes = (shift + n + 7) >> 3;
        for (idx, &b) in self.bytes[base..].iter().take(num_bytes).enumerate() {
            window |= (b as u64) << (idx * 8);
        }
        self.pos += n;
        Ok(((window >> shift) & ((1u64 << n) - 1)) as u32)
    }

    /// Reads a `Bool` as defined in the JPEG XL specification.
    #[inline]
    pub fn read_bool(&mut self) -> Result<bool> {
        self.read_bits(1).map(|x| x != 0)
    }

    /// Advances the cursor by `n` bits without decoding them.
    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        if n > self.remaining_bits() {
            return Err(Self::eof());
        }
        self.pos += n;
        Ok(())
    }

    /// Performs `ZeroPadToByte` as defined in the JPEG XL specification.
    pub fn zero_pad_to_byte(&mut self) -> Result<()> {
        let n = (8 - (self.pos & 7)) & 7;
        if self.read_bits(n)? != 0 {
            Err(Error::NonZeroPadding)
        } else {
            Ok(())
        }
    }

    /// Reads an `U64` as defined in the JPEG XL specification.
    pub fn read_u64(&mut self) -> Result<u64> {
        match self.read_bits(2)? {
            0 => Ok(0),
            1 => Ok(self.read_bits(4)? as u64 + 1),
            2 => Ok(self.read_bits(8)? as u64 + 17),
            _ => {
                let mut value = self.read_bits(12)? as u64;
                let mut shift = 12;
                while self.read_bool()? {
                    if shift == 60 {
                        value |= (self.read_bits(4)? as u64) << shift;
                        break;
                    }
                    value |= (self.read_bits(8)? as u64) << shift;
                    shift += 8;
                }
                Ok(value)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_lsb_first() {
        let mut bitstream = Bitstream::new(&[0b10101010, 0b11001100]);
        assert_eq!(bitstream.read_bits(4).unwrap(), 0b1010);
        assert_eq!(bitstream.read_bits(4).unwrap(), 0b1010);
        assert_eq!(bitstream.read_bits(8).unwrap(), 0b11001100);
        assert_eq!(bitstream.num_read_bits(), 16);
        assert!(bitstream.read_bits(1).unwrap_err().unexpected_eof());
    }

    #[test]
    fn unaligned_wide_read() {
        let bytes = [0x31u8, 0x41, 0x59, 0x26, 0x53];
        let mut bitstream = Bitstream::new(&bytes);
        bitstream.read_bits(3).unwrap();
        let expected = (u64::from_le_bytes([0x31, 0x41, 0x59, 0x26, 0x53, 0, 0, 0]) >> 3) as u32;
        assert_eq!(bitstream.read_bits(32).unwrap(), expected);
    }

    #[test]
    fn eof_consumes_nothing() {
        let mut bitstream = Bitstream::new(&[0xff]);
        assert_eq!(bitstream.read_bits(4).unwrap(), 0xf);
        assert!(bitstream.read_bits(16).unwrap_err().unexpected_eof());
        assert_eq!(bitstream.read_bits(4).unwrap(), 0xf);
    }

    #[test]
    fn skip_across_buffer() {
        let bytes = (0u8..64).collect::<Vec<_>>();
        let mut bitstream = Bitstream::new(&bytes);
        bitstream.read_bits(7).unwrap();
        bitstream.skip_bits(401).unwrap();
        assert_eq!(bitstream.num_read_bits(), 408);
        assert_eq!(bitstream.read_bits(8).unwrap(), 51);
    }

    #[test]
    fn skip_past_end_rejected() {
        let mut bitstream = Bitstream::new(&[0x00, 0x00]);
        bitstream.read_bits(5).unwrap();
        assert!(bitstream.skip_bits(12).unwrap_err().unexpected_eof());
        assert_eq!(bitstream.num_read_bits(), 5);
        bitstream.skip_bits(11).unwrap();
    }
}
