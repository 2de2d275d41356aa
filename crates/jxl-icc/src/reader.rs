//! Streaming reader of entropy-coded ICC streams.

use jxl_bitio::Bitstream;
use jxl_entropy::Decoder;

use crate::common::{get_icc_ctx, MAX_ICC_SIZE, NUM_ICC_CONTEXTS};
use crate::decode::{check_preamble, unpredict_icc};
use crate::{Error, Result};

/// Enough decoded bytes to hold the two size varints.
const PREAMBLE_SIZE: u64 = 22;

const CHECKPOINT_INTERVAL: usize = 512;
const CORRUPTION_CHECK_INTERVAL: usize = 0x10000;

/// Decodes an entropy-coded ICC stream incrementally.
///
/// The reader survives truncated input: when a read hits the end of the
/// bitstream it rolls back to the last checkpoint and returns an error for
/// which [`Error::unexpected_eof`] is true. Calling [`init`] and
/// [`process`] again with a bitstream holding more data resumes from that
/// checkpoint. Decoding a truncated stream consumes the same bits as
/// decoding the full one up to the point of failure, so no partially
/// decoded byte is ever wrong, only missing.
///
/// [`init`]: Self::init
/// [`process`]: Self::process
#[derive(Debug, Default)]
pub struct IccReader {
    enc_size: u64,
    decoder: Option<Decoder>,
    decompressed: Vec<u8>,
    i: usize,
    bits_to_skip: usize,
    used_bits_base: usize,
}

impl IccReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the stream header and the preamble, or skips already-consumed
    /// bits when resuming.
    ///
    /// `bitstream` must start at the same position as in the previous
    /// attempt.
    pub fn init(&mut self, bitstream: &mut Bitstream) -> Result<()> {
        self.used_bits_base = bitstream.num_read_bits();
        if self.bits_to_skip > 0 {
            bitstream.skip_bits(self.bits_to_skip)?;
            return Ok(());
        }

        let enc_size = bitstream.read_u64()?;
        if enc_size > MAX_ICC_SIZE {
            return Err(Error::ProfileTooLarge { size: enc_size });
        }
        tracing::trace!(enc_size, "Reading ICC stream");

        let mut decoder = Decoder::parse(bitstream, NUM_ICC_CONTEXTS)?;
        decoder.begin(bitstream)?;

        let preamble_len = enc_size.min(PREAMBLE_SIZE) as usize;
        let mut decompressed = Vec::with_capacity(preamble_len);
        let mut b1 = 0u8;
        let mut b2 = 0u8;
        for idx in 0..preamble_len {
            let sym = decoder.read_varint(bitstream, get_icc_ctx(idx, b1, b2))?;
            if sym >= 256 {
                return Err(Error::InvalidIccStream("decoded symbol out of range"));
            }
            decompressed.push(sym as u8);
            b2 = b1;
            b1 = sym as u8;
        }
        if enc_size > PREAMBLE_SIZE {
            check_preamble(&decompressed, enc_size)?;
        }

        self.enc_size = enc_size;
        self.decoder = Some(decoder);
        self.decompressed = decompressed;
        self.i = preamble_len;
        self.bits_to_skip = bitstream.num_read_bits() - self.used_bits_base;
        Ok(())
    }

    /// Decodes the remaining bytes and reconstructs the profile.
    pub fn process(&mut self, bitstream: &mut Bitstream) -> Result<Vec<u8>> {
        let Some(decoder) = &mut self.decoder else {
            return Err(Error::InvalidIccStream("reader is not initialized"));
        };
        let enc_size = self.enc_size as usize;

        let mut b1 = self.decompressed.last().copied().unwrap_or(0);
        let mut b2 = if self.decompressed.len() >= 2 {
            self.decompressed[self.decompressed.len() - 2]
        } else {
            0
        };

        let mut checkpoint = decoder.save();
        let mut checkpoint_i = self.i;
        let mut checkpoint_bits = self.bits_to_skip;

        while self.i < enc_size {
            if self.decompressed.len() == self.decompressed.capacity() {
                // Grow in 1 KiB steps; enc_size is untrusted until the
                // stream actually delivers that many bytes.
                let chunk = (enc_size - self.i).min(0x400);
                self.decompressed.reserve_exact(chunk);
            }
            if self.i % CHECKPOINT_INTERVAL == 0 {
                checkpoint = decoder.save();
                checkpoint_i = self.i;
                checkpoint_bits = bitstream.num_read_bits() - self.used_bits_base;
            }
            if self.i % CORRUPTION_CHECK_INTERVAL == 0 {
                // A valid stream cannot expand a consumed byte into more
                // than 256 output bytes; way past that means the size field
                // itself is corrupt.
                let used_bytes = (bitstream.num_read_bits() - self.used_bits_base) / 8;
                if self.i > used_bytes * 256 {
                    return Err(Error::InvalidIccStream("corrupted stream"));
                }
            }

            let ctx = get_icc_ctx(self.i, b1, b2);
            let sym = match decoder.read_varint(bitstream, ctx) {
                Ok(sym) => sym,
                Err(err) => {
                    if err.unexpected_eof() {
                        decoder.restore(checkpoint);
                        self.decompressed.truncate(checkpoint_i);
                        self.i = checkpoint_i;
                        self.bits_to_skip = checkpoint_bits;
                    }
                    return Err(err.into());
                },
            };
            if sym >= 256 {
                return Err(Error::InvalidIccStream("decoded symbol out of range"));
            }
            self.decompressed.push(sym as u8);
            b2 = b1;
            b1 = sym as u8;
            self.i += 1;
        }

        decoder.finalize()?;
        unpredict_icc(&self.decompressed)
    }
}

/// Reads a complete entropy-coded ICC stream from `bitstream`.
pub fn read_icc(bitstream: &mut Bitstream) -> Result<Vec<u8>> {
    let mut reader = IccReader::new();
    reader.init(bitstream)?;
    reader.process(bitstream)
}
