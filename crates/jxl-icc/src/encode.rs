//! Prediction transform of an ICC profile, the inverse of
//! [`unpredict_icc`].
//!
//! [`unpredict_icc`]: crate::unpredict_icc

use jxl_bitio::BitWriter;
use jxl_entropy::Encoder;

use crate::common::{
    check_is_32bit, get_icc_ctx, predict_header, predict_value, tag_size_defaults_to_20,
    COMMAND_INSERT, COMMAND_PREDICT, COMMAND_SHUFFLE2, COMMAND_TAG_STRING_FIRST, COMMAND_TAG_TRC,
    COMMAND_TAG_UNKNOWN, COMMAND_TAG_XYZ, COMMAND_TYPE_START_FIRST, COMMAND_XYZ, COMMON_DATA,
    COMMON_TAGS, FLAG_BIT_OFFSET, FLAG_BIT_SIZE, ICC_HEADER_SIZE, MAX_ICC_SIZE, NUM_ICC_CONTEXTS,
};
use crate::shuffle::unshuffle;
use crate::varint::encode_varint;
use crate::{Error, Result};

fn read_u32_be(data: &[u8], pos: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[pos..pos + 4]);
    u32::from_be_bytes(bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TagEntry {
    sig: [u8; 4],
    start: u64,
    size: u64,
}

#[derive(Default)]
struct IccEncoder {
    commands: Vec<u8>,
    data: Vec<u8>,
    literal: Vec<u8>,
}

impl IccEncoder {
    /// Turns the pending literal bytes into an insert command. Every other
    /// command emission goes through this first so that the data stream
    /// stays in command order.
    fn flush_literal(&mut self) {
        if self.literal.is_empty() {
            return;
        }
        self.commands.push(COMMAND_INSERT);
        encode_varint(self.literal.len() as u64, &mut self.commands);
        self.data.append(&mut self.literal);
    }

    /// Emits a predict command over `icc[start..start + num]` with the
    /// implicit stride. The caller guarantees `width * 4 < start`.
    fn emit_predict(&mut self, icc: &[u8], start: usize, num: usize, width: usize, order: u8) {
        self.flush_literal();
        self.commands.push(COMMAND_PREDICT);
        self.commands.push((width as u8 - 1) | (order << 2));
        encode_varint(num as u64, &mut self.commands);

        let mut residual = Vec::with_capacity(num);
        for i in (0..num).step_by(width) {
            let p = predict_value(&icc[..start + i], width, width, order);
            for j in 0..width.min(num - i) {
                residual.push(icc[start + i + j].wrapping_sub((p >> (8 * (width - 1 - j))) as u8));
            }
        }
        if width > 1 {
            unshuffle(&mut residual, width);
        }
        self.data.extend_from_slice(&residual);
    }

    /// Encodes the tag table, or a lone zero varint when the profile has no
    /// usable one. Returns the offset where the main content starts and the
    /// parsed entries.
    fn encode_tag_table(&mut self, icc: &[u8]) -> (usize, Vec<TagEntry>) {
        let len = icc.len() as u64;
        let table_start = ICC_HEADER_SIZE as u64;
        if len < table_start + 4 {
            encode_varint(0, &mut self.commands);
            return (ICC_HEADER_SIZE, Vec::new());
        }
        let num_tags = read_u32_be(icc, ICC_HEADER_SIZE) as u64;
        let entries_end = table_start + 4 + num_tags * 12;
        if entries_end > len {
            encode_varint(0, &mut self.commands);
            return (ICC_HEADER_SIZE, Vec::new());
        }

        let mut entries = Vec::with_capacity(num_tags as usize);
        for k in 0..num_tags as usize {
            let off = ICC_HEADER_SIZE + 4 + 12 * k;
            let mut sig = [0u8; 4];
            sig.copy_from_slice(&icc[off..off + 4]);
            entries.push(TagEntry {
                sig,
                start: read_u32_be(icc, off + 4) as u64,
                size: read_u32_be(icc, off + 8) as u64,
            });
        }

        encode_varint(num_tags + 1, &mut self.commands);

        let mut prev_tagstart = num_tags * 12 + ICC_HEADER_SIZE as u64;
        let mut prev_tagsize = 0u64;
        let mut k = 0usize;
        while k < entries.len() {
            let entry = entries[k];

            let is_trc_triple = entry.sig == *b"rTRC"
                && k + 2 < entries.len()
                && entries[k + 1]
                    == TagEntry {
                        sig: *b"gTRC",
                        ..entry
                    }
                && entries[k + 2]
                    == TagEntry {
                        sig: *b"bTRC",
                        ..entry
                    };
            let is_xyz_triple = entry.sig == *b"rXYZ"
                && k + 2 < entries.len()
                && entry.start + entry.size * 2 <= u32::MAX as u64
                && entries[k + 1]
                    == TagEntry {
                        sig: *b"gXYZ",
                        start: entry.start + entry.size,
                        ..entry
                    }
                && entries[k + 2]
                    == TagEntry {
                        sig: *b"bXYZ",
                        start: entry.start + entry.size * 2,
                        ..entry
                    };

            let tagcode = if is_trc_triple {
                COMMAND_TAG_TRC
            } else if is_xyz_triple {
                COMMAND_TAG_XYZ
            } else if let Some(idx) = COMMON_TAGS[2..].iter().position(|tag| **tag == entry.sig) {
                idx as u8 + COMMAND_TAG_STRING_FIRST
            } else {
                COMMAND_TAG_UNKNOWN
            };

            let mut command = tagcode;
            if entry.start != prev_tagstart + prev_tagsize {
                command |= FLAG_BIT_OFFSET;
            }
            let default_size = if tag_size_defaults_to_20(&entry.sig) {
                20
            } else {
                prev_tagsize
            };
            if entry.size != default_size {
                command |= FLAG_BIT_SIZE;
            }

            self.commands.push(command);
            if tagcode == COMMAND_TAG_UNKNOWN {
                self.data.extend_from_slice(&entry.sig);
            }
            if command & FLAG_BIT_OFFSET != 0 {
                encode_varint(entry.start, &mut self.commands);
            }
            if command & FLAG_BIT_SIZE != 0 {
                encode_varint(entry.size, &mut self.commands);
            }

            prev_tagstart = entry.start;
            prev_tagsize = entry.size;
            k += if is_trc_triple || is_xyz_triple { 3 } else { 1 };
        }
        self.commands.push(0);

        (entries_end as usize, entries)
    }

    /// Encodes everything after the tag table, treating each tag's data
    /// block with its type-specific strategy and the gaps as literals.
    fn encode_main(&mut self, icc: &[u8], main_start: usize, entries: &[TagEntry]) {
        let len = icc.len();
        let mut blocks = entries
            .iter()
            .filter(|entry| {
                entry.start >= main_start as u64
                    && entry.size > 0
                    && entry.start + entry.size <= len as u64
            })
            .map(|entry| (entry.start as usize, entry.size as usize))
            .collect::<Vec<_>>();
        blocks.sort_unstable();

        let mut pos = main_start;
        for (start, size) in blocks {
            if start < pos {
                // Shares bytes with an already-encoded block.
                continue;
            }
            self.literal.extend_from_slice(&icc[pos..start]);
            self.encode_tag_payload(icc, start, size);
            pos = start + size;
        }
        self.literal.extend_from_slice(&icc[pos..]);
        self.flush_literal();
    }

    fn encode_tag_payload(&mut self, icc: &[u8], start: usize, size: usize) {
        let block = &icc[start..start + size];
        if size < 8 || block[4..8] != [0, 0, 0, 0] {
            self.literal.extend_from_slice(block);
            return;
        }
        let type_sig: [u8; 4] = block[..4].try_into().unwrap_or_default();

        if type_sig == *b"XYZ " && size == 20 {
            self.flush_literal();
            self.commands.push(COMMAND_XYZ);
            self.data.extend_from_slice(&block[8..20]);
            return;
        }

        let Some(idx) = COMMON_DATA.iter().position(|sig| **sig == type_sig) else {
            self.literal.extend_from_slice(block);
            return;
        };
        self.flush_literal();
        self.commands.push(COMMAND_TYPE_START_FIRST + idx as u8);

        match &type_sig {
            b"curv" if size >= 12 => {
                let count = read_u32_be(block, 8) as u64;
                if count > 0 && size as u64 == 12 + count * 2 {
                    // Keep the sample count literal, predict the 16-bit
                    // samples linearly.
                    self.commands.push(COMMAND_INSERT);
                    encode_varint(4, &mut self.commands);
                    self.data.extend_from_slice(&block[8..12]);
                    self.emit_predict(icc, start + 12, size - 12, 2, 1);
                } else {
                    self.literal.extend_from_slice(&block[8..]);
                }
            },
            b"mluc" if size > 8 => {
                self.commands.push(COMMAND_SHUFFLE2);
                encode_varint(size as u64 - 8, &mut self.commands);
                let mut bytes = block[8..].to_vec();
                unshuffle(&mut bytes, 2);
                self.data.extend_from_slice(&bytes);
            },
            b"sf32" if size > 8 && (size - 8) % 4 == 0 => {
                self.emit_predict(icc, start + 8, size - 8, 4, 1);
            },
            _ => {
                self.literal.extend_from_slice(&block[8..]);
            },
        }
    }

    fn finish(mut self, osize: u64) -> Vec<u8> {
        self.flush_literal();
        let mut enc = Vec::with_capacity(self.commands.len() + self.data.len() + 8);
        encode_varint(osize, &mut enc);
        encode_varint(self.commands.len() as u64, &mut enc);
        enc.extend_from_slice(&self.commands);
        enc.extend_from_slice(&self.data);
        enc
    }
}

/// Transforms an ICC profile into the predicted command and data streams.
///
/// [`unpredict_icc`] reconstructs the exact input. The transform itself
/// does not compress; it rewrites the profile so that the byte stream
/// becomes highly compressible by the entropy coder.
///
/// [`unpredict_icc`]: crate::unpredict_icc
pub fn predict_icc(icc: &[u8]) -> Result<Vec<u8>> {
    let osize = icc.len() as u64;
    check_is_32bit(osize)?;
    if osize > MAX_ICC_SIZE {
        return Err(Error::ProfileTooLarge { size: osize });
    }

    let mut enc = IccEncoder::default();
    for (i, &b) in icc.iter().take(ICC_HEADER_SIZE).enumerate() {
        let p = predict_header(i, osize as u32, icc);
        enc.data.push(b.wrapping_sub(p));
    }
    if icc.len() > ICC_HEADER_SIZE {
        let (main_start, entries) = enc.encode_tag_table(icc);
        enc.encode_main(icc, main_start, &entries);
    }
    Ok(enc.finish(osize))
}

/// Predicts and entropy-codes an ICC profile into `writer`.
///
/// The output starts with the encoded size as a `U64` field, followed by
/// the entropy-coded stream that [`IccReader`] decodes.
///
/// [`IccReader`]: crate::IccReader
pub fn encode_icc(icc: &[u8], writer: &mut BitWriter) -> Result<()> {
    let enc = predict_icc(icc)?;
    writer.write_u64(enc.len() as u64);

    let mut encoder = Encoder::new(NUM_ICC_CONTEXTS);
    let mut b1 = 0u8;
    let mut b2 = 0u8;
    for (idx, &b) in enc.iter().enumerate() {
        encoder.token(get_icc_ctx(idx, b1, b2), b as u32);
        b2 = b1;
        b1 = b;
    }
    encoder.finish(writer);
    Ok(())
}
