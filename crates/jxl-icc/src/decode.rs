//! Reconstruction of an ICC profile from its predicted form.

use crate::common::{
    check_is_32bit, check_out_of_bounds, predict_header, predict_value, tag_size_defaults_to_20,
    COMMAND_INSERT, COMMAND_PREDICT, COMMAND_SHUFFLE2, COMMAND_SHUFFLE4, COMMAND_TAG_TRC,
    COMMAND_TAG_UNKNOWN, COMMAND_TAG_XYZ, COMMAND_TYPE_START_FIRST, COMMAND_XYZ, COMMON_DATA,
    COMMON_TAGS, ICC_HEADER_SIZE, MAX_ICC_SIZE,
};
use crate::shuffle::shuffle;
use crate::varint::decode_varint;
use crate::{Error, Result};

fn append_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Validates the first bytes of an encoded ICC stream before the rest has
/// been decoded.
///
/// `data` holds the decoded preamble (at least the two size varints);
/// `enc_size` is the full encoded size. Catches wrong-size streams early so
/// a streaming decoder does not process megabytes before failing.
pub fn check_preamble(data: &[u8], enc_size: u64) -> Result<()> {
    let mut pos = 0usize;
    let osize = decode_varint(data, &mut pos);
    check_is_32bit(osize)?;
    if pos >= data.len() {
        return Err(Error::InvalidIccStream("out of bounds"));
    }
    let csize = decode_varint(data, &mut pos);
    check_is_32bit(csize)?;
    check_out_of_bounds(pos as u64, csize, enc_size)?;
    if osize > MAX_ICC_SIZE {
        return Err(Error::ProfileTooLarge { size: osize });
    }
    if osize + 65536 < enc_size {
        return Err(Error::InvalidIccStream(
            "reported output size is far smaller than encoded size",
        ));
    }
    Ok(())
}

/// Reconstructs an ICC profile from the predicted stream `enc`.
///
/// The stream is `varint(output_size)`, `varint(commands_size)`, the
/// command stream, then the data stream. Decoding must consume both streams
/// exactly and produce exactly `output_size` bytes, otherwise the stream is
/// rejected.
pub fn unpredict_icc(enc: &[u8]) -> Result<Vec<u8>> {
    let size = enc.len();
    let mut pos = 0usize;

    check_out_of_bounds(pos as u64, 1, size as u64)?;
    let osize = decode_varint(enc, &mut pos);
    check_is_32bit(osize)?;
    if osize > MAX_ICC_SIZE {
        return Err(Error::ProfileTooLarge { size: osize });
    }
    check_out_of_bounds(pos as u64, 1, size as u64)?;
    let csize = decode_varint(enc, &mut pos);
    check_is_32bit(csize)?;
    check_out_of_bounds(pos as u64, csize, size as u64)?;
    let mut cpos = pos;
    let commands_end = cpos + csize as usize;
    let mut pos = commands_end; // into the data stream

    let mut out = Vec::with_capacity(osize as usize);

    // Header
    for i in 0..=ICC_HEADER_SIZE {
        if out.len() as u64 == osize {
            if cpos != commands_end {
                return Err(Error::InvalidIccStream("not all commands used"));
            }
            if pos != size {
                return Err(Error::InvalidIccStream("not all data used"));
            }
            return Ok(out);
        }
        if i == ICC_HEADER_SIZE {
            break;
        }
        if pos >= size {
            return Err(Error::InvalidIccStream("out of bounds"));
        }
        let p = predict_header(i, osize as u32, &out);
        out.push(enc[pos].wrapping_add(p));
        pos += 1;
    }
    if cpos >= commands_end {
        return Err(Error::InvalidIccStream("out of bounds"));
    }

    // Tag table
    let v = decode_varint(enc, &mut cpos);
    if let Some(num_tags) = v.checked_sub(1) {
        check_is_32bit(num_tags)?;
        if (osize - ICC_HEADER_SIZE as u64) / 12 < num_tags {
            return Err(Error::InvalidIccStream("num_tags too large"));
        }
        let num_tags = num_tags as u32;
        append_u32(&mut out, num_tags);

        let mut prev_tagstart = num_tags as u64 * 12 + ICC_HEADER_SIZE as u64;
        let mut prev_tagsize = 0u64;

        loop {
            if out.len() as u64 > osize {
                return Err(Error::InvalidIccStream("invalid result size"));
            }
            // A varint near the end of the command stream may have run past
            // it into the data stream.
            if cpos > commands_end {
                return Err(Error::InvalidIccStream("out of bounds"));
            }
            if cpos == commands_end {
                break;
            }
            let command = enc[cpos];
            cpos += 1;
            let tagcode = command & 63;
            let tag: [u8; 4] = match tagcode {
                0 => break,
                COMMAND_TAG_UNKNOWN => {
                    check_out_of_bounds(pos as u64, 4, size as u64)?;
                    let tag = enc[pos..pos + 4].try_into().unwrap();
                    pos += 4;
                    tag
                },
                COMMAND_TAG_TRC => *b"rTRC",
                COMMAND_TAG_XYZ => *b"rXYZ",
                _ => **COMMON_TAGS
                    .get(tagcode as usize - 2)
                    .ok_or(Error::InvalidIccStream("unknown tagcode"))?,
            };

            let tagstart = if command & 64 == 0 {
                check_is_32bit(prev_tagstart)?;
                prev_tagstart + prev_tagsize
            } else {
                if cpos >= commands_end {
                    return Err(Error::InvalidIccStream("out of bounds"));
                }
                decode_varint(enc, &mut cpos)
            };
            check_is_32bit(tagstart)?;
            let tagsize = if command & 128 != 0 {
                if cpos >= commands_end {
                    return Err(Error::InvalidIccStream("out of bounds"));
                }
                decode_varint(enc, &mut cpos)
            } else if tag_size_defaults_to_20(&tag) {
                20
            } else {
                prev_tagsize
            };
            check_is_32bit(tagsize)?;

            prev_tagstart = tagstart;
            prev_tagsize = tagsize;

            out.extend_from_slice(&tag);
            append_u32(&mut out, tagstart as u32);
            append_u32(&mut out, tagsize as u32);
            if tagcode == COMMAND_TAG_TRC {
                for trc in [b"gTRC", b"bTRC"] {
                    out.extend_from_slice(trc);
                    append_u32(&mut out, tagstart as u32);
                    append_u32(&mut out, tagsize as u32);
                }
            } else if tagcode == COMMAND_TAG_XYZ {
                check_is_32bit(tagstart + tagsize * 2)?;
                for (i, xyz) in [b"gXYZ", b"bXYZ"].into_iter().enumerate() {
                    out.extend_from_slice(xyz);
                    append_u32(&mut out, (tagstart + tagsize * (i as u64 + 1)) as u32);
                    append_u32(&mut out, tagsize as u32);
                }
            }
        }
    }

    // Main content
    loop {
        if out.len() as u64 > osize {
            return Err(Error::InvalidIccStream("invalid result size"));
        }
        if cpos > commands_end {
            return Err(Error::InvalidIccStream("out of bounds"));
        }
        if cpos == commands_end {
            break;
        }
        let command = enc[cpos];
        cpos += 1;
        match command {
            COMMAND_INSERT | COMMAND_SHUFFLE2 | COMMAND_SHUFFLE4 => {
                if cpos >= commands_end {
                    return Err(Error::InvalidIccStream("out of bounds"));
                }
                let num = decode_varint(enc, &mut cpos);
                check_out_of_bounds(pos as u64, num, size as u64)?;
                let num = num as usize;
                if command == COMMAND_INSERT {
                    out.extend_from_slice(&enc[pos..pos + num]);
                } else {
                    let mut bytes = enc[pos..pos + num].to_vec();
                    shuffle(&mut bytes, if command == COMMAND_SHUFFLE2 { 2 } else { 4 });
                    out.extend_from_slice(&bytes);
                }
                pos += num;
            },
            COMMAND_PREDICT => {
                if cpos + 2 > commands_end {
                    return Err(Error::InvalidIccStream("out of bounds"));
                }
                let flags = enc[cpos];
                cpos += 1;

                let width = ((flags & 3) + 1) as usize;
                if width == 3 {
                    return Err(Error::InvalidIccStream("invalid predictor width"));
                }
                let order = (flags >> 2) & 3;
                if order == 3 {
                    return Err(Error::InvalidIccStream("invalid predictor order"));
                }

                let stride = if flags & 16 == 0 {
                    width as u64
                } else {
                    if cpos >= commands_end {
                        return Err(Error::InvalidIccStream("out of bounds"));
                    }
                    let stride = decode_varint(enc, &mut cpos);
                    if stride < width as u64 {
                        return Err(Error::InvalidIccStream("invalid stride"));
                    }
                    stride
                };
                if stride.saturating_mul(4) >= out.len() as u64 {
                    return Err(Error::InvalidIccStream("invalid stride"));
                }
                let stride = stride as usize;

                if cpos >= commands_end {
                    return Err(Error::InvalidIccStream("out of bounds"));
                }
                let num = decode_varint(enc, &mut cpos);
                check_out_of_bounds(pos as u64, num, size as u64)?;
                let num = num as usize;

                let mut residual = enc[pos..pos + num].to_vec();
                pos += num;
                if width > 1 {
                    shuffle(&mut residual, width);
                }

                for i in (0..num).step_by(width) {
                    let p = predict_value(&out, stride, width, order);
                    for j in 0..width.min(num - i) {
                        out.push(residual[i + j].wrapping_add((p >> (8 * (width - 1 - j))) as u8));
                    }
                }
            },
            COMMAND_XYZ => {
                check_out_of_bounds(pos as u64, 12, size as u64)?;
                out.extend_from_slice(b"XYZ \0\0\0\0");
                out.extend_from_slice(&enc[pos..pos + 12]);
                pos += 12;
            },
            _ => {
                let idx = command.wrapping_sub(COMMAND_TYPE_START_FIRST) as usize;
                let Some(type_sig) = COMMON_DATA.get(idx) else {
                    return Err(Error::InvalidIccStream("unknown command"));
                };
                out.extend_from_slice(*type_sig);
                out.extend_from_slice(&[0, 0, 0, 0]);
            },
        }
    }

    if pos != size {
        return Err(Error::InvalidIccStream("not all data used"));
    }
    if out.len() as u64 != osize {
        return Err(Error::InvalidIccStream("invalid result size"));
    }
    Ok(out)
}
