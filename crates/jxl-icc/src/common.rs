//! Structural model shared by the ICC predict and unpredict transforms.

use crate::{Error, Result};

pub(crate) const ICC_HEADER_SIZE: usize = 128;

// Maximum ICC output size for conformance level 10; also caps the encoded
// stream so that a bogus size field cannot trigger a huge allocation.
pub(crate) const MAX_ICC_SIZE: u64 = 1 << 28;

pub(crate) const COMMAND_TAG_UNKNOWN: u8 = 1;
pub(crate) const COMMAND_TAG_TRC: u8 = 2;
pub(crate) const COMMAND_TAG_XYZ: u8 = 3;
pub(crate) const COMMAND_TAG_STRING_FIRST: u8 = 4;
pub(crate) const FLAG_BIT_OFFSET: u8 = 64;
pub(crate) const FLAG_BIT_SIZE: u8 = 128;

pub(crate) const COMMAND_INSERT: u8 = 1;
pub(crate) const COMMAND_SHUFFLE2: u8 = 2;
pub(crate) const COMMAND_SHUFFLE4: u8 = 3;
pub(crate) const COMMAND_PREDICT: u8 = 4;
pub(crate) const COMMAND_XYZ: u8 = 10;
pub(crate) const COMMAND_TYPE_START_FIRST: u8 = 16;

/// Tag signatures reachable with a single command byte. The first two
/// entries double as the TRC and XYZ triple shorthands (tagcodes 2 and 3);
/// plain `rXYZ` and `rTRC` appear again further in.
pub(crate) const COMMON_TAGS: [&[u8; 4]; 19] = [
    b"rTRC", b"rXYZ", b"cprt", b"wtpt", b"bkpt", b"rXYZ", b"gXYZ", b"bXYZ", b"kXYZ", b"rTRC",
    b"gTRC", b"bTRC", b"kTRC", b"chad", b"desc", b"chrm", b"dmnd", b"dmdd", b"lumi",
];

/// Tag data type signatures reachable with commands 16..24. Each one stands
/// for the signature followed by four reserved zero bytes.
pub(crate) const COMMON_DATA: [&[u8; 4]; 8] = [
    b"XYZ ", b"desc", b"text", b"mluc", b"para", b"curv", b"sf32", b"gbd ",
];

/// Tags whose size defaults to 20 bytes instead of the carried-over size.
pub(crate) fn tag_size_defaults_to_20(tag: &[u8; 4]) -> bool {
    matches!(
        tag,
        b"rXYZ" | b"gXYZ" | b"bXYZ" | b"kXYZ" | b"wtpt" | b"bkpt" | b"lumi"
    )
}

pub(crate) fn check_is_32bit(v: u64) -> Result<()> {
    if v >> 32 != 0 {
        Err(Error::InvalidIccStream("value does not fit in 32 bits"))
    } else {
        Ok(())
    }
}

pub(crate) fn check_out_of_bounds(pos: u64, need: u64, size: u64) -> Result<()> {
    let end = pos
        .checked_add(need)
        .ok_or(Error::InvalidIccStream("out of bounds"))?;
    if end > size {
        Err(Error::InvalidIccStream("out of bounds"))
    } else {
        Ok(())
    }
}

/// Predicts a header byte from its position, the profile size and the
/// already reconstructed prefix. Every inspected prefix byte has prediction
/// zero, so the encoder can evaluate this on the original profile.
pub(crate) fn predict_header(idx: usize, output_size: u32, header: &[u8]) -> u8 {
    match idx {
        0..=3 => output_size.to_be_bytes()[idx],
        8 => 4,
        12..=23 => b"mntrRGB XYZ "[idx - 12],
        36..=39 => b"acsp"[idx - 36],
        // APPL
        41 | 42 if header[40] == b'A' => b'P',
        43 if header[40] == b'A' => b'L',
        // MSFT
        41 if header[40] == b'M' => b'S',
        42 if header[40] == b'M' => b'F',
        43 if header[40] == b'M' => b'T',
        // SGI_
        42 if header[40] == b'S' && header[41] == b'G' => b'I',
        43 if header[40] == b'S' && header[41] == b'G' => b' ',
        // SUNW
        42 if header[40] == b'S' && header[41] == b'U' => b'N',
        43 if header[40] == b'S' && header[41] == b'U' => b'W',
        70 => 246,
        71 => 214,
        73 => 1,
        78 => 211,
        79 => 45,
        80..=83 => header[4 + idx - 80],
        _ => 0,
    }
}

/// Extrapolates the next `width`-byte big-endian sample from up to three
/// prior samples spaced `stride` bytes apart. The caller guarantees
/// `out.len() > stride * 4`.
pub(crate) fn predict_value(out: &[u8], stride: usize, width: usize, order: u8) -> u32 {
    let mut prev = [0u32; 3];
    for (j, p) in prev[..=order as usize].iter_mut().enumerate() {
        let offset = out.len() - stride * (j + 1);
        let mut bytes = [0u8; 4];
        bytes[(4 - width)..].copy_from_slice(&out[offset..][..width]);
        *p = u32::from_be_bytes(bytes);
    }
    match order {
        0 => prev[0],
        1 => prev[0].wrapping_mul(2).wrapping_sub(prev[1]),
        _ => prev[0]
            .wrapping_mul(3)
            .wrapping_sub(prev[1].wrapping_mul(3))
            .wrapping_add(prev[2]),
    }
}

/// Number of entropy contexts of the encoded ICC byte stream.
pub(crate) const NUM_ICC_CONTEXTS: u32 = 41;

/// Context of an encoded ICC byte, from its position and the two bytes
/// before it. Header bytes all share context 0.
pub(crate) fn get_icc_ctx(idx: usize, b1: u8, b2: u8) -> u32 {
    if idx <= ICC_HEADER_SIZE {
        return 0;
    }

    let p1 = match b1 {
        b'a'..=b'z' | b'A'..=b'Z' => 0,
        b'0'..=b'9' | b'.' | b',' => 1,
        0..=1 => 2 + b1 as u32,
        2..=15 => 4,
        241..=254 => 5,
        255 => 6,
        _ => 7,
    };
    let p2 = match b2 {
        b'a'..=b'z' | b'A'..=b'Z' => 0,
        b'0'..=b'9' | b'.' | b',' => 1,
        0..=15 => 2,
        241..=255 => 3,
        _ => 4,
    };

    1 + p1 + 8 * p2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_range() {
        for idx in [0, 64, 128, 129, 4096] {
            for b1 in [0u8, 1, 7, b'a', b'Z', b'5', b'.', 200, 250, 255] {
                for b2 in [0u8, 15, b'q', b'9', 240, 241, 255] {
                    let ctx = get_icc_ctx(idx, b1, b2);
                    assert!(ctx < NUM_ICC_CONTEXTS);
                    if idx <= 128 {
                        assert_eq!(ctx, 0);
                    }
                }
            }
        }
    }

    #[test]
    fn header_prediction_fixed_bytes() {
        let header = [0u8; 128];
        assert_eq!(predict_header(0, 0x1234, &header), 0);
        assert_eq!(predict_header(2, 0x1234, &header), 0x12);
        assert_eq!(predict_header(3, 0x1234, &header), 0x34);
        assert_eq!(predict_header(8, 0, &header), 4);
        assert_eq!(predict_header(12, 0, &header), b'm');
        assert_eq!(predict_header(36, 0, &header), b'a');
        assert_eq!(predict_header(70, 0, &header), 246);
        assert_eq!(predict_header(127, 0, &header), 0);
    }

    #[test]
    fn header_prediction_platform() {
        let mut header = [0u8; 128];
        header[40] = b'A';
        assert_eq!(predict_header(41, 0, &header), b'P');
        assert_eq!(predict_header(43, 0, &header), b'L');
        header[40] = b'S';
        header[41] = b'U';
        assert_eq!(predict_header(42, 0, &header), b'N');
        assert_eq!(predict_header(43, 0, &header), b'W');
    }

    #[test]
    fn linear_prediction_orders() {
        let out = [0u8, 0, 0, 0, 0, 10, 0, 14];
        assert_eq!(predict_value(&out, 2, 2, 0), 14);
        assert_eq!(predict_value(&out, 2, 2, 1), 18);
        let out = [0u8, 2, 0, 6, 0, 14];
        assert_eq!(predict_value(&out, 2, 2, 2), 26);
    }
}
