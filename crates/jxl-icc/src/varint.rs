//! Little-endian base-128 varint used by the command and data streams.

/// Decodes a varint starting at `*pos`, reading at most 10 groups of 7 bits.
///
/// Truncated input yields the bits accumulated so far. `*pos` advances one
/// past the last byte examined, also when the value ends at the buffer
/// boundary; callers bound-check `*pos` rather than rely on it.
pub fn decode_varint(data: &[u8], pos: &mut usize) -> u64 {
    let mut value = 0u64;
    let mut i = 0;
    while *pos + i < data.len() && i < 10 {
        let b = data[*pos + i];
        value |= ((b & 0x7f) as u64) << (7 * i);
        if b & 0x80 == 0 {
            break;
        }
        i += 1;
    }
    *pos += i + 1;
    value
}

/// Appends `value` as a varint.
pub fn encode_varint(value: u64, out: &mut Vec<u8>) {
    let mut value = value;
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}
