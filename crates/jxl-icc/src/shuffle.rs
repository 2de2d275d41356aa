//! Byte interleaving for 16- and 32-bit sample payloads.

/// Interleaves `data` as `width` planes read in parallel: output position
/// `i` takes the input byte `height = ceil(len / width)` positions further,
/// wrapping into the next starting column at the end. This is the decode
/// direction; it is not its own inverse.
pub fn shuffle(data: &mut [u8], width: usize) {
    debug_assert!(width > 0);
    let size = data.len();
    let height = (size + width - 1) / width;
    let tmp = data.to_vec();
    let mut s = 0usize;
    let mut j = 0usize;
    for b in data.iter_mut() {
        *b = tmp[j];
        j += height;
        if j >= size {
            s += 1;
            j = s;
        }
    }
}

/// Exact inverse of [`shuffle`]; the encode direction.
pub fn unshuffle(data: &mut [u8], width: usize) {
    debug_assert!(width > 0);
    let size = data.len();
    let height = (size + width - 1) / width;
    let tmp = data.to_vec();
    let mut s = 0usize;
    let mut j = 0usize;
    for &b in &tmp {
        data[j] = b;
        j += height;
        if j >= size {
            s += 1;
            j = s;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle2_interleaves() {
        let mut data = *b"aabbccAABBCC";
        shuffle(&mut data, 2);
        assert_eq!(&data, b"aAaAbBbBcCcC");
    }

    #[test]
    fn odd_length() {
        let mut data = [0u8, 1, 2, 3, 4];
        shuffle(&mut data, 2);
        assert_eq!(data, [0, 3, 1, 4, 2]);
        unshuffle(&mut data, 2);
        assert_eq!(data, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn round_trip_any_width() {
        for width in 1..=6 {
            for len in 0..40 {
                let original = (0..len as u8).collect::<Vec<_>>();
                let mut data = original.clone();
                unshuffle(&mut data, width);
                shuffle(&mut data, width);
                assert_eq!(data, original, "width {} len {}", width, len);
            }
        }
    }

    #[test]
    fn width_larger_than_input_is_identity() {
        let mut data = [1u8, 2, 3];
        shuffle(&mut data, 4);
        assert_eq!(data, [1, 2, 3]);
    }
}
