//! Bitstream primitives shared by the auxiliary-metadata codecs.
//!
//! [`Bitstream`] reads bits LSB-first from a borrowed byte slice, and
//! [`BitWriter`] produces the exact bit layout the reader consumes, so a
//! stream written by one side decodes on the other without any framing glue.
mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::Bitstream;
pub use writer::BitWriter;

/// Maps a non-negative integer onto a signed one, zigzag style.
#[inline]
pub fn unpack_signed(x: u32) -> i32 {
    let base = (x >> 1) as i32;
    if x & 1 == 0 { base } else { -base - 1 }
}

/// Inverse of [`unpack_signed`].
#[inline]
pub fn pack_signed(x: i32) -> u32 {
    if x >= 0 {
        (x as u32) << 1
    } else {
        ((!x as u32) << 1) | 1
    }
}
