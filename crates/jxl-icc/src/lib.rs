//! Lossless ICC profile codec.
//!
//! ICC profiles are highly structured: a fixed 128-byte header, a tag
//! table, then mostly typed data blocks. [`predict_icc`] rewrites a profile
//! into a command stream and a data stream of mostly-zero residuals, and
//! [`unpredict_icc`] reverses it exactly. [`encode_icc`] and [`read_icc`]
//! wrap the transform with the entropy coding layer; [`IccReader`] decodes
//! incrementally and can resume after running out of input.

mod common;
mod decode;
mod encode;
mod error;
mod reader;
mod shuffle;
mod varint;

pub use decode::{check_preamble, unpredict_icc};
pub use encode::{encode_icc, predict_icc};
pub use error::{Error, Result};
pub use reader::{read_icc, IccReader};
pub use shuffle::{shuffle, unshuffle};
pub use varint::{decode_varint, encode_varint};
