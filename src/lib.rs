//! Lossless codecs for the compressed metadata of JPEG XL-style images.
//!
//! The heavy lifting lives in the member crates; this crate re-exports
//! their public surfaces under one roof.
//!
//! - [`bitio`]: bit-level reader and writer with the `U64` variable-width
//!   integer field.
//! - [`entropy`]: clustered rANS entropy coder with hybrid-uint tokens.
//! - [`icc`]: lossless ICC profile codec, with the predict/unpredict
//!   transform and a streaming, resumable entropy-coded reader.
//! - [`splines`]: spline quantizer and collection codec.

pub use jxl_bitio as bitio;
pub use jxl_entropy as entropy;
pub use jxl_icc as icc;
pub use jxl_splines as splines;

pub use jxl_icc::{encode_icc, read_icc, IccReader};
pub use jxl_splines::Splines;
