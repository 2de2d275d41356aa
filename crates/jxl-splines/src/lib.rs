//! Spline quantizer and collection codec.
//!
//! Splines are stored as a starting point, delta-of-delta control point
//! coordinates and quantized DCT32 coefficients of the three color
//! channels and the σ (width) parameter. [`QuantizedSpline`] converts
//! between the quantized and the continuous form; [`Splines`] codes a
//! whole collection as a 6-context entropy stream.

mod error;
mod spline;

pub use error::{Error, Result};
pub use spline::{Point, QuantizedSpline, Spline, Splines};
