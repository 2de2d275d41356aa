use jxl_bitio::{pack_signed, unpack_signed, BitWriter, Bitstream};
use jxl_entropy::{Decoder, Encoder};

use crate::{Error, Result};

const MAX_NUM_SPLINES: usize = 1 << 24;
const MAX_NUM_CONTROL_POINTS: usize = 1 << 20;

const CTX_QUANT_ADJUST: u32 = 0;
const CTX_STARTING_POSITION: u32 = 1;
const CTX_NUM_SPLINES: u32 = 2;
const CTX_NUM_CONTROL_POINTS: u32 = 3;
const CTX_CONTROL_POINTS: u32 = 4;
const CTX_DCT: u32 = 5;
const NUM_SPLINE_CONTEXTS: u32 = 6;

const CHANNEL_WEIGHTS: [f32; 4] = [0.0042, 0.075, 0.07, 0.3333];

fn adjusted_quant(adjustment: i32) -> f32 {
    if adjustment >= 0 {
        1.0 + adjustment as f32 / 8.0
    } else {
        1.0 / (1.0 - adjustment as f32 / 8.0)
    }
}

fn inv_adjusted_quant(adjustment: i32) -> f32 {
    if adjustment >= 0 {
        1.0 / (1.0 + adjustment as f32 / 8.0)
    } else {
        1.0 - adjustment as f32 / 8.0
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Control points and dequantized DCT32 coefficients of the XYB channels
/// and the σ parameter of a single spline.
#[derive(Debug, Clone)]
pub struct Spline {
    pub control_points: Vec<Point>,
    pub color_dct: [[f32; 32]; 3],
    pub sigma_dct: [f32; 32],
}

/// A spline in coded form: delta-of-delta control point coordinates
/// (without the starting point) and quantized DCT32 coefficients.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QuantizedSpline {
    pub(crate) control_points: Vec<(i64, i64)>,
    pub(crate) color_dct: [[i32; 32]; 3],
    pub(crate) sigma_dct: [i32; 32],
}

impl QuantizedSpline {
    /// Quantizes a spline.
    ///
    /// The Y channel is quantized first and the chroma channels are
    /// decorrelated against its *reconstruction*, so that the decoder side
    /// adds back exactly what was subtracted. Fails when the spline has no
    /// control points or when two consecutive points coincide after
    /// rounding, as such a spline cannot be rendered.
    pub fn create(
        original: &Spline,
        quantization_adjustment: i32,
        y_to_x: f32,
        y_to_b: f32,
    ) -> Result<Self> {
        let Some((start, rest)) = original.control_points.split_first() else {
            return Err(Error::EmptySpline);
        };

        let mut control_points = Vec::with_capacity(rest.len());
        let mut prev_x = start.x.round() as i64;
        let mut prev_y = start.y.round() as i64;
        let mut prev_delta_x = 0i64;
        let mut prev_delta_y = 0i64;
        for point in rest {
            let x = point.x.round() as i64;
            let y = point.y.round() as i64;
            if x == prev_x && y == prev_y {
                return Err(Error::DuplicateControlPoints);
            }
            let delta_x = x - prev_x;
            let delta_y = y - prev_y;
            control_points.push((delta_x - prev_delta_x, delta_y - prev_delta_y));
            prev_delta_x = delta_x;
            prev_delta_y = delta_y;
            prev_x = x;
            prev_y = y;
        }

        let quant = adjusted_quant(quantization_adjustment);
        let inv_quant = inv_adjusted_quant(quantization_adjustment);

        let mut color_dct = [[0i32; 32]; 3];
        let mut degraded_y = [0f32; 32];
        for i in 0..32 {
            color_dct[1][i] = (original.color_dct[1][i] * quant / CHANNEL_WEIGHTS[1]).round() as i32;
            degraded_y[i] = color_dct[1][i] as f32 * inv_quant * CHANNEL_WEIGHTS[1];
        }
        for (c, corr) in [(0usize, y_to_x), (2, y_to_b)] {
            for i in 0..32 {
                let decorrelated = original.color_dct[c][i] - corr * degraded_y[i];
                color_dct[c][i] = (decorrelated * quant / CHANNEL_WEIGHTS[c]).round() as i32;
            }
        }
        let mut sigma_dct = [0i32; 32];
        for i in 0..32 {
            sigma_dct[i] = (original.sigma_dct[i] * quant / CHANNEL_WEIGHTS[3]).round() as i32;
        }

        Ok(Self {
            control_points,
            color_dct,
            sigma_dct,
        })
    }

    /// Reconstructs the spline.
    ///
    /// Accumulates the manhattan-distance × squared-width estimate of the
    /// spline into `total_estimated_area` and fails once the running total
    /// exceeds `area_budget`. The budget caps the rendering work a small
    /// coded stream can request.
    pub fn dequantize(
        &self,
        start: Point,
        quantization_adjustment: i32,
        y_to_x: f32,
        y_to_b: f32,
        area_budget: u64,
        total_estimated_area: &mut u64,
    ) -> Result<Spline> {
        let mut control_points = Vec::with_capacity(self.control_points.len() + 1);
        let mut cur_x = start.x.round() as i64;
        let mut cur_y = start.y.round() as i64;
        control_points.push(Point::new(cur_x as f32, cur_y as f32));

        let mut manhattan_distance = 0u64;
        let mut delta_x = 0i64;
        let mut delta_y = 0i64;
        for &(dx, dy) in &self.control_points {
            delta_x += dx;
            delta_y += dy;
            manhattan_distance += delta_x.unsigned_abs() + delta_y.unsigned_abs();
            cur_x += delta_x;
            cur_y += delta_y;
            control_points.push(Point::new(cur_x as f32, cur_y as f32));
        }

        let inv_quant = inv_adjusted_quant(quantization_adjustment);
        let mut color_dct = [[0f32; 32]; 3];
        for c in 0..3 {
            for i in 0..32 {
                color_dct[c][i] = self.color_dct[c][i] as f32 * CHANNEL_WEIGHTS[c] * inv_quant;
            }
        }
        for i in 0..32 {
            color_dct[0][i] += y_to_x * color_dct[1][i];
            color_dct[2][i] += y_to_b * color_dct[1][i];
        }

        let mut sigma_dct = [0f32; 32];
        let mut width_estimate = 0f32;
        for i in 0..32 {
            sigma_dct[i] = self.sigma_dct[i] as f32 * CHANNEL_WEIGHTS[3] * inv_quant;
            let weight = self.sigma_dct[i].unsigned_abs() as f32 * inv_quant.ceil();
            width_estimate += weight * weight;
        }

        *total_estimated_area += (width_estimate * manhattan_distance as f32) as u64;
        if *total_estimated_area > area_budget {
            return Err(Error::SplineAreaTooLarge);
        }

        Ok(Spline {
            control_points,
            color_dct,
            sigma_dct,
        })
    }
}

/// A collection of quantized splines with their starting points and the
/// shared quantization adjustment, as it appears in the coded stream.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Splines {
    pub quantization_adjustment: i32,
    pub splines: Vec<QuantizedSpline>,
    pub starting_points: Vec<Point>,
}

impl Splines {
    pub fn new(
        quantization_adjustment: i32,
        splines: Vec<QuantizedSpline>,
        starting_points: Vec<Point>,
    ) -> Self {
        debug_assert_eq!(splines.len(), starting_points.len());
        Self {
            quantization_adjustment,
            splines,
            starting_points,
        }
    }

    /// Decodes a spline collection.
    ///
    /// `num_pixels` bounds both the spline count and the shared control
    /// point total, checked before any allocation takes place.
    pub fn decode(bitstream: &mut Bitstream, num_pixels: usize) -> Result<Self> {
        let mut decoder = Decoder::parse(bitstream, NUM_SPLINE_CONTEXTS)?;
        decoder.begin(bitstream)?;

        let num_splines = decoder.read_varint(bitstream, CTX_NUM_SPLINES)? as usize + 1;
        let max_num_splines = usize::min(MAX_NUM_SPLINES, num_pixels / 4);
        if num_splines > max_num_splines {
            return Err(Error::TooManySplines(num_splines));
        }
        tracing::trace!(num_splines, "Decoding spline collection");

        let mut starting_points = Vec::with_capacity(num_splines);
        let mut last = (0i64, 0i64);
        for i in 0..num_splines {
            let x = decoder.read_varint(bitstream, CTX_STARTING_POSITION)?;
            let y = decoder.read_varint(bitstream, CTX_STARTING_POSITION)?;
            last = if i == 0 {
                (x as i64, y as i64)
            } else {
                (
                    last.0 + unpack_signed(x) as i64,
                    last.1 + unpack_signed(y) as i64,
                )
            };
            starting_points.push(Point::new(last.0 as f32, last.1 as f32));
        }

        let quantization_adjustment =
            unpack_signed(decoder.read_varint(bitstream, CTX_QUANT_ADJUST)?);

        let max_total_points = usize::min(MAX_NUM_CONTROL_POINTS, num_pixels / 2);
        let mut total_points = 0usize;
        let mut splines = Vec::with_capacity(num_splines);
        for _ in 0..num_splines {
            let num_points = decoder.read_varint(bitstream, CTX_NUM_CONTROL_POINTS)? as usize;
            total_points = total_points.saturating_add(num_points);
            if total_points > max_total_points {
                return Err(Error::TooManyControlPoints(total_points));
            }

            let mut control_points = Vec::with_capacity(num_points);
            for _ in 0..num_points {
                let dx = unpack_signed(decoder.read_varint(bitstream, CTX_CONTROL_POINTS)?);
                let dy = unpack_signed(decoder.read_varint(bitstream, CTX_CONTROL_POINTS)?);
                control_points.push((dx as i64, dy as i64));
            }
            let mut color_dct = [[0i32; 32]; 3];
            for channel in &mut color_dct {
                for v in channel {
                    *v = unpack_signed(decoder.read_varint(bitstream, CTX_DCT)?);
                }
            }
            let mut sigma_dct = [0i32; 32];
            for v in &mut sigma_dct {
                *v = unpack_signed(decoder.read_varint(bitstream, CTX_DCT)?);
            }

            splines.push(QuantizedSpline {
                control_points,
                color_dct,
                sigma_dct,
            });
        }

        decoder.finalize()?;
        Ok(Self {
            quantization_adjustment,
            splines,
            starting_points,
        })
    }

    /// Encodes the collection so that [`decode`] reproduces it exactly.
    ///
    /// The first starting point is coded as absolute unsigned coordinates,
    /// so it must round to non-negative integers.
    ///
    /// [`decode`]: Self::decode
    pub fn encode(&self, writer: &mut BitWriter) -> Result<()> {
        if self.splines.is_empty() || self.splines.len() != self.starting_points.len() {
            return Err(Error::NoSplines);
        }

        let mut encoder = Encoder::new(NUM_SPLINE_CONTEXTS);
        encoder.token(CTX_NUM_SPLINES, (self.splines.len() - 1) as u32);

        let mut last = (0i64, 0i64);
        for (i, point) in self.starting_points.iter().enumerate() {
            let x = point.x.round() as i64;
            let y = point.y.round() as i64;
            if i == 0 {
                if x < 0 || y < 0 || x > u32::MAX as i64 || y > u32::MAX as i64 {
                    return Err(Error::InvalidStartingPoint);
                }
                encoder.token(CTX_STARTING_POSITION, x as u32);
                encoder.token(CTX_STARTING_POSITION, y as u32);
            } else {
                encoder.token(CTX_STARTING_POSITION, pack_signed((x - last.0) as i32));
                encoder.token(CTX_STARTING_POSITION, pack_signed((y - last.1) as i32));
            }
            last = (x, y);
        }

        encoder.token(CTX_QUANT_ADJUST, pack_signed(self.quantization_adjustment));

        for spline in &self.splines {
            encoder.token(CTX_NUM_CONTROL_POINTS, spline.control_points.len() as u32);
            for &(dx, dy) in &spline.control_points {
                encoder.token(CTX_CONTROL_POINTS, pack_signed(dx as i32));
                encoder.token(CTX_CONTROL_POINTS, pack_signed(dy as i32));
            }
            for channel in &spline.color_dct {
                for &v in channel {
                    encoder.token(CTX_DCT, pack_signed(v));
                }
            }
            for &v in &spline.sigma_dct {
                encoder.token(CTX_DCT, pack_signed(v));
            }
        }

        encoder.finish(writer);
        Ok(())
    }
}
