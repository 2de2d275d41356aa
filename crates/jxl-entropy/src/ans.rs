use jxl_bitio::{BitWriter, Bitstream};

use crate::{Error, Result};

pub(crate) const LOG_PRECISION: u32 = 12;
pub(crate) const PRECISION: u32 = 1 << LOG_PRECISION;
pub(crate) const MAX_ALPHABET_SIZE: usize = 256;

/// Symbol distribution with `2^12` total frequency.
///
/// Decoding uses a direct slot-to-symbol table over the low 12 bits of the
/// rANS state; the same frequency/cumulative data drives the encoder's
/// reverse pass, so both sides agree by construction.
#[derive(Clone)]
pub struct Histogram {
    dist: Vec<u16>,
    cumul: Vec<u16>,
    lut: Vec<u16>,
}

impl std::fmt::Debug for Histogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Histogram")
            .field("dist", &self.dist)
            .finish_non_exhaustive()
    }
}

impl Histogram {
    fn with_dist(dist: Vec<u16>) -> Self {
        debug_assert_eq!(dist.len(), MAX_ALPHABET_SIZE);
        debug_assert_eq!(dist.iter().map(|&d| d as u32).sum::<u32>(), PRECISION);

        let mut cumul = vec![0u16; MAX_ALPHABET_SIZE];
        let mut lut = vec![0u16; PRECISION as usize];
        let mut acc = 0u32;
        for (sym, &d) in dist.iter().enumerate() {
            cumul[sym] = acc as u16;
            for slot in &mut lut[acc as usize..(acc + d as u32) as usize] {
                *slot = sym as u16;
            }
            acc += d as u32;
        }
        Self { dist, cumul, lut }
    }

    pub fn parse(bitstream: &mut Bitstream) -> Result<Self> {
        let mut dist = vec![0u16; MAX_ALPHABET_SIZE];
        if bitstream.read_bool()? {
            // single symbol
            let sym = Self::read_u8(bitstream)?;
            dist[sym as usize] = PRECISION as u16;
        } else {
            let alphabet_size = Self::read_u8(bitstream)? as usize + 1;
            let mut acc = 0u32;
            for d in &mut dist[..alphabet_size - 1] {
                *d = bitstream.read_bits(LOG_PRECISION as usize)? as u16;
                acc += *d as u32;
            }
            if acc >= PRECISION {
                return Err(Error::InvalidAnsHistogram);
            }
            dist[alphabet_size - 1] = (PRECISION - acc) as u16;
        }
        Ok(Self::with_dist(dist))
    }

    /// Builds a normalized distribution from raw symbol counts.
    ///
    /// Every symbol with a nonzero count keeps a nonzero frequency. An
    /// all-zero count table degenerates to a single-symbol distribution on
    /// symbol 0, which lets empty contexts serialize like any other.
    pub fn from_counts(counts: &[u32]) -> Self {
        debug_assert!(counts.len() <= MAX_ALPHABET_SIZE);
        let mut dist = vec![0u16; MAX_ALPHABET_SIZE];

        let total: u64 = counts.iter().map(|&c| c as u64).sum();
        if total == 0 {
            dist[0] = PRECISION as u16;
            return Self::with_dist(dist);
        }

        let mut sum = 0u32;
        for (d, &c) in dist.iter_mut().zip(counts) {
            if c == 0 {
                continue;
            }
            let scaled = ((c as u64 * PRECISION as u64 + total / 2) / total).max(1) as u32;
            *d = scaled as u16;
            sum += scaled;
        }

        // Rounding drift is repaired on the largest entries, which can
        // absorb it without dropping anyone to zero.
        while sum != PRECISION {
            let (idx, &d) = dist
                .iter()
                .enumerate()
                .max_by_key(|&(_, &d)| d)
                .unwrap();
            if sum < PRECISION {
                dist[idx] = d + (PRECISION - sum).min(u16::MAX as u32 - d as u32) as u16;
                sum += (dist[idx] - d) as u32;
            } else {
                let take = (sum - PRECISION).min(d as u32 - 1);
                dist[idx] = d - take as u16;
                sum -= take;
            }
        }

        Self::with_dist(dist)
    }

    pub fn write(&self, writer: &mut BitWriter) {
        if let Some(sym) = self.single_symbol() {
            writer.write_bool(true);
            Self::write_u8(writer, sym as u8);
            return;
        }

        writer.write_bool(false);
        let alphabet_size = self
            .dist
            .iter()
            .rposition(|&d| d != 0)
            .map(|idx| idx + 1)
            .unwrap_or(1);
        Self::write_u8(writer, (alphabet_size - 1) as u8);
        for &d in &self.dist[..alphabet_size - 1] {
            writer.write_bits(d as u64, LOG_PRECISION as usize);
        }
    }

    fn read_u8(bitstream: &mut Bitstream) -> Result<u8> {
        Ok(if bitstream.read_bool()? {
            let n = bitstream.read_bits(3)? as usize;
            ((1 << n) + bitstream.read_bits(n)?) as u8
        } else {
            0
        })
    }

    fn write_u8(writer: &mut BitWriter, value: u8) {
        if value == 0 {
            writer.write_bool(false);
        } else {
            writer.write_bool(true);
            let n = 7 - value.leading_zeros() as usize;
            writer.write_bits(n as u64, 3);
            writer.write_bits((value as u64) - (1 << n), n);
        }
    }

    #[inline]
    pub fn single_symbol(&self) -> Option<u16> {
        self.dist
            .iter()
            .position(|&d| d as u32 == PRECISION)
            .map(|idx| idx as u16)
    }

    #[inline]
    pub(crate) fn freq(&self, sym: u32) -> u32 {
        self.dist[sym as usize] as u32
    }

    #[inline]
    pub(crate) fn cumul(&self, sym: u32) -> u32 {
        self.cumul[sym as usize] as u32
    }

    pub fn read_symbol(&self, bitstream: &mut Bitstream, state: &mut u32) -> Result<u16> {
        let idx = *state & (PRECISION - 1);
        let sym = self.lut[idx as usize];
        *state = (*state >> LOG_PRECISION) * self.freq(sym as u32) + idx - self.cumul(sym as u32);
        if *state < (1 << 16) {
            *state = (*state << 16) | bitstream.read_bits(16)?;
        }
        Ok(sym)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_keeps_every_symbol() {
        let mut counts = [0u32; 256];
        counts[0] = 1_000_000;
        for c in counts[1..200].iter_mut() {
            *c = 1;
        }
        let histogram = Histogram::from_counts(&counts);
        assert_eq!(
            histogram.dist.iter().map(|&d| d as u32).sum::<u32>(),
            PRECISION,
        );
        for sym in 0..200 {
            assert!(histogram.dist[sym] > 0, "symbol {} dropped", sym);
        }
    }

    #[test]
    fn serialization_round_trip() {
        let mut counts = [0u32; 256];
        counts[3] = 10;
        counts[17] = 90;
        counts[255] = 1;
        let histogram = Histogram::from_counts(&counts);

        let mut writer = BitWriter::new();
        histogram.write(&mut writer);
        let bytes = writer.finish();

        let mut bitstream = Bitstream::new(&bytes);
        let decoded = Histogram::parse(&mut bitstream).unwrap();
        assert_eq!(histogram.dist, decoded.dist);
    }

    #[test]
    fn single_symbol_round_trip() {
        let mut counts = [0u32; 256];
        counts[42] = 7;
        let histogram = Histogram::from_counts(&counts);
        assert_eq!(histogram.single_symbol(), Some(42));

        let mut writer = BitWriter::new();
        histogram.write(&mut writer);
        let bytes = writer.finish();

        let mut bitstream = Bitstream::new(&bytes);
        let decoded = Histogram::parse(&mut bitstream).unwrap();
        assert_eq!(decoded.single_symbol(), Some(42));
    }

    #[test]
    fn overfull_histogram_rejected() {
        let mut writer = BitWriter::new();
        writer.write_bool(false);
        Histogram::write_u8(&mut writer, 2);
        writer.write_bits(0xfff, 12);
        writer.write_bits(0xfff, 12);
        let bytes = writer.finish();

        let mut bitstream = Bitstream::new(&bytes);
        assert!(matches!(
            Histogram::parse(&mut bitstream),
            Err(Error::InvalidAnsHistogram),
        ));
    }
}
