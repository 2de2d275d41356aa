use jxl_bitio::BitWriter;

use crate::ans::{Histogram, MAX_ALPHABET_SIZE};
use crate::{ANS_FINAL_STATE, LOG_ALPHABET_SIZE, encoding_config};

/// An entropy encoder.
///
/// Records `(context, value)` tokens and serializes them in [`finish`]:
/// stream header (cluster map, integer configurations, symbol
/// distributions), then the rANS payload. Encoding runs a reverse pass over
/// the recorded tokens first; a 16-bit word is flushed exactly when the
/// matching decode would renormalize, so the decoder reads the stream back
/// symbol for symbol.
///
/// [`finish`]: Self::finish
#[derive(Debug)]
pub struct Encoder {
    num_dist: u32,
    tokens: Vec<(u32, u32)>,
}

impl Encoder {
    pub fn new(num_dist: u32) -> Self {
        debug_assert!((1..=128).contains(&num_dist));
        Self {
            num_dist,
            tokens: Vec::new(),
        }
    }

    /// Records a value to be encoded with the given context.
    #[inline]
    pub fn token(&mut self, ctx: u32, value: u32) {
        debug_assert!(ctx < self.num_dist);
        self.tokens.push((ctx, value));
    }

    /// Serializes the recorded tokens into the bit writer.
    pub fn finish(self, writer: &mut BitWriter) {
        let config = encoding_config();

        // Identity cluster map; every context keeps its own distribution.
        let num_clusters = self.num_dist as usize;
        let mut counts = vec![[0u32; MAX_ALPHABET_SIZE]; num_clusters];
        let mut symbols = Vec::with_capacity(self.tokens.len());
        for &(ctx, value) in &self.tokens {
            let (token, n, extra) = config.encode_uint(value);
            counts[ctx as usize][token as usize] += 1;
            symbols.push((ctx, token, n, extra));
        }
        let dist = counts
            .iter()
            .map(|c| Histogram::from_counts(c))
            .collect::<Vec<_>>();

        writer.write_bool(false); // no LZ77
        if self.num_dist > 1 {
            let nbits = 32 - (self.num_dist - 1).leading_zeros();
            writer.write_bits(nbits as u64, 3);
            for ctx in 0..self.num_dist {
                writer.write_bits(ctx as u64, nbits as usize);
            }
        }
        for _ in &dist {
            config.write(writer, LOG_ALPHABET_SIZE);
        }
        for histogram in &dist {
            histogram.write(writer);
        }

        // Reverse pass: the final decoder state is the first encoder state.
        let mut state = ANS_FINAL_STATE;
        let mut flush = vec![0u16; symbols.len()];
        let mut flushed = vec![false; symbols.len()];
        for (i, &(ctx, token, _, _)) in symbols.iter().enumerate().rev() {
            let histogram = &dist[ctx as usize];
            let freq = histogram.freq(token);
            if (state as u64) >= (freq as u64) << 20 {
                flush[i] = state as u16;
                flushed[i] = true;
                state >>= 16;
            }
            state = ((state / freq) << 12) + (state % freq) + histogram.cumul(token);
        }

        writer.write_bits(state as u64, 32);
        for (i, &(_, _, n, extra)) in symbols.iter().enumerate() {
            if flushed[i] {
                writer.write_bits(flush[i] as u64, 16);
            }
            writer.write_bits(extra as u64, n as usize);
        }
    }
}
