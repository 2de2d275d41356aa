//! Entropy coding layer for the auxiliary-metadata streams.
//!
//! [`Decoder`] reads context-clustered, hybrid-uint tokenized rANS streams;
//! [`Encoder`] records `(context, value)` tokens and serializes a stream the
//! decoder consumes symbol for symbol. The stream header carries an LZ77
//! flag (always off here, rejected when set), a cluster map, and per-cluster
//! integer configuration and symbol distribution.

use jxl_bitio::Bitstream;

mod ans;
mod encoder;
mod error;

pub use ans::Histogram;
pub use encoder::Encoder;
pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Expected rANS state after the last symbol of a valid stream.
pub const ANS_FINAL_STATE: u32 = 0x130000;

const LOG_ALPHABET_SIZE: u32 = 8;

/// An entropy decoder.
#[derive(Debug, Clone)]
pub struct Decoder {
    clusters: Vec<u8>,
    configs: Vec<IntegerConfig>,
    dist: Vec<ans::Histogram>,
    state: u32,
}

impl Decoder {
    /// Create a decoder by reading the cluster map, integer configurations
    /// and symbol distributions from the bitstream.
    pub fn parse(bitstream: &mut Bitstream, num_dist: u32) -> Result<Self> {
        let lz77_enabled = bitstream.read_bool()?;
        if lz77_enabled {
            return Err(Error::Lz77NotAllowed);
        }
        let (num_clusters, clusters) = read_clusters(bitstream, num_dist)?;
        let configs = (0..num_clusters)
            .map(|_| IntegerConfig::parse(bitstream, LOG_ALPHABET_SIZE))
            .collect::<Result<Vec<_>>>()?;
        let dist = (0..num_clusters)
            .map(|_| ans::Histogram::parse(bitstream))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            clusters,
            configs,
            dist,
            state: 0,
        })
    }

    /// Start reading an entropy encoded stream by reading the initial rANS
    /// state.
    #[inline]
    pub fn begin(&mut self, bitstream: &mut Bitstream) -> Result<()> {
        self.state = bitstream.read_bits(32)?;
        Ok(())
    }

    /// Read an integer from the bitstream with the given context.
    #[inline]
    pub fn read_varint(&mut self, bitstream: &mut Bitstream, ctx: u32) -> Result<u32> {
        let cluster = self.clusters[ctx as usize] as usize;
        let token = self.dist[cluster].read_symbol(bitstream, &mut self.state)?;
        self.configs[cluster].read_uint(bitstream, token as u32)
    }

    /// Captures the coder state so that a failed read can be rolled back.
    #[inline]
    pub fn save(&self) -> Checkpoint {
        Checkpoint { state: self.state }
    }

    /// Puts back a state captured with [`save`](Self::save).
    #[inline]
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.state = checkpoint.state;
    }

    /// Finalizes the stream, and check whether the stream was valid.
    #[inline]
    pub fn finalize(&self) -> Result<()> {
        if self.state == ANS_FINAL_STATE {
            Ok(())
        } else {
            Err(Error::InvalidAnsStream)
        }
    }
}

/// Saved rANS coder state.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    state: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct IntegerConfig {
    split_exponent: u8,
    msb_in_token: u8,
    lsb_in_token: u8,
}

impl IntegerConfig {
    fn parse(bitstream: &mut Bitstream, log_alphabet_size: u32) -> Result<Self> {
        let split_exponent_bits = add_log2_ceil(log_alphabet_size);
        let split_exponent = bitstream.read_bits(split_exponent_bits as usize)?;
        if split_exponent > log_alphabet_size {
            return Err(Error::InvalidIntegerConfig);
        }
        let (msb_in_token, lsb_in_token) = if split_exponent != log_alphabet_size {
            let msb_bits = add_log2_ceil(split_exponent);
            let msb_in_token = bitstream.read_bits(msb_bits as usize)?;
            if msb_in_token > split_exponent {
                return Err(Error::InvalidIntegerConfig);
            }
            let lsb_bits = add_log2_ceil(split_exponent - msb_in_token);
            let lsb_in_token = bitstream.read_bits(lsb_bits as usize)?;
            (msb_in_token, lsb_in_token)
        } else {
            (0u32, 0u32)
        };
        if lsb_in_token + msb_in_token > split_exponent {
            return Err(Error::InvalidIntegerConfig);
        }
        Ok(Self {
            split_exponent: split_exponent as u8,
            msb_in_token: msb_in_token as u8,
            lsb_in_token: lsb_in_token as u8,
        })
    }

    fn write(&self, writer: &mut jxl_bitio::BitWriter, log_alphabet_size: u32) {
        let split_exponent = self.split_exponent as u32;
        writer.write_bits(
            split_exponent as u64,
            add_log2_ceil(log_alphabet_size) as usize,
        );
        if split_exponent != log_alphabet_size {
            let msb_in_token = self.msb_in_token as u32;
            writer.write_bits(msb_in_token as u64, add_log2_ceil(split_exponent) as usize);
            writer.write_bits(
                self.lsb_in_token as u64,
                add_log2_ceil(split_exponent - msb_in_token) as usize,
            );
        }
    }

    #[inline]
    fn read_uint(&self, bitstream: &mut Bitstream, token: u32) -> Result<u32> {
        let &IntegerConfig {
            split_exponent,
            msb_in_token,
            lsb_in_token,
        } = self;
        let split = 1u32 << split_exponent;
        if token < split {
            return Ok(token);
        }

        let n = split_exponent as u32 - (msb_in_token + lsb_in_token) as u32
            + ((token - split) >> (msb_in_token + lsb_in_token));
        // n < 32 for valid streams.
        let n = n & 31;
        let rest_bits = bitstream.read_bits(n as usize)? as u64;

        let low_bits = (token & ((1 << lsb_in_token) - 1)) as u64;
        let token = token >> lsb_in_token;
        let token = token & ((1 << msb_in_token) - 1);
        let token = (token | (1 << msb_in_token)) as u64;
        let result = (((token << n) | rest_bits) << lsb_in_token) | low_bits;
        Ok(result as u32)
    }

    /// Splits a value into (token, extra bit count, extra bits); exact
    /// inverse of [`read_uint`](Self::read_uint).
    #[inline]
    fn encode_uint(&self, value: u32) -> (u32, u32, u32) {
        let &IntegerConfig {
            split_exponent,
            msb_in_token,
            lsb_in_token,
        } = self;
        let split = 1u32 << split_exponent;
        if value < split {
            return (value, 0, 0);
        }

        let in_token = (msb_in_token + lsb_in_token) as u32;
        let bit_length = 32 - value.leading_zeros();
        let n = bit_length - 1 - in_token;
        let low_bits = value & ((1 << lsb_in_token) - 1);
        let msb = (value >> (n + lsb_in_token as u32)) & ((1 << msb_in_token) - 1);
        let token = split
            + (((n - (split_exponent as u32 - in_token)) << in_token) | (msb << lsb_in_token) | low_bits);
        let extra = (value >> lsb_in_token) & (((1u64 << n) - 1) as u32);
        (token, n, extra)
    }
}

/// Default integer configuration used by [`Encoder`]: split exponent 4, two
/// MSBs in the token. Tokens for 32-bit values stay below 128 with this
/// configuration.
fn encoding_config() -> IntegerConfig {
    IntegerConfig {
        split_exponent: 4,
        msb_in_token: 2,
        lsb_in_token: 0,
    }
}

fn add_log2_ceil(x: u32) -> u32 {
    (x + 1).next_power_of_two().trailing_zeros()
}

/// Read a clustering information of distributions from the bitstream.
fn read_clusters(bitstream: &mut Bitstream, num_dist: u32) -> Result<(u32, Vec<u8>)> {
    if num_dist == 1 {
        return Ok((1, vec![0u8]));
    }

    let nbits = bitstream.read_bits(3)? as usize;
    let clusters = (0..num_dist)
        .map(|_| bitstream.read_bits(nbits).map(|b| b as u8))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let num_clusters = *clusters.iter().max().unwrap() as u32 + 1;
    let set = clusters
        .iter()
        .copied()
        .collect::<std::collections::HashSet<_>>();
    if set.len() != num_clusters as usize {
        tracing::error!("distribution cluster has a hole");
        Err(Error::InvalidCluster)
    } else {
        Ok((num_clusters, clusters))
    }
}
