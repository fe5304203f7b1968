//! 32-bit adaptive binary arithmetic (range) coder with E3 (middle-half)
//! underflow handling (CCSDS 122.0-B-2 §4.3).
//!
//! Structurally this mirrors a classic MQ-style coder (separate encoder and
//! decoder state machines, explicit renormalization loop, bit-level output
//! buffer) but the split computation and renormalization conditions are the
//! ones this format defines, not the MQ coder's probability-estimation
//! state table.

use crate::bitplane::{BitSource, Context};
use crate::constants::{ARITH_HALF, ARITH_Q1, ARITH_Q3, ARITH_TOP, NUM_CONTEXTS};
use crate::error::{CodecError, Result};

/// How many zero-padding bits past the real payload a decode may consume
/// before it's treated as desynchronized rather than the ordinary trailing
/// padding a short stream legitimately needs (up to 32 bits to fill the
/// initial code register, plus a little slack).
const MAX_DESYNC_PAD_BITS: usize = 64;

struct BitWriter {
    bytes: Vec<u8>,
    cur: u8,
    nbits: u8,
}

impl BitWriter {
    fn new() -> Self {
        Self { bytes: Vec::new(), cur: 0, nbits: 0 }
    }

    fn push_bit(&mut self, bit: u8) {
        self.cur = (self.cur << 1) | (bit & 1);
        self.nbits += 1;
        if self.nbits == 8 {
            self.bytes.push(self.cur);
            self.cur = 0;
            self.nbits = 0;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.nbits > 0 {
            self.cur <<= 8 - self.nbits;
            self.bytes.push(self.cur);
        }
        self.bytes
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Bits served as zero padding past the end of `data`.
    overrun: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, overrun: 0 }
    }

    /// Returns 0 past the end of `data`, mirroring the encoder's zero-padded flush.
    fn next_bit(&mut self) -> u32 {
        let byte_idx = self.pos / 8;
        let bit = if byte_idx < self.data.len() {
            (self.data[byte_idx] >> (7 - (self.pos % 8))) & 1
        } else {
            self.overrun += 1;
            0
        };
        self.pos += 1;
        bit as u32
    }
}

/// Per-context Laplace (add-one) occurrence counters shared by encoder and decoder.
struct ContextCounts {
    zeros: [i64; NUM_CONTEXTS],
    ones: [i64; NUM_CONTEXTS],
}

impl ContextCounts {
    fn new() -> Self {
        Self { zeros: [1; NUM_CONTEXTS], ones: [1; NUM_CONTEXTS] }
    }

    /// Computes the split point of `[low, high]` for `ctx`'s current statistics.
    fn split(&self, low: u32, high: u32, ctx: Context) -> u32 {
        let idx = ctx.index();
        let total = self.zeros[idx] + self.ones[idx];
        let range = (high - low) as i64 + 1;
        let offset = range * self.zeros[idx] / total;
        (low as i64 + offset - 1) as u32
    }

    fn observe(&mut self, ctx: Context, bit: bool) {
        let idx = ctx.index();
        if bit {
            self.ones[idx] += 1;
        } else {
            self.zeros[idx] += 1;
        }
    }
}

/// Encodes a stream of (bit, context) symbols into a packed byte buffer.
pub struct RangeEncoder {
    low: u32,
    high: u32,
    pending: u32,
    counts: ContextCounts,
    writer: BitWriter,
}

impl Default for RangeEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeEncoder {
    pub fn new() -> Self {
        Self {
            low: 0,
            high: ARITH_TOP,
            pending: 0,
            counts: ContextCounts::new(),
            writer: BitWriter::new(),
        }
    }

    pub fn encode_bit(&mut self, bit: bool, ctx: Context) {
        let split = self.counts.split(self.low, self.high, ctx);
        if bit {
            self.low = split.wrapping_add(1);
        } else {
            self.high = split;
        }
        self.counts.observe(ctx, bit);
        self.renormalize();
    }

    pub fn encode(&mut self, symbols: &[(bool, Context)]) {
        for &(bit, ctx) in symbols {
            self.encode_bit(bit, ctx);
        }
    }

    fn renormalize(&mut self) {
        loop {
            if self.high < ARITH_HALF {
                self.output_bit(0);
            } else if self.low >= ARITH_HALF {
                self.output_bit(1);
                self.low -= ARITH_HALF;
                self.high -= ARITH_HALF;
            } else if self.low >= ARITH_Q1 && self.high < ARITH_Q3 {
                self.pending += 1;
                self.low -= ARITH_Q1;
                self.high -= ARITH_Q1;
            } else {
                break;
            }
            self.low = self.low.wrapping_mul(2);
            self.high = self.high.wrapping_mul(2).wrapping_add(1);
        }
    }

    fn output_bit(&mut self, bit: u8) {
        self.writer.push_bit(bit);
        for _ in 0..self.pending {
            self.writer.push_bit(1 - bit);
        }
        self.pending = 0;
    }

    /// Flushes the final disambiguating bit and pending underflow bits, returning
    /// the packed (MSB-first, zero-padded) byte buffer.
    pub fn finish(mut self) -> Vec<u8> {
        self.pending += 1;
        if self.low < ARITH_Q1 {
            self.output_bit(0);
        } else {
            self.output_bit(1);
        }
        self.writer.finish()
    }
}

/// Decodes a stream of (bit, context) symbols from a packed byte buffer,
/// mirroring [`RangeEncoder`] bit for bit.
pub struct RangeDecoder<'a> {
    low: u32,
    high: u32,
    code: u32,
    counts: ContextCounts,
    reader: BitReader<'a>,
}

impl<'a> RangeDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let mut reader = BitReader::new(data);
        let mut code = 0u32;
        for _ in 0..32 {
            code = (code << 1) | reader.next_bit();
        }
        Self { low: 0, high: ARITH_TOP, code, counts: ContextCounts::new(), reader }
    }

    fn decode_bit_impl(&mut self, ctx: Context) -> Result<bool> {
        let split = self.counts.split(self.low, self.high, ctx);
        if split < self.low || split >= self.high {
            return Err(CodecError::DecoderDesync(format!(
                "interval collapsed in context {ctx:?}: low={}, high={}, split={split}",
                self.low, self.high
            )));
        }
        let bit = self.code > split;
        if bit {
            self.low = split.wrapping_add(1);
        } else {
            self.high = split;
        }
        self.counts.observe(ctx, bit);
        self.renormalize();
        if self.reader.overrun > MAX_DESYNC_PAD_BITS {
            return Err(CodecError::DecoderDesync(format!(
                "decoder read {} bits of padding past the end of the payload",
                self.reader.overrun
            )));
        }
        Ok(bit)
    }

    fn renormalize(&mut self) {
        loop {
            if self.high < ARITH_HALF {
                // no subtraction needed
            } else if self.low >= ARITH_HALF {
                self.low -= ARITH_HALF;
                self.high -= ARITH_HALF;
                self.code -= ARITH_HALF;
            } else if self.low >= ARITH_Q1 && self.high < ARITH_Q3 {
                self.low -= ARITH_Q1;
                self.high -= ARITH_Q1;
                self.code -= ARITH_Q1;
            } else {
                break;
            }
            self.low = self.low.wrapping_mul(2);
            self.high = self.high.wrapping_mul(2).wrapping_add(1);
            self.code = self.code.wrapping_mul(2).wrapping_add(self.reader.next_bit());
        }
    }
}

impl<'a> BitSource for RangeDecoder<'a> {
    fn decode_bit(&mut self, ctx: Context) -> Result<bool> {
        self.decode_bit_impl(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_single_bit_each_context() {
        for &ctx in &[Context::Significance, Context::Sign, Context::Refinement] {
            for bit in [false, true] {
                let mut enc = RangeEncoder::new();
                enc.encode_bit(bit, ctx);
                let bytes = enc.finish();
                let mut dec = RangeDecoder::new(&bytes);
                assert_eq!(dec.decode_bit(ctx).unwrap(), bit);
            }
        }
    }

    #[test]
    fn roundtrip_mixed_symbol_sequence() {
        let symbols: Vec<(bool, Context)> = vec![
            (false, Context::Significance),
            (false, Context::Significance),
            (true, Context::Significance),
            (true, Context::Sign),
            (true, Context::Refinement),
            (false, Context::Refinement),
            (false, Context::Significance),
            (true, Context::Significance),
            (false, Context::Sign),
        ];
        let mut enc = RangeEncoder::new();
        enc.encode(&symbols);
        let bytes = enc.finish();

        let mut dec = RangeDecoder::new(&bytes);
        for &(bit, ctx) in &symbols {
            assert_eq!(dec.decode_bit(ctx).unwrap(), bit);
        }
    }

    #[test]
    fn roundtrip_long_biased_sequence() {
        // Heavily biased toward zero in one context, exercising renormalization
        // and the middle-half underflow path repeatedly.
        let mut symbols = Vec::new();
        for i in 0..500u32 {
            symbols.push((i % 17 == 0, Context::Significance));
        }
        let mut enc = RangeEncoder::new();
        enc.encode(&symbols);
        let bytes = enc.finish();

        let mut dec = RangeDecoder::new(&bytes);
        for &(bit, ctx) in &symbols {
            assert_eq!(dec.decode_bit(ctx).unwrap(), bit);
        }
    }

    #[test]
    fn empty_stream_flushes_without_panicking() {
        let enc = RangeEncoder::new();
        let bytes = enc.finish();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn truncated_stream_desyncs_instead_of_looping_forever() {
        let symbols: Vec<(bool, Context)> = (0..64).map(|i| (i % 3 == 0, Context::Significance)).collect();
        let mut enc = RangeEncoder::new();
        enc.encode(&symbols);
        let bytes = enc.finish();

        // Keep only the first byte: the decoder runs out of real payload long
        // before it has replayed every symbol and must read past the end.
        let truncated = &bytes[..1];
        let mut dec = RangeDecoder::new(truncated);
        let mut err = None;
        for &(_, ctx) in &symbols {
            if let Err(e) = dec.decode_bit(ctx) {
                err = Some(e);
                break;
            }
        }
        assert!(matches!(err, Some(CodecError::DecoderDesync(_))));
    }
}
