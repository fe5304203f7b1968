//! Subband scan ordering and the three-context bitplane coder (CCSDS
//! 122.0-B-2 §4.2), adapted from the bitmask significance-state idiom of a
//! JPEG2000 codeblock coder but reduced to the three fixed contexts the
//! container format uses: no neighbor-dependent context tables.

use crate::constants::NUM_CONTEXTS;

/// One of the three contexts the arithmetic coder tracks statistics for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// Whether a still-insignificant coefficient becomes significant at this bitplane.
    Significance,
    /// The sign bit, coded once when a coefficient first becomes significant.
    Sign,
    /// A refinement bit of an already-significant coefficient.
    Refinement,
}

impl Context {
    pub fn index(self) -> usize {
        match self {
            Context::Significance => 0,
            Context::Sign => 1,
            Context::Refinement => 2,
        }
    }
}

const _: () = assert!(NUM_CONTEXTS == 3);

/// One rectangular subband region within the padded coefficient plane.
#[derive(Debug, Clone, Copy)]
pub struct SubbandRect {
    pub row_offset: usize,
    pub col_offset: usize,
    pub height: usize,
    pub width: usize,
}

/// Computes the scan-order list of subband rectangles for a plane of size
/// `padded_height x padded_width` decomposed over `levels` levels: the
/// coarsest LL first, then LH, HL, HH for each level from coarsest to finest.
pub fn subband_layout(padded_height: usize, padded_width: usize, levels: u8) -> Vec<SubbandRect> {
    let mut rects = Vec::with_capacity(1 + 3 * levels as usize);
    let ll_h = padded_height >> levels;
    let ll_w = padded_width >> levels;
    rects.push(SubbandRect { row_offset: 0, col_offset: 0, height: ll_h, width: ll_w });

    for l in (1..=levels).rev() {
        let h = padded_height >> l;
        let w = padded_width >> l;
        // LH: horizontal low-pass, vertical high-pass -> bottom-left quadrant.
        rects.push(SubbandRect { row_offset: h, col_offset: 0, height: h, width: w });
        // HL: horizontal high-pass, vertical low-pass -> top-right quadrant.
        rects.push(SubbandRect { row_offset: 0, col_offset: w, height: h, width: w });
        // HH: both high-pass -> bottom-right quadrant.
        rects.push(SubbandRect { row_offset: h, col_offset: w, height: h, width: w });
    }
    rects
}

/// Gathers one channel plane's coefficients into scan order.
pub fn collect_scan_order(
    plane: &[i32],
    stride: usize,
    padded_height: usize,
    padded_width: usize,
    levels: u8,
) -> Vec<i32> {
    let layout = subband_layout(padded_height, padded_width, levels);
    let total: usize = layout.iter().map(|r| r.height * r.width).sum();
    let mut out = Vec::with_capacity(total);
    for rect in &layout {
        for y in 0..rect.height {
            let row = (rect.row_offset + y) * stride + rect.col_offset;
            out.extend_from_slice(&plane[row..row + rect.width]);
        }
    }
    out
}

/// Inverse of [`collect_scan_order`]: scatters scan-order coefficients back
/// into a plane's subband regions.
pub fn scatter_scan_order(
    values: &[i32],
    plane: &mut [i32],
    stride: usize,
    padded_height: usize,
    padded_width: usize,
    levels: u8,
) {
    let layout = subband_layout(padded_height, padded_width, levels);
    let mut pos = 0usize;
    for rect in &layout {
        for y in 0..rect.height {
            let row = (rect.row_offset + y) * stride + rect.col_offset;
            plane[row..row + rect.width].copy_from_slice(&values[pos..pos + rect.width]);
            pos += rect.width;
        }
    }
}

/// Number of bitplanes needed to represent the largest-magnitude coefficient:
/// `floor(log2(max_mag))`, or 0 if every coefficient is zero.
pub fn bitplane_count(coeffs: &[i32]) -> u8 {
    let max_mag = coeffs.iter().map(|v| v.unsigned_abs()).max().unwrap_or(0);
    if max_mag == 0 {
        0
    } else {
        31 - max_mag.leading_zeros()
    }
    .try_into()
    .unwrap_or(0)
}

/// One (bit, context) symbol the bitplane coder feeds to the arithmetic coder.
pub type Symbol = (bool, Context);

/// Runs the three-context significance/sign/refinement state machine over
/// `coeffs` (sign-magnitude: magnitude in `mag`, sign in `sign`) across
/// bitplanes `nbp` down to 0, producing the symbol sequence an encoder feeds
/// to the arithmetic coder.
pub fn encode_symbols(mag: &[u32], sign: &[bool], nbp: u8) -> Vec<Symbol> {
    assert_eq!(mag.len(), sign.len());
    let n = mag.len();
    let mut significant = vec![false; n];
    let mut symbols = Vec::new();

    for b in (0..=nbp).rev() {
        for k in 0..n {
            let bit = (mag[k] >> b) & 1 == 1;
            if !significant[k] {
                symbols.push((bit, Context::Significance));
                if bit {
                    significant[k] = true;
                    symbols.push((sign[k], Context::Sign));
                }
            } else {
                symbols.push((bit, Context::Refinement));
            }
        }
    }
    symbols
}

/// A function that decodes one bit for a given context, advancing its
/// internal state (the arithmetic decoder). Mirrors [`encode_symbols`]'s scan
/// exactly so the two stay in lockstep. Fails with [`crate::error::CodecError::DecoderDesync`]
/// if the underlying coder detects it has lost sync with the encoded stream.
pub trait BitSource {
    fn decode_bit(&mut self, ctx: Context) -> crate::error::Result<bool>;
}

/// Replays the scan order of [`encode_symbols`] against a [`BitSource`] to
/// reconstruct magnitudes and signs for `n` coefficients.
pub fn decode_coefficients<S: BitSource>(
    source: &mut S,
    n: usize,
    nbp: u8,
) -> crate::error::Result<(Vec<u32>, Vec<bool>)> {
    let mut mag = vec![0u32; n];
    let mut sign = vec![false; n];
    let mut significant = vec![false; n];

    for b in (0..=nbp).rev() {
        for k in 0..n {
            if !significant[k] {
                let bit = source.decode_bit(Context::Significance)?;
                if bit {
                    mag[k] |= 1 << b;
                    significant[k] = true;
                    sign[k] = source.decode_bit(Context::Sign)?;
                }
            } else {
                let bit = source.decode_bit(Context::Refinement)?;
                if bit {
                    mag[k] |= 1 << b;
                }
            }
        }
    }
    Ok((mag, sign))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subband_layout_single_level_covers_whole_plane() {
        let layout = subband_layout(8, 8, 1);
        assert_eq!(layout.len(), 4);
        let total: usize = layout.iter().map(|r| r.height * r.width).sum();
        assert_eq!(total, 64);
    }

    #[test]
    fn subband_layout_multi_level_rects_disjoint_and_cover() {
        let (h, w, levels) = (32usize, 32usize, 3);
        let layout = subband_layout(h, w, levels);
        assert_eq!(layout.len(), 1 + 3 * levels as usize);

        let mut covered = vec![false; h * w];
        for rect in &layout {
            for y in 0..rect.height {
                for x in 0..rect.width {
                    let idx = (rect.row_offset + y) * w + (rect.col_offset + x);
                    assert!(!covered[idx], "rect overlap at {idx}");
                    covered[idx] = true;
                }
            }
        }
        assert!(covered.iter().all(|&c| c));
    }

    #[test]
    fn collect_scatter_roundtrip() {
        let (h, w, levels) = (16usize, 16usize, 2);
        let mut plane: Vec<i32> = (0..h * w).map(|i| i as i32 - 128).collect();
        let original = plane.clone();

        let scanned = collect_scan_order(&plane, w, h, w, levels);
        assert_eq!(scanned.len(), h * w);

        plane.iter_mut().for_each(|v| *v = 0);
        scatter_scan_order(&scanned, &mut plane, w, h, w, levels);
        assert_eq!(plane, original);
    }

    #[test]
    fn bitplane_count_examples() {
        assert_eq!(bitplane_count(&[0, 0, 0]), 0);
        assert_eq!(bitplane_count(&[1, -1, 0]), 0);
        assert_eq!(bitplane_count(&[2, -3]), 1);
        assert_eq!(bitplane_count(&[255, -10]), 7);
        assert_eq!(bitplane_count(&[256]), 8);
    }

    struct VecSource {
        symbols: Vec<Symbol>,
        pos: usize,
    }

    impl BitSource for VecSource {
        fn decode_bit(&mut self, ctx: Context) -> crate::error::Result<bool> {
            let (bit, want_ctx) = self.symbols[self.pos];
            assert_eq!(ctx, want_ctx, "context mismatch at position {}", self.pos);
            self.pos += 1;
            Ok(bit)
        }
    }

    #[test]
    fn encode_decode_symbol_roundtrip() {
        let mag: Vec<u32> = vec![5, 0, 255, 1, 128];
        let sign: Vec<bool> = vec![true, false, false, true, false];
        let nbp = bitplane_count(&mag.iter().map(|&m| m as i32).collect::<Vec<_>>());

        let symbols = encode_symbols(&mag, &sign, nbp);
        let mut source = VecSource { symbols, pos: 0 };
        let (mag_out, sign_out) = decode_coefficients(&mut source, mag.len(), nbp).unwrap();

        assert_eq!(mag_out, mag);
        for k in 0..mag.len() {
            if mag[k] != 0 {
                assert_eq!(sign_out[k], sign[k]);
            }
        }
        assert_eq!(source.pos, source.symbols.len());
    }

    #[test]
    fn all_zero_coefficients_produce_only_significance_symbols() {
        let mag = vec![0u32; 4];
        let sign = vec![false; 4];
        let symbols = encode_symbols(&mag, &sign, 0);
        assert_eq!(symbols.len(), 4);
        assert!(symbols.iter().all(|(bit, ctx)| !bit && *ctx == Context::Significance));
    }
}
