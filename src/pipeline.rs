//! Top-level compress/decompress orchestration (CCSDS 122.0-B-2 §4.5):
//! level shift, edge padding, per-channel wavelet transform, bitplane
//! collection, arithmetic coding, and container framing, in that order.
//!
//! Logging happens only at stage boundaries, not inside the wavelet lifting
//! loops, the per-coefficient state machine, or the per-symbol arithmetic
//! coder, the same granularity a J2K encoder's top-level `encode` method logs at.

use log::debug;

use crate::arith_coder::{RangeDecoder, RangeEncoder};
use crate::bitplane::{bitplane_count, collect_scan_order, decode_coefficients, encode_symbols, scatter_scan_order};
use crate::constants::{LEVEL_SHIFT, WAVELET_TYPE_INTEGER_53};
use crate::container::{
    decode_all_packets, join_packets, payload_crc32, split_into_packets, verify_payload_crc, GlobalHeader,
    WaveletType,
};
use crate::error::{CodecError, Result};
use crate::wavelet::{forward_2d, inverse_2d};

/// An image as this codec sees it: one or three 8-bit planes, planar (not interleaved).
#[derive(Debug, Clone)]
pub struct RawImage {
    pub height: usize,
    pub width: usize,
    pub planes: Vec<Vec<u8>>,
}

impl RawImage {
    pub fn channels(&self) -> usize {
        self.planes.len()
    }
}

/// Smallest `(padded_height, padded_width)` both divisible by `2^levels`.
fn padded_dims(height: usize, width: usize, levels: u8) -> (usize, usize) {
    let unit = 1usize << levels;
    let round_up = |n: usize| n.div_ceil(unit) * unit;
    (round_up(height), round_up(width))
}

/// Pads `plane` (row-major `h x w`) to `hp x wp` by replicating the last row
/// and column, the same edge-extension mode the original prototype used.
fn pad_plane(plane: &[i32], h: usize, w: usize, hp: usize, wp: usize) -> Vec<i32> {
    let mut out = vec![0i32; hp * wp];
    for y in 0..hp {
        let sy = y.min(h - 1);
        for x in 0..wp {
            let sx = x.min(w - 1);
            out[y * wp + x] = plane[sy * w + sx];
        }
    }
    out
}

fn crop_plane(padded: &[i32], hp: usize, wp: usize, h: usize, w: usize) -> Vec<i32> {
    let mut out = vec![0i32; h * w];
    for y in 0..h {
        out[y * w..y * w + w].copy_from_slice(&padded[y * wp..y * wp + w]);
    }
    out
}

fn validate_levels(height: usize, width: usize, levels: u8) -> Result<()> {
    if levels == 0 {
        return Err(CodecError::ParameterOutOfRange("decomposition level count must be at least 1".into()));
    }
    if levels >= usize::BITS as u8 {
        return Err(CodecError::ParameterOutOfRange(format!("levels {levels} too large for image")));
    }
    let unit = 1usize << levels;
    if unit > height.min(width) {
        return Err(CodecError::ParameterOutOfRange(format!(
            "levels {levels} too large for image: 2^{levels} exceeds the smaller dimension ({}x{})",
            height, width
        )));
    }
    let (hp, wp) = padded_dims(height, width, levels);
    if hp == 0 || wp == 0 {
        return Err(CodecError::ParameterOutOfRange("image has a zero dimension".into()));
    }
    Ok(())
}

/// Compresses `image` into a complete container byte stream.
pub fn compress(image: &RawImage, levels: u8) -> Result<Vec<u8>> {
    let channels = image.channels();
    if channels != 1 && channels != 3 {
        return Err(CodecError::ParameterOutOfRange(format!("channel count {channels}, expected 1 or 3")));
    }
    if image.height == 0 || image.width == 0 {
        return Err(CodecError::ParameterOutOfRange("image has a zero dimension".into()));
    }
    validate_levels(image.height, image.width, levels)?;

    debug!(
        "compress: {}x{} image, {} channel(s), {} decomposition levels",
        image.width, image.height, channels, levels
    );

    let (hp, wp) = padded_dims(image.height, image.width, levels);

    let mut all_coeffs: Vec<i32> = Vec::with_capacity(channels * hp * wp);
    for plane in &image.planes {
        let shifted: Vec<i32> = plane.iter().map(|&v| v as i32 - LEVEL_SHIFT).collect();
        let mut padded = pad_plane(&shifted, image.height, image.width, hp, wp);
        forward_2d(&mut padded, wp, hp, wp, levels);
        let scanned = collect_scan_order(&padded, wp, hp, wp, levels);
        all_coeffs.extend(scanned);
    }
    debug!("compress: wavelet transform and subband collection done, {} coefficients", all_coeffs.len());

    let nbp = bitplane_count(&all_coeffs);
    let mag: Vec<u32> = all_coeffs.iter().map(|&v| v.unsigned_abs()).collect();
    let sign: Vec<bool> = all_coeffs.iter().map(|&v| v < 0).collect();

    let symbols = encode_symbols(&mag, &sign, nbp);
    let mut encoder = RangeEncoder::new();
    encoder.encode(&symbols);
    let coded = encoder.finish();
    debug!("compress: arithmetic coding done, {} bytes, nbp={}", coded.len(), nbp);

    let header = GlobalHeader {
        height: image.height as u16,
        width: image.width as u16,
        channels: channels as u8,
        levels,
        padded_height: hp as u16,
        padded_width: wp as u16,
        wavelet: WaveletType::Integer53,
        nbp,
        crc32: payload_crc32(&coded),
    };

    let mut out = header.encode();
    for packet in split_into_packets(&coded) {
        packet.encode_into(&mut out)?;
    }
    debug!("compress: {} total bytes written", out.len());
    Ok(out)
}

/// Decompresses a complete container byte stream back into an image.
pub fn decompress(data: &[u8]) -> Result<RawImage> {
    let (header, consumed) = GlobalHeader::decode(data)?;
    debug!(
        "decompress: {}x{} image, {} channel(s), {} levels, nbp={}",
        header.width, header.height, header.channels, header.levels, header.nbp
    );
    if header.wavelet as u8 != WAVELET_TYPE_INTEGER_53 {
        return Err(CodecError::FormatReject("unsupported wavelet type".into()));
    }

    let packets = decode_all_packets(&data[consumed..])?;
    let coded = join_packets(&packets);
    verify_payload_crc(&header, &coded)?;

    let channels = header.channels as usize;
    let hp = header.padded_height as usize;
    let wp = header.padded_width as usize;
    let h = header.height as usize;
    let w = header.width as usize;
    let per_channel = hp * wp;

    let mut decoder = RangeDecoder::new(&coded);
    let (mag, sign) = decode_coefficients(&mut decoder, channels * per_channel, header.nbp)?;
    debug!("decompress: arithmetic decoding done, {} coefficients", mag.len());

    let mut planes = Vec::with_capacity(channels);
    for c in 0..channels {
        let start = c * per_channel;

        let mut coeffs = vec![0i32; per_channel];
        for (k, v) in coeffs.iter_mut().enumerate() {
            let m = mag[start + k] as i32;
            *v = if sign[start + k] { -m } else { m };
        }

        let mut padded = vec![0i32; per_channel];
        scatter_scan_order(&coeffs, &mut padded, wp, hp, wp, header.levels);
        inverse_2d(&mut padded, wp, hp, wp, header.levels);
        let cropped = crop_plane(&padded, hp, wp, h, w);

        let plane: Vec<u8> = cropped
            .iter()
            .map(|&v| (v + LEVEL_SHIFT).clamp(0, 255) as u8)
            .collect();
        planes.push(plane);
    }
    debug!("decompress: inverse wavelet transform done");

    Ok(RawImage { height: h, width: w, planes })
}
