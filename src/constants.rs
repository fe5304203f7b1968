//! Fixed constants for the CCSDS 122.0-B-2 subset implemented by this crate.

/// Level shift applied to 8-bit unsigned samples before the DWT (CCSDS 122.0-B-2 §4.1).
pub const LEVEL_SHIFT: i32 = 128;

/// Only wavelet type code accepted in the global header: integer 5/3 (reversible).
pub const WAVELET_TYPE_INTEGER_53: u8 = 1;

/// Container magic bytes, stored at header offset 0.
pub const MAGIC: &[u8; 4] = b"C122";

/// Size in bytes of the fixed-layout global header, CRC32 trailer excluded.
///
/// magic(4) + height(2) + width(2) + channels(1) + levels(1) + padded_height(2)
/// + padded_width(2) + wavelet(1) + nbp(1) = 16.
pub const HEADER_SIZE: usize = 16;

/// Size in bytes of the CRC32 trailer that follows the fixed header fields.
pub const CRC_SIZE: usize = 4;

/// Size in bytes of one packet's length-prefix header (seq: u16, length: u32).
pub const PACKET_HEADER_SIZE: usize = 6;

/// Maximum payload length of a single packet (CCSDS 122.0-B-2 §4.4).
pub const MAX_PACKET_PAYLOAD: usize = 65536;

/// Arithmetic coder register width constants (§4.3): 32-bit range coder with E3
/// (middle-half) underflow handling.
pub const ARITH_TOP: u32 = u32::MAX; // 2^32 - 1
pub const ARITH_HALF: u32 = 1 << 31;
pub const ARITH_Q1: u32 = 1 << 30;
pub const ARITH_Q3: u32 = 3 * ARITH_Q1;

/// Number of contexts the bitplane coder feeds the arithmetic coder: SIG, SIGN, REF.
pub const NUM_CONTEXTS: usize = 3;
