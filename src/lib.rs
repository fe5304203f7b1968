/*!
# ccsds122

A pure Rust implementation of the lossless subset of CCSDS 122.0-B-2: integer
5/3 wavelet transform, three-context bitplane coding, and a 32-bit adaptive
binary arithmetic coder, framed in a packetized container format suitable for
onboard/embedded use.

## Pipeline

- **Wavelet transform** (`wavelet`): reversible integer 5/3 lifting, 1D and
  multi-level 2D.
- **Bitplane coding** (`bitplane`): subband scan ordering and the
  significance/sign/refinement state machine.
- **Arithmetic coding** (`arith_coder`): the range coder that turns the
  bitplane coder's symbol stream into packed bytes.
- **Container** (`container`): the fixed global header, CRC32 trailer, and
  length-prefixed packet framing.
- **Pipeline** (`pipeline`): ties the above into `compress`/`decompress`.
- **Image I/O** (`image_io`): BMP adapter, isolated from the rest of the crate.

## Safety
This crate contains no `unsafe` code.
*/

#![forbid(unsafe_code)]

pub mod arith_coder;
pub mod bitplane;
pub mod constants;
pub mod container;
pub mod error;
pub mod image_io;
pub mod pipeline;
pub mod wavelet;

pub use error::CodecError;
pub use pipeline::{compress, decompress, RawImage};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_roundtrip_smoke_test() {
        let plane: Vec<u8> = (0..256).map(|i| (i % 256) as u8).collect();
        let image = RawImage { height: 16, width: 16, planes: vec![plane] };
        let coded = compress(&image, 2).unwrap();
        let decoded = decompress(&coded).unwrap();
        assert_eq!(decoded.planes, image.planes);
    }
}
