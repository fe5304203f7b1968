//! Packetized container format (CCSDS 122.0-B-2 §4.4): a fixed-layout global
//! header carrying a CRC32 of the packet payload bitstream, followed by
//! length-prefixed packets.
//!
//! The byte-level encoding follows the manual big-endian writer idiom this
//! codebase uses elsewhere for codestream framing, pushed onto a growable
//! buffer instead of a fixed-size destination slice since the full packet
//! stream length isn't known up front.

use crc::{Crc, CRC_32_ISO_HDLC};
use num_enum::TryFromPrimitive;

use crate::constants::{
    CRC_SIZE, HEADER_SIZE, MAGIC, MAX_PACKET_PAYLOAD, PACKET_HEADER_SIZE, WAVELET_TYPE_INTEGER_53,
};
use crate::error::{CodecError, Result};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// CRC32 (IEEE 802.3/ISO-HDLC) of the concatenated packet payloads, the
/// value the global header's `crc32` field must match.
pub fn payload_crc32(payload: &[u8]) -> u32 {
    CRC32.checksum(payload)
}

/// The only wavelet transform this container format can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum WaveletType {
    Integer53 = WAVELET_TYPE_INTEGER_53,
}

/// The fixed-layout global header: magic, image geometry, decomposition
/// parameters, and a CRC32 of the packet payload bitstream (not of the
/// header fields themselves).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalHeader {
    pub height: u16,
    pub width: u16,
    pub channels: u8,
    pub levels: u8,
    pub padded_height: u16,
    pub padded_width: u16,
    pub wavelet: WaveletType,
    /// Number of bitplanes coded, stored explicitly so a decoder never has
    /// to fall back to an `8 + levels` guess.
    pub nbp: u8,
    /// CRC32 of the concatenated packet payloads that follow this header.
    pub crc32: u32,
}

impl GlobalHeader {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + CRC_SIZE);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.width.to_be_bytes());
        out.push(self.channels);
        out.push(self.levels);
        out.extend_from_slice(&self.padded_height.to_be_bytes());
        out.extend_from_slice(&self.padded_width.to_be_bytes());
        out.push(self.wavelet as u8);
        out.push(self.nbp);
        debug_assert_eq!(out.len(), HEADER_SIZE);
        out.extend_from_slice(&self.crc32.to_be_bytes());
        out
    }

    /// Parses the header fields and stored CRC. Does not verify the CRC:
    /// that requires the packet payloads, which haven't been read yet.
    /// Callers must check the returned `crc32` against [`payload_crc32`] of
    /// the joined packet payloads via [`verify_payload_crc`].
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < HEADER_SIZE + CRC_SIZE {
            return Err(CodecError::FormatReject("input shorter than global header".into()));
        }
        if &data[0..4] != MAGIC {
            return Err(CodecError::FormatReject("bad magic bytes".into()));
        }

        let height = u16::from_be_bytes([data[4], data[5]]);
        let width = u16::from_be_bytes([data[6], data[7]]);
        let channels = data[8];
        let levels = data[9];
        let padded_height = u16::from_be_bytes([data[10], data[11]]);
        let padded_width = u16::from_be_bytes([data[12], data[13]]);
        let wavelet = WaveletType::try_from(data[14])
            .map_err(|_| CodecError::FormatReject(format!("unsupported wavelet type code {}", data[14])))?;
        let nbp = data[15];
        let crc32 = u32::from_be_bytes(data[HEADER_SIZE..HEADER_SIZE + CRC_SIZE].try_into().unwrap());

        if channels != 1 && channels != 3 {
            return Err(CodecError::ParameterOutOfRange(format!("channel count {channels}, expected 1 or 3")));
        }

        Ok((
            Self { height, width, channels, levels, padded_height, padded_width, wavelet, nbp, crc32 },
            HEADER_SIZE + CRC_SIZE,
        ))
    }
}

/// Verifies `header.crc32` against the actual CRC32 of `payload` (the
/// concatenated packet payloads).
pub fn verify_payload_crc(header: &GlobalHeader, payload: &[u8]) -> Result<()> {
    let actual = payload_crc32(payload);
    if actual != header.crc32 {
        return Err(CodecError::IntegrityFailure { expected: header.crc32, actual });
    }
    Ok(())
}

/// One length-prefixed packet of coded payload.
#[derive(Debug, Clone)]
pub struct Packet {
    pub seq: u16,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        if self.payload.len() > MAX_PACKET_PAYLOAD {
            return Err(CodecError::ParameterOutOfRange(format!(
                "packet payload {} exceeds maximum {}",
                self.payload.len(),
                MAX_PACKET_PAYLOAD
            )));
        }
        out.extend_from_slice(&self.seq.to_be_bytes());
        out.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.payload);
        Ok(())
    }

    /// Parses one packet from `data` starting at byte 0, returning it and the
    /// number of bytes consumed.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < PACKET_HEADER_SIZE {
            return Err(CodecError::FormatReject("truncated packet header".into()));
        }
        let seq = u16::from_be_bytes([data[0], data[1]]);
        let length = u32::from_be_bytes([data[2], data[3], data[4], data[5]]) as usize;
        if data.len() < PACKET_HEADER_SIZE + length {
            return Err(CodecError::FormatReject("truncated packet payload".into()));
        }
        let payload = data[PACKET_HEADER_SIZE..PACKET_HEADER_SIZE + length].to_vec();
        Ok((Self { seq, payload }, PACKET_HEADER_SIZE + length))
    }
}

/// Splits `payload` into a sequence of packets, each at most `MAX_PACKET_PAYLOAD`
/// bytes, numbered sequentially from 0.
pub fn split_into_packets(payload: &[u8]) -> Vec<Packet> {
    if payload.is_empty() {
        return vec![Packet { seq: 0, payload: Vec::new() }];
    }
    payload
        .chunks(MAX_PACKET_PAYLOAD)
        .enumerate()
        .map(|(i, chunk)| Packet { seq: i as u16, payload: chunk.to_vec() })
        .collect()
}

/// Reassembles packets (in sequence order) back into one payload buffer.
pub fn join_packets(packets: &[Packet]) -> Vec<u8> {
    let mut out = Vec::new();
    for p in packets {
        out.extend_from_slice(&p.payload);
    }
    out
}

/// Parses every packet following the global header until `data` is exhausted.
pub fn decode_all_packets(data: &[u8]) -> Result<Vec<Packet>> {
    let mut packets = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let (packet, consumed) = Packet::decode(&data[pos..])?;
        pos += consumed;
        packets.push(packet);
    }
    Ok(packets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(crc32: u32) -> GlobalHeader {
        GlobalHeader {
            height: 100,
            width: 64,
            channels: 3,
            levels: 3,
            padded_height: 104,
            padded_width: 64,
            wavelet: WaveletType::Integer53,
            nbp: 9,
            crc32,
        }
    }

    #[test]
    fn header_roundtrip() {
        let header = sample_header(0xDEADBEEF);
        let bytes = header.encode();
        assert_eq!(bytes.len(), HEADER_SIZE + CRC_SIZE);
        let (decoded, consumed) = GlobalHeader::decode(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, header);
    }

    #[test]
    fn header_rejects_bad_magic() {
        let mut bytes = sample_header(0).encode();
        bytes[0] = b'X';
        assert!(matches!(GlobalHeader::decode(&bytes), Err(CodecError::FormatReject(_))));
    }

    #[test]
    fn header_rejects_bad_channel_count() {
        let mut header = sample_header(0);
        header.channels = 2;
        let bytes = header.encode();
        assert!(matches!(GlobalHeader::decode(&bytes), Err(CodecError::ParameterOutOfRange(_))));
    }

    #[test]
    fn payload_crc_matches_on_untouched_payload() {
        let payload = b"arithmetic bitstream bytes go here".to_vec();
        let header = sample_header(payload_crc32(&payload));
        assert!(verify_payload_crc(&header, &payload).is_ok());
    }

    #[test]
    fn payload_crc_detects_corruption() {
        let mut payload = b"arithmetic bitstream bytes go here".to_vec();
        let header = sample_header(payload_crc32(&payload));
        payload[3] ^= 0xFF;
        assert!(matches!(verify_payload_crc(&header, &payload), Err(CodecError::IntegrityFailure { .. })));
    }

    #[test]
    fn packet_roundtrip() {
        let packet = Packet { seq: 7, payload: vec![1, 2, 3, 4, 5] };
        let mut buf = Vec::new();
        packet.encode_into(&mut buf).unwrap();
        let (decoded, consumed) = Packet::decode(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded.seq, packet.seq);
        assert_eq!(decoded.payload, packet.payload);
    }

    #[test]
    fn split_and_join_roundtrip() {
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 256) as u8).collect();
        let packets = split_into_packets(&payload);
        assert!(packets.iter().all(|p| p.payload.len() <= MAX_PACKET_PAYLOAD));

        let mut buf = Vec::new();
        for p in &packets {
            p.encode_into(&mut buf).unwrap();
        }
        let decoded = decode_all_packets(&buf).unwrap();
        assert_eq!(join_packets(&decoded), payload);
    }

    #[test]
    fn empty_payload_produces_one_empty_packet() {
        let packets = split_into_packets(&[]);
        assert_eq!(packets.len(), 1);
        assert!(packets[0].payload.is_empty());
    }
}
