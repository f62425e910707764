use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::fountain::ChunkMask;
use crate::integrity;

/// Why a frame failed to parse as a packet. Malformed frames are discarded
/// by the decoder (the fountain code absorbs the loss); these never surface
/// past the pipeline.
#[derive(Error, Debug)]
pub enum PacketError {
    #[error("buffer too short: need {need} bytes, have {have}")]
    BufferTooShort { need: usize, have: usize },
    #[error("mask length mismatch: expected {expected} chunks, got {got}")]
    MaskLenMismatch { expected: u32, got: u32 },
}

/// One fountain packet: the XOR of the source chunks named by `mask`.
///
/// Wire form, all integers little-endian:
/// `seed(4) | mask_len(4) | mask_bits(ceil(mask_len/8)) | xor_crc(4) | xor_payload(B)`.
/// `mask_len` is a bit count and must equal the chunk count from the
/// metadata preamble, which makes the record self-delimiting inside a
/// zero-padded frame.
#[derive(Debug, Clone)]
pub struct Packet {
    pub seed: u32,
    pub mask: ChunkMask,
    pub xor_crc: u32,
    pub payload: Vec<u8>,
}

const OFF_SEED: usize = 0;
const OFF_MASK_LEN: usize = 4;
const OFF_MASK_BITS: usize = 8;

/// Serialized packet size for a given geometry.
pub fn packet_len(num_chunks: u32, chunk_size: usize) -> usize {
    OFF_MASK_BITS + (num_chunks as usize + 7) / 8 + 4 + chunk_size
}

impl Packet {
    pub fn verify_crc(&self) -> bool {
        integrity::crc32(&self.payload) == self.xor_crc
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mask_bytes = self.mask.to_bytes();
        let mut out = vec![0u8; OFF_MASK_BITS + mask_bytes.len() + 4 + self.payload.len()];

        LittleEndian::write_u32(&mut out[OFF_SEED..], self.seed);
        LittleEndian::write_u32(&mut out[OFF_MASK_LEN..], self.mask.len());
        out[OFF_MASK_BITS..OFF_MASK_BITS + mask_bytes.len()].copy_from_slice(&mask_bytes);
        let off_crc = OFF_MASK_BITS + mask_bytes.len();
        LittleEndian::write_u32(&mut out[off_crc..], self.xor_crc);
        out[off_crc + 4..].copy_from_slice(&self.payload);
        out
    }

    /// Parse a packet from the head of `buf` (typically a full frame whose
    /// tail is zero padding). `num_chunks` and `chunk_size` come from the
    /// metadata preamble.
    pub fn deserialize(
        buf: &[u8],
        num_chunks: u32,
        chunk_size: usize,
    ) -> Result<Packet, PacketError> {
        let need = packet_len(num_chunks, chunk_size);
        if buf.len() < need {
            return Err(PacketError::BufferTooShort {
                need,
                have: buf.len(),
            });
        }

        let seed = LittleEndian::read_u32(&buf[OFF_SEED..]);
        let mask_len = LittleEndian::read_u32(&buf[OFF_MASK_LEN..]);
        if mask_len != num_chunks {
            return Err(PacketError::MaskLenMismatch {
                expected: num_chunks,
                got: mask_len,
            });
        }

        let mask_bytes = (num_chunks as usize + 7) / 8;
        let mask = ChunkMask::from_bytes(num_chunks, &buf[OFF_MASK_BITS..OFF_MASK_BITS + mask_bytes]);
        let off_crc = OFF_MASK_BITS + mask_bytes;
        let xor_crc = LittleEndian::read_u32(&buf[off_crc..]);
        let payload = buf[off_crc + 4..off_crc + 4 + chunk_size].to_vec();

        Ok(Packet {
            seed,
            mask,
            xor_crc,
            payload,
        })
    }
}
