use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::config;
use crate::integrity;

/// Why a byte buffer failed to parse as a metadata record. The pipeline
/// folds all of these into `RvsError::InvalidVideo` once the frame scan
/// gives up.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("buffer too short for metadata header")]
    TooShort,
    #[error("bad magic")]
    BadMagic,
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),
    #[error("header CRC mismatch: stored 0x{stored:08X}, computed 0x{computed:08X}")]
    CrcMismatch { stored: u32, computed: u32 },
    #[error("file name is not valid UTF-8")]
    InvalidName,
}

/// The self-describing record carried by the leading frames of every video:
///
/// `magic(4) | version(1) | flags(1) | N(4) | B(4) | file_size(8) |
///  name_len(2) | name(name_len) | header_crc32(4)`
///
/// All integers little-endian; the CRC covers every preceding byte. When the
/// stream is encrypted, `name` refers to the plaintext file while
/// `file_size` is the envelope (ciphertext) length; the decoder chunks and
/// trims the envelope before opening it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub flags: u8,
    pub num_chunks: u32,
    pub chunk_size: u32,
    pub file_size: u64,
    pub file_name: String,
}

const OFF_MAGIC: usize = 0;
const OFF_VERSION: usize = 4;
const OFF_FLAGS: usize = 5;
const OFF_NUM_CHUNKS: usize = 6;
const OFF_CHUNK_SIZE: usize = 10;
const OFF_FILE_SIZE: usize = 14;
const OFF_NAME_LEN: usize = 22;
const OFF_NAME: usize = 24;

/// Bytes before the variable-length name.
pub const FIXED_PREFIX: usize = OFF_NAME;

impl Metadata {
    pub fn is_encrypted(&self) -> bool {
        self.flags & config::FLAG_ENCRYPTED != 0
    }

    pub fn serialize(&self) -> Vec<u8> {
        let name = self.file_name.as_bytes();
        debug_assert!(name.len() <= u16::MAX as usize);

        let mut out = vec![0u8; FIXED_PREFIX + name.len() + 4];
        out[OFF_MAGIC..OFF_MAGIC + 4].copy_from_slice(&config::MAGIC);
        out[OFF_VERSION] = config::FORMAT_VERSION;
        out[OFF_FLAGS] = self.flags;
        LittleEndian::write_u32(&mut out[OFF_NUM_CHUNKS..], self.num_chunks);
        LittleEndian::write_u32(&mut out[OFF_CHUNK_SIZE..], self.chunk_size);
        LittleEndian::write_u64(&mut out[OFF_FILE_SIZE..], self.file_size);
        LittleEndian::write_u16(&mut out[OFF_NAME_LEN..], name.len() as u16);
        out[OFF_NAME..OFF_NAME + name.len()].copy_from_slice(name);

        let crc = integrity::crc32(&out[..OFF_NAME + name.len()]);
        let crc_off = OFF_NAME + name.len();
        LittleEndian::write_u32(&mut out[crc_off..], crc);
        out
    }

    /// Total serialized length of the record starting at `buf`, validating
    /// only the fixed prefix. Used to decide whether the record spills past
    /// the first metadata frame.
    pub fn required_len(buf: &[u8]) -> Result<usize, MetadataError> {
        if buf.len() < FIXED_PREFIX {
            return Err(MetadataError::TooShort);
        }
        if buf[OFF_MAGIC..OFF_MAGIC + 4] != config::MAGIC {
            return Err(MetadataError::BadMagic);
        }
        if buf[OFF_VERSION] != config::FORMAT_VERSION {
            return Err(MetadataError::UnsupportedVersion(buf[OFF_VERSION]));
        }
        let name_len = LittleEndian::read_u16(&buf[OFF_NAME_LEN..]) as usize;
        Ok(FIXED_PREFIX + name_len + 4)
    }

    pub fn deserialize(buf: &[u8]) -> Result<Metadata, MetadataError> {
        let total = Self::required_len(buf)?;
        if buf.len() < total {
            return Err(MetadataError::TooShort);
        }

        let crc_off = total - 4;
        let stored = LittleEndian::read_u32(&buf[crc_off..]);
        let computed = integrity::crc32(&buf[..crc_off]);
        if stored != computed {
            return Err(MetadataError::CrcMismatch { stored, computed });
        }

        let name_len = LittleEndian::read_u16(&buf[OFF_NAME_LEN..]) as usize;
        let file_name = std::str::from_utf8(&buf[OFF_NAME..OFF_NAME + name_len])
            .map_err(|_| MetadataError::InvalidName)?
            .to_string();

        Ok(Metadata {
            flags: buf[OFF_FLAGS],
            num_chunks: LittleEndian::read_u32(&buf[OFF_NUM_CHUNKS..]),
            chunk_size: LittleEndian::read_u32(&buf[OFF_CHUNK_SIZE..]),
            file_size: LittleEndian::read_u64(&buf[OFF_FILE_SIZE..]),
            file_name,
        })
    }
}
