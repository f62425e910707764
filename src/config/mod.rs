use crate::error::RvsError;

pub const MAGIC: [u8; 4] = *b"RVS1";
pub const FORMAT_VERSION: u8 = 1;

// Metadata flag bits
pub const FLAG_ENCRYPTED: u8 = 0x01;

// Video parameters
pub const DEFAULT_FRAME_WIDTH: u32 = 3840;
pub const DEFAULT_FRAME_HEIGHT: u32 = 2160;
pub const DEFAULT_FPS: u32 = 30;

// Data parameters
pub const DEFAULT_CHUNK_SIZE: u32 = 4096;
pub const DEFAULT_REDUNDANCY: f64 = 0.30;
pub const MAX_REDUNDANCY: f64 = 2.0;

// Robust Soliton degree distribution. Tunable; the chunk selection rides
// inside each packet, so changing these does not break existing videos.
pub const SOLITON_C: f64 = 0.03;
pub const SOLITON_DELTA: f64 = 0.5;

// AEAD envelope geometry: salt | nonce field | tag | ciphertext.
// The nonce field is 16 bytes with a 12-byte AES-GCM nonce at the front;
// the trailing 4 bytes are reserved and ignored on read.
pub const SALT_SIZE: usize = 16;
pub const NONCE_FIELD_SIZE: usize = 16;
pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;
pub const ENVELOPE_OVERHEAD: usize = SALT_SIZE + NONCE_FIELD_SIZE + TAG_SIZE;

// PBKDF2-HMAC-SHA256 parameters
pub const PBKDF2_ROUNDS: u32 = 100_000;
pub const KEY_SIZE: usize = 32;

/// How many leading frames the reader scans for a valid metadata header
/// before declaring the video invalid.
pub const METADATA_SCAN_LIMIT: usize = 8;

/// Runtime options for an encode operation. Decoding derives everything it
/// needs from the metadata preamble and the video itself.
#[derive(Debug, Clone)]
pub struct RvsConfig {
    pub chunk_size: u32,
    pub redundancy: f64,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for RvsConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            redundancy: DEFAULT_REDUNDANCY,
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
            fps: DEFAULT_FPS,
        }
    }
}

impl RvsConfig {
    /// Bytes one frame can carry: three channels per pixel, row-major.
    pub fn frame_capacity(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    pub fn validate(&self) -> Result<(), RvsError> {
        if self.chunk_size == 0 {
            return Err(RvsError::InvalidInput("chunk_size must be non-zero".into()));
        }
        if !(0.0..=MAX_REDUNDANCY).contains(&self.redundancy) {
            return Err(RvsError::InvalidInput(format!(
                "redundancy {} out of range 0.0..={}",
                self.redundancy, MAX_REDUNDANCY
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(RvsError::InvalidInput(
                "frame dimensions must be non-zero".into(),
            ));
        }
        if self.fps == 0 {
            return Err(RvsError::InvalidInput("fps must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RvsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_frame_capacity() {
        let cfg = RvsConfig::default();
        assert_eq!(cfg.frame_capacity(), 3840 * 2160 * 3);
    }

    #[test]
    fn test_rejects_out_of_range_options() {
        let mut cfg = RvsConfig::default();
        cfg.redundancy = -0.1;
        assert!(matches!(cfg.validate(), Err(RvsError::InvalidInput(_))));

        let mut cfg = RvsConfig::default();
        cfg.redundancy = 2.5;
        assert!(matches!(cfg.validate(), Err(RvsError::InvalidInput(_))));

        let mut cfg = RvsConfig::default();
        cfg.chunk_size = 0;
        assert!(matches!(cfg.validate(), Err(RvsError::InvalidInput(_))));
    }
}
