use crate::error::RvsError;

/// Maps opaque bytes onto the pixels of one fixed-resolution RGB frame.
///
/// Bytes fill pixels in row-major order, channel order R, G, B, which for
/// an 8-bit `rgb24` raw frame is simply the byte order of the buffer. The
/// tail of the frame is zero padding; records are self-delimiting, so no
/// sentinel is needed. The lossless codec must round-trip every byte, so
/// there is no error correction or dithering at this layer.
#[derive(Debug, Clone)]
pub struct FramePacker {
    capacity: usize,
}

impl FramePacker {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            capacity: width as usize * height as usize * 3,
        }
    }

    /// Reader-side constructor: the decoder only knows the byte size of the
    /// frames the stream hands it, not the resolution they came from.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Bytes one frame carries: three channels per pixel.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lay `bytes` into a full frame buffer, zero-padded to capacity.
    pub fn pack(&self, bytes: &[u8]) -> Result<Vec<u8>, RvsError> {
        if bytes.len() > self.capacity {
            return Err(RvsError::InvalidInput(format!(
                "record of {} bytes exceeds frame capacity {}",
                bytes.len(),
                self.capacity
            )));
        }
        let mut frame = vec![0u8; self.capacity];
        frame[..bytes.len()].copy_from_slice(bytes);
        Ok(frame)
    }

    /// View a frame's bytes, rejecting frames whose size does not match the
    /// stream's geometry (a resolution change mid-stream, or a truncated
    /// read).
    pub fn unpack<'a>(&self, frame: &'a [u8]) -> Result<&'a [u8], RvsError> {
        if frame.len() != self.capacity {
            return Err(RvsError::InvalidVideo(format!(
                "frame of {} bytes does not match the stream's frame capacity {}",
                frame.len(),
                self.capacity
            )));
        }
        Ok(frame)
    }
}
