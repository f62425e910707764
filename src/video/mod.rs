pub mod reader;
pub mod writer;

use std::path::Path;
use std::process::Command;

pub use reader::FfmpegReader;
pub use writer::FfmpegWriter;

use crate::error::RvsError;

/// Where encoded frames go. The codec behind this is interchangeable as
/// long as every pixel byte round-trips exactly.
pub trait FrameSink {
    /// Write one full frame of raw `rgb24` bytes (width × height × 3).
    fn write_frame(&mut self, rgb: &[u8]) -> Result<(), RvsError>;

    /// Flush and close the stream. Must be called exactly once; a sink
    /// dropped without `finish` leaves no output behind.
    fn finish(&mut self) -> Result<(), RvsError>;
}

/// Where decoded frames come from.
pub trait FrameSource {
    /// Read the next frame of raw `rgb24` bytes, or `None` at end of stream.
    fn read_frame(&mut self) -> Result<Option<Vec<u8>>, RvsError>;
}

/// Ask ffprobe for the pixel dimensions of the first video stream.
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32), RvsError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("failed to run ffprobe — is ffmpeg installed? ({e})"),
            )
        })?;

    if !output.status.success() {
        return Err(RvsError::InvalidVideo(format!(
            "ffprobe could not read {}",
            path.display()
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let mut fields = text.trim().split(',');
    let width = fields.next().and_then(|v| v.trim().parse().ok());
    let height = fields.next().and_then(|v| v.trim().parse().ok());
    match (width, height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(RvsError::InvalidVideo(format!(
            "no video stream dimensions in {}",
            path.display()
        ))),
    }
}
