use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use log::debug;

use crate::error::RvsError;
use crate::video::FrameSource;

/// Drives the ffmpeg CLI to decode a video back into raw `rgb24` frames,
/// read one frame at a time off the pipe so memory stays bounded by a
/// single frame.
pub struct FfmpegReader {
    child: Child,
    frame_size: usize,
    frames_read: u64,
    done: bool,
}

impl FfmpegReader {
    pub fn open(path: &Path, width: u32, height: u32) -> Result<Self, RvsError> {
        let child = Command::new("ffmpeg")
            .arg("-i")
            .arg(path)
            .args(["-f", "rawvideo", "-pixel_format", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!("failed to spawn ffmpeg — is it installed? ({e})"),
                )
            })?;

        Ok(Self {
            child,
            frame_size: width as usize * height as usize * 3,
            frames_read: 0,
            done: false,
        })
    }
}

impl FrameSource for FfmpegReader {
    fn read_frame(&mut self) -> Result<Option<Vec<u8>>, RvsError> {
        if self.done {
            return Ok(None);
        }

        let stdout = self
            .child
            .stdout
            .as_mut()
            .expect("ffmpeg spawned with piped stdout");
        let mut frame = vec![0u8; self.frame_size];
        if read_exact_or_eof(stdout, &mut frame)? {
            self.frames_read += 1;
            return Ok(Some(frame));
        }

        // clean EOF: make sure ffmpeg itself was happy with the input
        self.done = true;
        let status = self.child.wait()?;
        if !status.success() {
            return Err(RvsError::InvalidVideo(format!(
                "ffmpeg exited with status {status} while decoding"
            )));
        }
        debug!("video stream ended after {} frames", self.frames_read);
        Ok(None)
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Read exactly `buf.len()` bytes, returning Ok(false) on clean EOF.
fn read_exact_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "partial frame read",
                ));
            }
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}
