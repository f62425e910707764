use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use log::info;

use crate::error::RvsError;
use crate::video::FrameSink;

/// Drives the ffmpeg CLI to encode raw `rgb24` frames into FFV1 inside
/// Matroska, intra-only and lossless, so every pixel byte round-trips.
///
/// ffmpeg writes to a temporary sibling of the destination; the file is
/// renamed into place only when the encode finishes cleanly, so a failed
/// call never leaves partial output on disk.
pub struct FfmpegWriter {
    child: Child,
    tmp_path: PathBuf,
    final_path: PathBuf,
    frame_size: usize,
    frames_written: u64,
    finished: bool,
}

impl FfmpegWriter {
    pub fn create(path: &Path, width: u32, height: u32, fps: u32) -> Result<Self, RvsError> {
        let final_path = path.to_path_buf();
        let mut tmp_name = final_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = final_path.with_file_name(tmp_name);

        let child = Command::new("ffmpeg")
            .args([
                "-y",
                "-f",
                "rawvideo",
                "-pixel_format",
                "rgb24",
                "-video_size",
                &format!("{width}x{height}"),
                "-framerate",
                &fps.to_string(),
                "-i",
                "pipe:0",
                "-c:v",
                "ffv1",
                "-level",
                "3",
                "-slices",
                "4",
                "-slicecrc",
                "1",
                "-f",
                "matroska",
            ])
            .arg(&tmp_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
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
            tmp_path,
            final_path,
            frame_size: width as usize * height as usize * 3,
            frames_written: 0,
            finished: false,
        })
    }

    fn cleanup(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = fs::remove_file(&self.tmp_path);
    }
}

impl FrameSink for FfmpegWriter {
    fn write_frame(&mut self, rgb: &[u8]) -> Result<(), RvsError> {
        if rgb.len() != self.frame_size {
            return Err(RvsError::InvalidInput(format!(
                "frame of {} bytes, expected {}",
                rgb.len(),
                self.frame_size
            )));
        }

        let stdin = self
            .child
            .stdin
            .as_mut()
            .expect("ffmpeg spawned with piped stdin");
        if let Err(e) = stdin.write_all(rgb) {
            self.cleanup();
            return Err(e.into());
        }
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RvsError> {
        drop(self.child.stdin.take());

        let status = match self.child.wait() {
            Ok(status) => status,
            Err(e) => {
                let _ = fs::remove_file(&self.tmp_path);
                return Err(e.into());
            }
        };
        if !status.success() {
            let _ = fs::remove_file(&self.tmp_path);
            return Err(RvsError::Io(std::io::Error::other(format!(
                "ffmpeg exited with status {status}"
            ))));
        }

        fs::rename(&self.tmp_path, &self.final_path)?;
        self.finished = true;
        info!(
            "wrote {} frames to {}",
            self.frames_written,
            self.final_path.display()
        );
        Ok(())
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if !self.finished {
            self.cleanup();
        }
    }
}
