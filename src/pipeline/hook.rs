use std::path::{Path, PathBuf};

use anyhow::Result;

/// The only seam the codec exposes to platform clients.
///
/// A [`roundtrip`](super::roundtrip) hands the freshly encoded video to the
/// hook and decodes whatever file the hook points back at. A real
/// implementation pushes the video through a hosting platform (VK Video,
/// RuTube) and returns the downloaded copy, which is how re-encoding damage
/// gets caught: if the platform preserved the stream bit-exactly the digests
/// match, and if it recompressed, the fountain decode either absorbs the
/// loss or surfaces `IncompleteRecovery`.
///
/// Errors are the hook's own business (HTTP failures, quota, timeouts), so
/// the signature stays on `anyhow`; the codec never inspects them beyond
/// aborting the roundtrip.
///
/// # Example
///
/// ```rust
/// use std::path::{Path, PathBuf};
/// use anyhow::Result;
/// use rvs::PipelineHook;
///
/// struct VkVideoHook {
///     download_dir: PathBuf,
/// }
///
/// impl PipelineHook for VkVideoHook {
///     fn name(&self) -> &str {
///         "vk-video"
///     }
///
///     fn after_encode(&self, encoded_path: &Path) -> Result<PathBuf> {
///         let video_id = encoded_path; // upload encoded_path, keep the id
///         let fetched = self.download_dir.join("fetched.mkv");
///         let _ = video_id; // download the video back into `fetched`
///         Ok(fetched)
///     }
/// }
/// ```
pub trait PipelineHook {
    /// Label used in roundtrip log lines.
    fn name(&self) -> &str {
        "hook"
    }

    /// Receives the local path of the encoded `.mkv`; returns the path the
    /// decoder should read. Returning `encoded_path` unchanged skips the
    /// platform leg entirely.
    fn after_encode(&self, encoded_path: &Path) -> Result<PathBuf>;
}

/// Decodes straight from the encoded file, with no platform in between.
pub struct NoopHook;

impl PipelineHook for NoopHook {
    fn name(&self) -> &str {
        "noop"
    }

    fn after_encode(&self, encoded_path: &Path) -> Result<PathBuf> {
        Ok(encoded_path.into())
    }
}
