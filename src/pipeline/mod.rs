pub mod decode;
pub mod encode;
pub mod hook;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::Result;
use log::info;
use sha2::{Digest, Sha256};

use crate::config::RvsConfig;
use hook::PipelineHook;

/// Outcome of an encode → hook → decode verification pass.
pub struct RoundtripResult {
    /// SHA-256 hex digest of the original input file.
    pub original_sha256: String,
    /// SHA-256 hex digest of the decoded output file.
    pub decoded_sha256: String,
    /// `true` if the digests match (the video round-tripped losslessly).
    pub matched: bool,
}

/// Encode `input` to `encoded_path`, hand the video to `hook` (the seam
/// where an upload/download against VK Video or RuTube plugs in), decode
/// whatever path the hook returns into `output`, and compare digests.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use rvs::{roundtrip, NoopHook, RvsConfig};
///
/// let result = roundtrip(
///     Path::new("input.bin"),
///     Path::new("encoded.mkv"),
///     Path::new("output.bin"),
///     Some("my-password"),
///     &RvsConfig::default(),
///     &NoopHook,
/// ).unwrap();
///
/// assert!(result.matched, "round-trip failed: {} != {}", result.original_sha256, result.decoded_sha256);
/// ```
pub fn roundtrip<H: PipelineHook>(
    input: &Path,
    encoded_path: &Path,
    output: &Path,
    password: Option<&str>,
    cfg: &RvsConfig,
    hook: &H,
) -> Result<RoundtripResult> {
    let original_sha256 = hex_digest(input)?;

    encode::encode_file(input, encoded_path, password, cfg)?;
    info!("handing {} to the '{}' hook", encoded_path.display(), hook.name());
    let decode_from = hook.after_encode(encoded_path)?;
    decode::decode_file(&decode_from, output, password)?;

    let decoded_sha256 = hex_digest(output)?;
    let matched = original_sha256 == decoded_sha256;
    info!(
        "roundtrip {}: {} -> {}",
        if matched { "ok" } else { "MISMATCH" },
        original_sha256,
        decoded_sha256
    );

    Ok(RoundtripResult {
        original_sha256,
        decoded_sha256,
        matched,
    })
}

fn hex_digest(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1 << 20];
    loop {
        match file.read(&mut buf)? {
            0 => break,
            n => hasher.update(&buf[..n]),
        }
    }
    Ok(format!("{:x}", hasher.finalize()))
}
