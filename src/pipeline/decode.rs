use std::fs;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};

use crate::chunker;
use crate::config;
use crate::crypto;
use crate::error::RvsError;
use crate::fountain::FountainDecoder;
use crate::frame::FramePacker;
use crate::metadata::Metadata;
use crate::packet::{self, Packet};
use crate::video::{self, FfmpegReader, FrameSource};

/// Everything a decode recovers: the preamble record and the file bytes.
pub struct DecodedFile {
    pub metadata: Metadata,
    pub data: Vec<u8>,
}

/// Full decode pipeline: FFV1 video -> frames -> fountain packets ->
/// chunks -> [decrypt] -> file. Every parameter beyond the password comes
/// from the metadata preamble.
pub fn decode_file(
    input_path: &Path,
    output_path: &Path,
    password: Option<&str>,
) -> Result<(), RvsError> {
    let (width, height) = video::probe_dimensions(input_path)?;
    info!(
        "decoding {} ({}x{}) -> {}",
        input_path.display(),
        width,
        height,
        output_path.display()
    );

    let mut source = FfmpegReader::open(input_path, width, height)?;
    let decoded = decode_stream(&mut source, password)?;
    info!(
        "recovered '{}' ({} bytes)",
        decoded.metadata.file_name,
        decoded.data.len()
    );

    write_atomic(output_path, &decoded.data)?;
    info!("decode complete: {}", output_path.display());
    Ok(())
}

/// Decode frames from any source. Stops reading as soon as the fountain
/// decoder reaches full rank.
pub fn decode_stream(
    source: &mut dyn FrameSource,
    password: Option<&str>,
) -> Result<DecodedFile, RvsError> {
    let (meta, capacity) = read_preamble(source)?;
    debug!(
        "preamble: name='{}' chunks={} chunk_size={} file_size={} encrypted={}",
        meta.file_name,
        meta.num_chunks,
        meta.chunk_size,
        meta.file_size,
        meta.is_encrypted()
    );

    if meta.num_chunks == 0 || meta.chunk_size == 0 {
        return Err(RvsError::InvalidVideo(
            "metadata declares an empty stream".into(),
        ));
    }
    let chunk_size = meta.chunk_size as usize;
    if meta.file_size > meta.num_chunks as u64 * meta.chunk_size as u64 {
        return Err(RvsError::InvalidVideo(format!(
            "declared file size {} does not fit in {} chunks of {} bytes",
            meta.file_size, meta.num_chunks, meta.chunk_size
        )));
    }
    if packet::packet_len(meta.num_chunks, chunk_size) > capacity {
        return Err(RvsError::InvalidVideo(format!(
            "declared packet size {} exceeds the video's frame capacity {}",
            packet::packet_len(meta.num_chunks, chunk_size),
            capacity
        )));
    }
    // fail before consuming the stream rather than after
    if meta.is_encrypted() && password.is_none() {
        return Err(RvsError::AuthFailure(
            "stream is encrypted and no password was provided".into(),
        ));
    }

    let packer = FramePacker::with_capacity(capacity);
    let mut decoder = FountainDecoder::new(meta.num_chunks, chunk_size);
    let progress = ProgressBar::new(meta.num_chunks as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.green/black} {pos}/{len} chunks ({eta})")
            .unwrap()
            .progress_chars("##-"),
    );

    let mut frames = 0u64;
    while !decoder.is_complete() {
        let Some(frame) = source.read_frame()? else {
            break;
        };
        frames += 1;
        let frame_bytes = packer.unpack(&frame)?;
        match Packet::deserialize(frame_bytes, meta.num_chunks, chunk_size) {
            Ok(pkt) => {
                decoder.add_packet(&pkt)?;
                progress.set_position(decoder.solved_count() as u64);
            }
            Err(e) => debug!("skipping undecodable frame: {e}"),
        }
    }
    progress.finish_and_clear();
    info!(
        "consumed {} data frames ({} failed their CRC)",
        frames,
        decoder.discarded()
    );

    let payloads = decoder.finish()?;
    let bytes = chunker::reassemble(payloads, meta.file_size);

    let data = if meta.is_encrypted() {
        let pw = password.expect("presence checked before decoding");
        crypto::open(&bytes, pw)?
    } else {
        bytes
    };

    Ok(DecodedFile {
        metadata: meta,
        data,
    })
}

/// Locate and parse the metadata preamble, scanning a bounded number of
/// leading frames for a valid header before giving up.
fn read_preamble(source: &mut dyn FrameSource) -> Result<(Metadata, usize), RvsError> {
    let mut scanned = 0usize;
    loop {
        let Some(frame) = source.read_frame()? else {
            return Err(RvsError::InvalidVideo(
                "stream ended before a metadata header was found".into(),
            ));
        };
        scanned += 1;
        let capacity = frame.len();

        match Metadata::required_len(&frame) {
            Ok(required) if required <= capacity => match Metadata::deserialize(&frame) {
                Ok(meta) => return Ok((meta, capacity)),
                Err(e) => debug!("frame {scanned}: {e}"),
            },
            Ok(required) => {
                // the record spills into the following preamble frames
                let mut buf = frame;
                while buf.len() < required {
                    let Some(next) = source.read_frame()? else {
                        return Err(RvsError::InvalidVideo(
                            "metadata preamble truncated".into(),
                        ));
                    };
                    buf.extend_from_slice(&next);
                }
                return match Metadata::deserialize(&buf) {
                    Ok(meta) => Ok((meta, capacity)),
                    Err(e) => Err(RvsError::InvalidVideo(format!(
                        "metadata preamble corrupt: {e}"
                    ))),
                };
            }
            Err(e) => debug!("frame {scanned}: {e}"),
        }

        if scanned >= config::METADATA_SCAN_LIMIT {
            return Err(RvsError::InvalidVideo(format!(
                "no valid metadata header within the first {} frames",
                config::METADATA_SCAN_LIMIT
            )));
        }
    }
}

/// Write via a temporary sibling and rename, so failures leave nothing
/// half-written at the destination.
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), RvsError> {
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    if let Err(e) = fs::write(&tmp_path, data) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}
