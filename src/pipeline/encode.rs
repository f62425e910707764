use std::fs;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;

use crate::chunker;
use crate::config::{self, RvsConfig};
use crate::crypto;
use crate::error::RvsError;
use crate::fountain::FountainEncoder;
use crate::frame::FramePacker;
use crate::metadata::Metadata;
use crate::packet;
use crate::video::{FfmpegWriter, FrameSink};

/// Full encode pipeline: file -> [encrypt] -> chunks -> fountain packets ->
/// frames -> FFV1 video.
pub fn encode_file(
    input_path: &Path,
    output_path: &Path,
    password: Option<&str>,
    cfg: &RvsConfig,
) -> Result<(), RvsError> {
    cfg.validate()?;

    info!(
        "encoding {} -> {}",
        input_path.display(),
        output_path.display()
    );
    let data = fs::read(input_path)?;
    if data.is_empty() {
        return Err(RvsError::InvalidInput(format!(
            "input file {} is empty",
            input_path.display()
        )));
    }
    let file_name = input_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut sink = FfmpegWriter::create(output_path, cfg.width, cfg.height, cfg.fps)?;
    encode_stream(&data, &file_name, password, rand::random(), cfg, &mut sink)?;
    sink.finish()?;

    info!("encode complete: {}", output_path.display());
    Ok(())
}

/// Encode an in-memory buffer into frames on any sink. `base_seed` offsets
/// the fountain packet seeds; the output is fully determined by the
/// arguments, so tests inject a fixed value while `encode_file` draws a
/// fresh one per call. The sink is not finished here.
pub fn encode_stream(
    data: &[u8],
    file_name: &str,
    password: Option<&str>,
    base_seed: u32,
    cfg: &RvsConfig,
    sink: &mut dyn FrameSink,
) -> Result<(), RvsError> {
    cfg.validate()?;
    if data.is_empty() {
        return Err(RvsError::InvalidInput("input is empty".into()));
    }
    if file_name.len() > u16::MAX as usize {
        return Err(RvsError::InvalidInput("file name too long".into()));
    }

    // Encryption is end-to-end: one envelope around the whole file, and the
    // envelope bytes are what gets chunked.
    let envelope;
    let (bytes, flags) = match password {
        Some(pw) => {
            envelope = crypto::seal(data, pw)?;
            (envelope.as_slice(), config::FLAG_ENCRYPTED)
        }
        None => (data, 0u8),
    };

    let chunks = chunker::split(bytes, cfg.chunk_size as usize)?;
    let num_chunks = chunks.len() as u32;

    let packer = FramePacker::new(cfg.width, cfg.height);
    let required = packet::packet_len(num_chunks, cfg.chunk_size as usize);
    if required > cfg.frame_capacity() {
        return Err(RvsError::InvalidInput(format!(
            "packet of {} bytes exceeds the {}x{} frame capacity of {} bytes",
            required,
            cfg.width,
            cfg.height,
            cfg.frame_capacity()
        )));
    }

    let meta = Metadata {
        flags,
        num_chunks,
        chunk_size: cfg.chunk_size,
        file_size: bytes.len() as u64,
        file_name: file_name.to_string(),
    };
    for piece in meta.serialize().chunks(packer.capacity()) {
        sink.write_frame(&packer.pack(piece)?)?;
    }

    let encoder = FountainEncoder::with_seed(&chunks, cfg.redundancy, base_seed)?;
    let num_packets = encoder.packet_count();
    info!("split into {num_chunks} chunks, emitting {num_packets} packets");

    let progress = ProgressBar::new(num_packets as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} packets ({eta})")
            .unwrap()
            .progress_chars("##-"),
    );

    // Packet generation is pure per index: fan out, then emit in order.
    let serialized: Vec<Vec<u8>> = (0..num_packets)
        .into_par_iter()
        .map(|k| {
            let packet_bytes = encoder.packet(k).serialize();
            progress.inc(1);
            packet_bytes
        })
        .collect();
    progress.finish_and_clear();

    for packet_bytes in &serialized {
        sink.write_frame(&packer.pack(packet_bytes)?)?;
    }

    Ok(())
}
