//! End-to-end pipeline properties over an in-memory frame transport.
//!
//! Everything here exercises the real encode/decode pipeline — metadata
//! preamble, packet framing, fountain code, AEAD envelope — with frames held
//! in memory instead of run through the ffmpeg subprocess (covered by the
//! ignored tests in `video_roundtrip.rs`).

use rvs::video::{FrameSink, FrameSource};
use rvs::{decode_stream, encode_stream, DecodedFile, RvsConfig, RvsError};

/// Collects frames instead of encoding them.
#[derive(Default)]
struct MemorySink {
    frames: Vec<Vec<u8>>,
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, rgb: &[u8]) -> Result<(), RvsError> {
        self.frames.push(rgb.to_vec());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RvsError> {
        Ok(())
    }
}

/// Replays collected frames.
struct MemorySource {
    frames: std::collections::VecDeque<Vec<u8>>,
}

impl MemorySource {
    fn new(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl FrameSource for MemorySource {
    fn read_frame(&mut self) -> Result<Option<Vec<u8>>, RvsError> {
        Ok(self.frames.pop_front())
    }
}

/// The PRNG the fountain encoder is specified against (including its
/// warm-up rounds), reused here to make deterministic test payloads and
/// shuffles.
struct XorShift32(u32);

impl XorShift32 {
    fn new(seed: u32) -> Self {
        let mut rng = Self(if seed == 0 { 0x9E37_79B9 } else { seed });
        for _ in 0..8 {
            rng.next_u32();
        }
        rng
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    fn bytes(&mut self, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        for word in out.chunks_mut(4) {
            let b = self.next_u32().to_le_bytes();
            word.copy_from_slice(&b[..word.len()]);
        }
        out
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next_u32() % (i as u32 + 1)) as usize;
            items.swap(i, j);
        }
    }
}

/// Small frames keep the in-memory streams cheap; 48x32x3 = 4608 bytes is
/// still enough for a 4096-byte chunk plus packet header at N <= 2560.
fn test_config(chunk_size: u32, redundancy: f64) -> RvsConfig {
    RvsConfig {
        chunk_size,
        redundancy,
        width: 48,
        height: 32,
        fps: 30,
    }
}

fn encode_to_frames(
    data: &[u8],
    password: Option<&str>,
    seed: u32,
    cfg: &RvsConfig,
) -> Vec<Vec<u8>> {
    let mut sink = MemorySink::default();
    encode_stream(data, "test.bin", password, seed, cfg, &mut sink).expect("encode failed");
    sink.frames
}

fn decode_frames(frames: Vec<Vec<u8>>, password: Option<&str>) -> Result<DecodedFile, RvsError> {
    let mut source = MemorySource::new(frames);
    decode_stream(&mut source, password)
}

#[test]
fn tiny_file_roundtrip() {
    let data = b"hello world";
    let cfg = test_config(4096, 0.30);
    let frames = encode_to_frames(data, None, 0, &cfg);

    // one metadata frame, one systematic packet, one redundant packet
    assert_eq!(frames.len(), 3);

    let decoded = decode_frames(frames, None).unwrap();
    assert_eq!(decoded.data, data);
    assert_eq!(decoded.metadata.file_size, 11);
    assert_eq!(decoded.metadata.num_chunks, 1);
    assert_eq!(decoded.metadata.file_name, "test.bin");
    assert!(!decoded.metadata.is_encrypted());
}

#[test]
fn exact_chunk_boundary_roundtrip() {
    let data = vec![0u8; 4096];
    let cfg = test_config(4096, 0.30);
    let frames = encode_to_frames(&data, None, 0, &cfg);
    assert_eq!(frames.len(), 3); // N = 1 at the boundary, no empty tail chunk

    let decoded = decode_frames(frames, None).unwrap();
    assert_eq!(decoded.data, data);
}

#[test]
fn multi_chunk_ten_mebibytes() {
    let data = XorShift32::new(0xC0FFEE).bytes(10 * 1024 * 1024);
    let cfg = test_config(4096, 0.30);
    let frames = encode_to_frames(&data, None, 0, &cfg);

    // N = 2560 chunks, M = ceil(2560 * 1.3) = 3328 packets, 1 metadata frame
    assert_eq!(frames.len(), 1 + 3328);

    let decoded = decode_frames(frames, None).unwrap();
    assert_eq!(decoded.metadata.num_chunks, 2560);
    assert_eq!(decoded.data.len(), data.len());
    assert_eq!(decoded.data, data);

    let crc = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);
    assert_eq!(crc.checksum(&decoded.data), crc.checksum(&data));
}

#[test]
fn survives_dropping_a_quarter_of_data_frames() {
    let data = XorShift32::new(0x51).bytes(64 * 512);
    let cfg = test_config(512, 2.0);
    let frames = encode_to_frames(&data, None, 3, &cfg);
    assert_eq!(frames.len(), 1 + 192);

    // keep the metadata frame; drop a random quarter of the data frames
    let metadata_frame = frames[0].clone();
    let mut data_frames: Vec<Vec<u8>> = frames[1..].to_vec();
    XorShift32::new(0xD20).shuffle(&mut data_frames);
    data_frames.truncate(144);

    let mut kept = vec![metadata_frame];
    kept.extend(data_frames);

    let decoded = decode_frames(kept, None).unwrap();
    assert_eq!(decoded.data, data);
}

#[test]
fn dropping_forty_percent_is_incomplete_recovery() {
    let data = XorShift32::new(0x52).bytes(64 * 512);
    let cfg = test_config(512, 0.30);
    let frames = encode_to_frames(&data, None, 3, &cfg);
    let total_data_frames = frames.len() - 1;

    // 60% of ceil(64 * 1.3) = 50 survivors < 64 chunks: cannot reach full rank
    let metadata_frame = frames[0].clone();
    let mut data_frames: Vec<Vec<u8>> = frames[1..].to_vec();
    XorShift32::new(0xD40).shuffle(&mut data_frames);
    data_frames.truncate(total_data_frames * 6 / 10);

    let mut kept = vec![metadata_frame];
    kept.extend(data_frames);

    match decode_frames(kept, None) {
        Err(RvsError::IncompleteRecovery { missing }) => assert!(!missing.is_empty()),
        other => panic!("expected IncompleteRecovery, got {:?}", other.map(|d| d.data.len())),
    }
}

#[test]
fn deleting_the_metadata_frame_is_invalid_video() {
    let data = XorShift32::new(0x53).bytes(8 * 512);
    let cfg = test_config(512, 0.30);
    let frames = encode_to_frames(&data, None, 0, &cfg);

    let without_metadata = frames[1..].to_vec();
    assert!(matches!(
        decode_frames(without_metadata, None),
        Err(RvsError::InvalidVideo(_))
    ));
}

#[test]
fn garbage_video_is_invalid_video() {
    let mut rng = XorShift32::new(0x54);
    let frames: Vec<Vec<u8>> = (0..20).map(|_| rng.bytes(48 * 32 * 3)).collect();
    assert!(matches!(
        decode_frames(frames, None),
        Err(RvsError::InvalidVideo(_))
    ));
}

#[test]
fn data_frames_decode_in_any_order_with_duplicates() {
    let data = XorShift32::new(0x55).bytes(32 * 512);
    let cfg = test_config(512, 0.30);
    let frames = encode_to_frames(&data, None, 0, &cfg);

    let metadata_frame = frames[0].clone();
    let mut data_frames: Vec<Vec<u8>> = frames[1..].to_vec();
    let dupes: Vec<Vec<u8>> = data_frames.iter().take(5).cloned().collect();
    data_frames.extend(dupes);
    XorShift32::new(0xD0D).shuffle(&mut data_frames);

    let mut reordered = vec![metadata_frame];
    reordered.extend(data_frames);

    let decoded = decode_frames(reordered, None).unwrap();
    assert_eq!(decoded.data, data);
}

#[test]
fn tampered_redundant_frame_does_not_affect_recovery() {
    let data = XorShift32::new(0x56).bytes(16 * 512);
    let cfg = test_config(512, 0.30);
    let mut frames = encode_to_frames(&data, None, 0, &cfg);

    // flip a payload byte in the last (non-systematic) data frame and move
    // it to the front of the data region so the decoder actually sees it;
    // its CRC no longer verifies and the fountain code shrugs it off.
    // Offset 200 is inside the xor_payload region.
    let last = frames.len() - 1;
    frames[last][200] ^= 0x01;
    let tampered = frames.remove(last);
    frames.insert(1, tampered);

    let decoded = decode_frames(frames, None).unwrap();
    assert_eq!(decoded.data, data);
}

#[test]
fn tampered_systematic_frame_never_yields_wrong_bytes() {
    let data = XorShift32::new(0x57).bytes(16 * 512);
    let cfg = test_config(512, 0.30);

    // flip bit 0 of one byte in every systematic frame in turn; each
    // attempt must either recover the exact input or fail loudly
    for victim in 1..=16 {
        let mut frames = encode_to_frames(&data, None, 0, &cfg);
        frames[victim][100] ^= 0x01;

        match decode_frames(frames, None) {
            Ok(decoded) => assert_eq!(decoded.data, data, "frame {victim}"),
            Err(RvsError::IncompleteRecovery { .. }) | Err(RvsError::IntegrityFailure(_)) => {}
            Err(other) => panic!("unexpected error for frame {victim}: {other}"),
        }
    }
}

#[test]
fn encrypted_roundtrip_and_wrong_password() {
    let data = XorShift32::new(0x58).bytes(1024 * 1024);
    let cfg = test_config(4096, 0.30);
    let password = "correct horse battery staple";
    let frames = encode_to_frames(&data, Some(password), 0, &cfg);

    let decoded = decode_frames(frames.clone(), Some(password)).unwrap();
    assert_eq!(decoded.data, data);
    assert!(decoded.metadata.is_encrypted());
    // metadata carries the envelope length, not the plaintext length
    assert_eq!(decoded.metadata.file_size, data.len() as u64 + 48);

    assert!(matches!(
        decode_frames(frames.clone(), Some("incorrect horse")),
        Err(RvsError::AuthFailure(_))
    ));
    assert!(matches!(
        decode_frames(frames, None),
        Err(RvsError::AuthFailure(_))
    ));
}

#[test]
fn flipped_envelope_byte_is_never_silent_corruption() {
    let data = XorShift32::new(0x59).bytes(8 * 512);
    // zero redundancy: a discarded packet is unrecoverable, which forces the
    // failure path instead of a silent fix-up
    let cfg = test_config(512, 0.0);
    let password = "hunter2";
    let mut frames = encode_to_frames(&data, Some(password), 0, &cfg);

    // offset 100 sits inside the xor_payload carrying envelope bytes
    frames[3][100] ^= 0x01;

    match decode_frames(frames, Some(password)) {
        Err(RvsError::IncompleteRecovery { .. }) | Err(RvsError::AuthFailure(_))
        | Err(RvsError::IntegrityFailure(_)) => {}
        Ok(decoded) => assert_eq!(decoded.data, data),
        Err(other) => panic!("unexpected error: {other}"),
    }
}

#[test]
fn encode_is_deterministic_given_a_seed() {
    let data = XorShift32::new(0x5A).bytes(32 * 512);
    let cfg = test_config(512, 1.0);

    let a = encode_to_frames(&data, None, 42, &cfg);
    let b = encode_to_frames(&data, None, 42, &cfg);
    assert_eq!(a, b);

    let c = encode_to_frames(&data, None, 43, &cfg);
    assert_ne!(a, c, "different base seeds must change redundant packets");
}

#[test]
fn empty_input_is_invalid_input() {
    let cfg = test_config(4096, 0.30);
    let mut sink = MemorySink::default();
    assert!(matches!(
        encode_stream(&[], "empty.bin", None, 0, &cfg, &mut sink),
        Err(RvsError::InvalidInput(_))
    ));
    assert!(sink.frames.is_empty());
}

#[test]
fn oversized_packet_for_frame_is_invalid_input() {
    let cfg = RvsConfig {
        chunk_size: 4096,
        redundancy: 0.30,
        width: 16,
        height: 16,
        fps: 30,
    };
    let mut sink = MemorySink::default();
    assert!(matches!(
        encode_stream(&[1u8; 100], "big.bin", None, 0, &cfg, &mut sink),
        Err(RvsError::InvalidInput(_))
    ));
}
