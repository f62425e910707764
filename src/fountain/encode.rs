use std::collections::HashSet;

use crate::chunker::Chunk;
use crate::config;
use crate::error::RvsError;
use crate::fountain::{ChunkMask, RobustSoliton, XorShift32};
use crate::integrity;
use crate::packet::Packet;

/// Generates `M = ceil(N * (1 + redundancy))` packets from `N` source
/// chunks. The first `N` are systematic (packet `i` is chunk `i`), which
/// makes the lossless case trivially decodable; the remainder are XOR
/// combinations whose degree follows the Robust Soliton distribution.
///
/// `packet(k)` is a pure function of `(chunks, base_seed, k)`, so callers
/// may generate packets in parallel and still emit them in order.
pub struct FountainEncoder<'a> {
    chunks: &'a [Chunk],
    base_seed: u32,
    num_packets: u32,
    soliton: RobustSoliton,
}

impl<'a> FountainEncoder<'a> {
    pub fn new(chunks: &'a [Chunk], redundancy: f64) -> Result<Self, RvsError> {
        Self::with_seed(chunks, redundancy, 0)
    }

    /// `base_seed` offsets the seed of every non-systematic packet. Encoding
    /// is deterministic given a base; production draws a fresh one per call.
    pub fn with_seed(
        chunks: &'a [Chunk],
        redundancy: f64,
        base_seed: u32,
    ) -> Result<Self, RvsError> {
        if chunks.is_empty() {
            return Err(RvsError::InvalidInput("no chunks to encode".into()));
        }
        if !(0.0..=config::MAX_REDUNDANCY).contains(&redundancy) {
            return Err(RvsError::InvalidInput(format!(
                "redundancy {} out of range 0.0..={}",
                redundancy,
                config::MAX_REDUNDANCY
            )));
        }

        let n = chunks.len() as u32;
        let num_packets = (n as f64 * (1.0 + redundancy)).ceil() as u32;
        let soliton = RobustSoliton::new(n, config::SOLITON_C, config::SOLITON_DELTA);

        Ok(Self {
            chunks,
            base_seed,
            num_packets,
            soliton,
        })
    }

    pub fn num_chunks(&self) -> u32 {
        self.chunks.len() as u32
    }

    pub fn packet_count(&self) -> u32 {
        self.num_packets
    }

    /// Generate packet `k` of `packet_count()`.
    pub fn packet(&self, k: u32) -> Packet {
        let n = self.num_chunks();
        debug_assert!(k < self.num_packets);

        if k < n {
            let payload = self.chunks[k as usize].payload.clone();
            return Packet {
                seed: k,
                mask: ChunkMask::singleton(n, k),
                xor_crc: integrity::crc32(&payload),
                payload,
            };
        }

        let seed = self.base_seed.wrapping_add(k);
        let mut rng = XorShift32::new(seed);
        let degree = self.soliton.sample(&mut rng).min(n);
        let selected = sample_distinct(&mut rng, n, degree);

        let mut mask = ChunkMask::new(n);
        let mut payload = vec![0u8; self.chunks[0].payload.len()];
        for &idx in &selected {
            mask.set(idx);
            xor_into(&mut payload, &self.chunks[idx as usize].payload);
        }

        Packet {
            seed,
            mask,
            xor_crc: integrity::crc32(&payload),
            payload,
        }
    }

}

/// Draw `d` distinct values from `0..n` (Floyd's algorithm — no retry loop,
/// no O(n) scratch).
fn sample_distinct(rng: &mut XorShift32, n: u32, d: u32) -> HashSet<u32> {
    debug_assert!(d >= 1 && d <= n);
    let mut chosen = HashSet::with_capacity(d as usize);
    for j in n - d..n {
        let t = rng.next_below(j + 1);
        if !chosen.insert(t) {
            chosen.insert(j);
        }
    }
    chosen
}

pub(crate) fn xor_into(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}
