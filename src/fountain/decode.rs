use crate::error::RvsError;
use crate::fountain::encode::xor_into;
use crate::fountain::ChunkMask;
use crate::packet::Packet;

/// One undecoded equation: the XOR of the chunks named by `mask` equals
/// `payload`. Masks only ever reference unsolved chunks; every solve sweeps
/// the stored rows.
struct Row {
    mask: ChunkMask,
    payload: Vec<u8>,
}

/// Online fountain decoder. Packets arrive in any order and any subset;
/// singleton rows are peeled eagerly with cascading substitution, and
/// `finish` falls back to full Gaussian elimination over GF(2) for row
/// systems peeling alone cannot triangularize.
pub struct FountainDecoder {
    num_chunks: u32,
    chunk_size: usize,
    solved: Vec<Option<Vec<u8>>>,
    solved_count: u32,
    rows: Vec<Row>,
    discarded: u64,
}

impl FountainDecoder {
    pub fn new(num_chunks: u32, chunk_size: usize) -> Self {
        Self {
            num_chunks,
            chunk_size,
            solved: (0..num_chunks).map(|_| None).collect(),
            solved_count: 0,
            rows: Vec::new(),
            discarded: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.solved_count == self.num_chunks
    }

    pub fn solved_count(&self) -> u32 {
        self.solved_count
    }

    /// Packets dropped for failing their payload CRC.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Feed one packet. Returns `Ok(true)` if the packet contributed
    /// information, `Ok(false)` if it was discarded (CRC mismatch, wrong
    /// geometry, or no new information).
    pub fn add_packet(&mut self, packet: &Packet) -> Result<bool, RvsError> {
        if !packet.verify_crc() {
            self.discarded += 1;
            log::debug!("discarding packet seed={}: payload CRC mismatch", packet.seed);
            return Ok(false);
        }
        if packet.mask.len() != self.num_chunks || packet.payload.len() != self.chunk_size {
            self.discarded += 1;
            log::debug!("discarding packet seed={}: geometry mismatch", packet.seed);
            return Ok(false);
        }
        // a well-formed packet covers at least one chunk
        if packet.mask.is_empty() {
            self.discarded += 1;
            log::debug!("discarding packet seed={}: empty mask", packet.seed);
            return Ok(false);
        }

        let mut mask = packet.mask.clone();
        let mut payload = packet.payload.clone();

        // Substitute every already-solved chunk out of the equation.
        for idx in mask.indices() {
            if let Some(chunk) = &self.solved[idx as usize] {
                xor_into(&mut payload, chunk);
                mask.clear(idx);
            }
        }

        match mask.count() {
            0 => {
                if payload.iter().any(|&b| b != 0) {
                    return Err(RvsError::IntegrityFailure(format!(
                        "packet seed={} reduces to an inconsistent equation",
                        packet.seed
                    )));
                }
                // duplicate of known information
                Ok(false)
            }
            1 => {
                let idx = mask.first_set().expect("count() == 1");
                self.resolve(idx, payload)?;
                Ok(true)
            }
            _ => {
                self.rows.push(Row { mask, payload });
                Ok(true)
            }
        }
    }

    /// Record chunk `idx` as solved and cascade the substitution through
    /// every stored row that references it, as a sweep over the row vector;
    /// rows that collapse to singletons queue further solves.
    fn resolve(&mut self, idx: u32, payload: Vec<u8>) -> Result<(), RvsError> {
        let mut pending = vec![(idx, payload)];

        while let Some((j, payload)) = pending.pop() {
            match &self.solved[j as usize] {
                Some(existing) => {
                    if *existing != payload {
                        return Err(RvsError::IntegrityFailure(format!(
                            "chunk {j} re-solved with different bytes"
                        )));
                    }
                    continue;
                }
                None => {
                    self.solved[j as usize] = Some(payload);
                    self.solved_count += 1;
                }
            }

            let mut i = 0;
            while i < self.rows.len() {
                if !self.rows[i].mask.contains(j) {
                    i += 1;
                    continue;
                }

                let chunk = self.solved[j as usize].as_ref().expect("solved above");
                xor_into(&mut self.rows[i].payload, chunk);
                self.rows[i].mask.clear(j);

                match self.rows[i].mask.count() {
                    0 => {
                        let row = self.rows.swap_remove(i);
                        if row.payload.iter().any(|&b| b != 0) {
                            return Err(RvsError::IntegrityFailure(
                                "stored row reduced to an inconsistent equation".into(),
                            ));
                        }
                    }
                    1 => {
                        let row = self.rows.swap_remove(i);
                        let k = row.mask.first_set().expect("count() == 1");
                        pending.push((k, row.payload));
                    }
                    _ => i += 1,
                }
            }
        }

        Ok(())
    }

    /// Indices of chunks not yet recovered.
    pub fn missing(&self) -> Vec<u32> {
        self.solved
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| i as u32)
            .collect()
    }

    /// Consume the decoder and return all chunk payloads in index order.
    /// Runs Gaussian elimination over the stored rows first, in case the
    /// stream ended before peeling reached full rank.
    pub fn finish(mut self) -> Result<Vec<Vec<u8>>, RvsError> {
        if !self.is_complete() {
            self.eliminate()?;
        }

        if !self.is_complete() {
            return Err(RvsError::IncompleteRecovery {
                missing: self.missing(),
            });
        }

        Ok(self
            .solved
            .into_iter()
            .map(|c| c.expect("complete"))
            .collect())
    }

    /// GF(2) Gaussian elimination: triangularize the stored rows (pivot =
    /// lowest set bit, payload XOR in lockstep with the mask XOR), then
    /// back-substitute from the highest pivot column down.
    fn eliminate(&mut self) -> Result<(), RvsError> {
        let n = self.num_chunks as usize;
        let mut pivots: Vec<Option<Row>> = (0..n).map(|_| None).collect();

        for mut row in std::mem::take(&mut self.rows) {
            loop {
                match row.mask.first_set() {
                    None => {
                        if row.payload.iter().any(|&b| b != 0) {
                            return Err(RvsError::IntegrityFailure(
                                "elimination produced an inconsistent row".into(),
                            ));
                        }
                        break;
                    }
                    Some(col) => {
                        if let Some(pivot) = &pivots[col as usize] {
                            row.mask.xor_with(&pivot.mask);
                            xor_into(&mut row.payload, &pivot.payload);
                        } else {
                            pivots[col as usize] = Some(row);
                            break;
                        }
                    }
                }
            }
        }

        // In echelon form every non-pivot bit of a row sits above its pivot
        // column, so walking columns top-down resolves dependencies first.
        for col in (0..n).rev() {
            let Some(mut row) = pivots[col].take() else {
                continue;
            };

            let mut recoverable = true;
            for b in row.mask.indices() {
                if b as usize == col {
                    continue;
                }
                match &self.solved[b as usize] {
                    Some(chunk) => {
                        xor_into(&mut row.payload, chunk);
                        row.mask.clear(b);
                    }
                    None => {
                        recoverable = false;
                        break;
                    }
                }
            }
            if !recoverable {
                continue;
            }

            match &self.solved[col] {
                Some(existing) => {
                    if *existing != row.payload {
                        return Err(RvsError::IntegrityFailure(format!(
                            "chunk {col} re-solved with different bytes"
                        )));
                    }
                }
                None => {
                    self.solved[col] = Some(row.payload);
                    self.solved_count += 1;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::{self, Chunk};
    use crate::fountain::{FountainEncoder, XorShift32};
    use crate::integrity;

    const B: usize = 64;

    fn make_chunks(n: usize) -> (Vec<u8>, Vec<Chunk>) {
        let mut rng = XorShift32::new(0xAB);
        let mut data = vec![0u8; n * B];
        rng.fill(&mut data);
        let chunks = chunker::split(&data, B).unwrap();
        (data, chunks)
    }

    fn combo(chunks: &[Chunk], indices: &[u32]) -> Packet {
        let n = chunks.len() as u32;
        let mut mask = ChunkMask::new(n);
        let mut payload = vec![0u8; B];
        for &i in indices {
            mask.set(i);
            xor_into(&mut payload, &chunks[i as usize].payload);
        }
        Packet {
            seed: 0,
            xor_crc: integrity::crc32(&payload),
            mask,
            payload,
        }
    }

    #[test]
    fn test_systematic_only_decode() {
        let (data, chunks) = make_chunks(8);
        let mut dec = FountainDecoder::new(8, B);
        for i in 0..chunks.len() as u32 {
            assert!(dec.add_packet(&combo(&chunks, &[i])).unwrap());
            assert_eq!(dec.solved_count(), i + 1);
        }
        assert!(dec.is_complete());
        let out = dec.finish().unwrap();
        assert_eq!(chunker::reassemble(out, data.len() as u64), data);
    }

    #[test]
    fn test_peeling_cascade() {
        let (_, chunks) = make_chunks(3);
        let mut dec = FountainDecoder::new(3, B);
        // stored combos collapse as the singleton arrives
        assert!(dec.add_packet(&combo(&chunks, &[1, 2])).unwrap());
        assert!(dec.add_packet(&combo(&chunks, &[0, 1])).unwrap());
        assert!(!dec.is_complete());
        assert!(dec.add_packet(&combo(&chunks, &[0])).unwrap());
        assert!(dec.is_complete());
        let out = dec.finish().unwrap();
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(out[i], c.payload);
        }
    }

    #[test]
    fn test_gaussian_elimination_recovers_without_singletons() {
        let (_, chunks) = make_chunks(3);
        let mut dec = FountainDecoder::new(3, B);
        // no packet is ever a singleton; peeling alone stalls
        dec.add_packet(&combo(&chunks, &[0, 1])).unwrap();
        dec.add_packet(&combo(&chunks, &[0, 2])).unwrap();
        dec.add_packet(&combo(&chunks, &[1, 2])).unwrap();
        dec.add_packet(&combo(&chunks, &[0, 1, 2])).unwrap();
        assert!(!dec.is_complete());
        let out = dec.finish().unwrap();
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(out[i], c.payload);
        }
    }

    #[test]
    fn test_incomplete_recovery_reports_missing() {
        let (_, chunks) = make_chunks(3);
        let mut dec = FountainDecoder::new(3, B);
        dec.add_packet(&combo(&chunks, &[0, 1])).unwrap();
        match dec.finish() {
            Err(RvsError::IncompleteRecovery { missing }) => {
                assert!(missing.contains(&2));
            }
            other => panic!("expected IncompleteRecovery, got {other:?}"),
        }
    }

    #[test]
    fn test_crc_mismatch_discarded() {
        let (_, chunks) = make_chunks(2);
        let mut dec = FountainDecoder::new(2, B);
        let mut pkt = combo(&chunks, &[0]);
        pkt.payload[5] ^= 0xFF;
        assert!(!dec.add_packet(&pkt).unwrap());
        assert_eq!(dec.discarded(), 1);
        assert_eq!(dec.solved_count(), 0);
    }

    #[test]
    fn test_duplicate_packet_is_no_new_information() {
        let (_, chunks) = make_chunks(2);
        let mut dec = FountainDecoder::new(2, B);
        let pkt = combo(&chunks, &[0]);
        assert!(dec.add_packet(&pkt).unwrap());
        assert!(!dec.add_packet(&pkt).unwrap());
    }

    #[test]
    fn test_conflicting_packet_is_integrity_failure() {
        let (_, chunks) = make_chunks(2);
        let mut dec = FountainDecoder::new(2, B);
        dec.add_packet(&combo(&chunks, &[0])).unwrap();

        // same mask, different (validly checksummed) payload
        let mut forged = combo(&chunks, &[0]);
        forged.payload[0] ^= 0x55;
        forged.xor_crc = integrity::crc32(&forged.payload);
        assert!(matches!(
            dec.add_packet(&forged),
            Err(RvsError::IntegrityFailure(_))
        ));
    }

    #[test]
    fn test_decode_random_subset_out_of_order() {
        let (data, chunks) = make_chunks(32);
        let enc = FountainEncoder::with_seed(&chunks, 1.0, 0).unwrap();
        let mut packets: Vec<Packet> = (0..enc.packet_count()).map(|k| enc.packet(k)).collect();

        // drop a third of the systematic packets, shuffle what remains
        packets.remove(30);
        packets.remove(20);
        packets.remove(10);
        let mut rng = XorShift32::new(5);
        for i in (1..packets.len()).rev() {
            packets.swap(i, rng.next_below(i as u32 + 1) as usize);
        }

        let mut dec = FountainDecoder::new(32, B);
        for pkt in &packets {
            if dec.is_complete() {
                break;
            }
            dec.add_packet(pkt).unwrap();
        }
        let out = dec.finish().unwrap();
        assert_eq!(chunker::reassemble(out, data.len() as u64), data);
    }
}
