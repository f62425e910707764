use crate::error::RvsError;
use crate::integrity;

/// A fountain-code source symbol: a fixed-size slice of the input buffer.
/// The final chunk is zero-padded; the whole-file length recorded in the
/// metadata preamble governs trimming, so no per-chunk length is kept.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: u32,
    pub payload: Vec<u8>,
}

impl Chunk {
    /// Checksum of the padded payload. Debug aid only; the on-wire CRC is
    /// computed over XOR payloads, not source chunks.
    pub fn crc32(&self) -> u32 {
        integrity::crc32(&self.payload)
    }
}

/// Split a byte buffer into `ceil(len / chunk_size)` chunks, zero-padding
/// the last one to `chunk_size`.
pub fn split(data: &[u8], chunk_size: usize) -> Result<Vec<Chunk>, RvsError> {
    if data.is_empty() {
        return Err(RvsError::InvalidInput("input is empty".into()));
    }
    if chunk_size == 0 {
        return Err(RvsError::InvalidInput("chunk_size must be non-zero".into()));
    }

    let num_chunks = (data.len() + chunk_size - 1) / chunk_size;
    let mut chunks = Vec::with_capacity(num_chunks);

    for (i, slice) in data.chunks(chunk_size).enumerate() {
        let mut payload = slice.to_vec();
        payload.resize(chunk_size, 0);
        let chunk = Chunk {
            index: i as u32,
            payload,
        };
        log::trace!("chunk {} crc32=0x{:08X}", chunk.index, chunk.crc32());
        chunks.push(chunk);
    }

    Ok(chunks)
}

/// Concatenate recovered chunk payloads in index order and trim the result
/// to the authoritative file size.
pub fn reassemble(payloads: Vec<Vec<u8>>, file_size: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(payloads.iter().map(Vec::len).sum());
    for payload in payloads {
        out.extend_from_slice(&payload);
    }
    out.truncate(file_size as usize);
    out
}
