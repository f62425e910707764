use thiserror::Error;

/// The error surface of the codec. Every failure inside an encode or decode
/// call maps to exactly one of these kinds and aborts the call; nothing is
/// retried or recovered internally.
#[derive(Error, Debug)]
pub enum RvsError {
    /// Unreadable or empty input, or options out of range.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The input video does not carry a decodable stream: missing or corrupt
    /// metadata magic, header CRC mismatch, unsupported version, or frames
    /// too small for the declared packet size.
    #[error("invalid video: {0}")]
    InvalidVideo(String),

    /// The fountain decode stalled below full rank after the entire stream
    /// was consumed. Carries the indices of the unrecovered chunks.
    #[error("incomplete recovery: {} of the source chunks could not be reconstructed", missing.len())]
    IncompleteRecovery { missing: Vec<u32> },

    /// A solved chunk failed a consistency check, indicating tampering that
    /// slipped past the packet CRC or a decoder bug.
    #[error("integrity failure: {0}")]
    IntegrityFailure(String),

    /// AEAD tag mismatch, or the stream is encrypted and no password was
    /// supplied.
    #[error("authentication failure: {0}")]
    AuthFailure(String),

    /// Underlying file or codec process I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
