//! Crate-wide error taxonomy (spec §7).
//!
//! Grounded on the teacher's `block::decompress_core::DecompressError` for
//! the "one closed enum per layer" idiom, widened into a `thiserror`-derived
//! tree the way `LegeApp-DJVU-Encoder-Rust`'s error module does for a
//! similarly rich codec.

use thiserror::Error;

/// Errors raised by the bit-level I/O layer (§4.1 "Failure semantics").
#[derive(Debug, Error)]
pub enum BitstreamError {
    #[error("bitstream is closed")]
    StreamClosed,
    #[error("end of stream reached before the requested bits were available")]
    EndOfStream,
    #[error("underlying I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by an individual entropy coder or transform while still
/// inside the block pipeline (before they are folded into [`KanziError`]).
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid alphabet size: {0}")]
    InvalidAlphabetSize(usize),
    #[error("corrupted code lengths in canonical Huffman table")]
    CorruptedCodeLengths,
    #[error("entropy-coded chunk length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("bitstream error: {0}")]
    Bitstream(#[from] BitstreamError),
}

/// Top-level crate error (spec §7). Every public entry point returns
/// `Result<T, KanziError>`.
#[derive(Debug, Error)]
pub enum KanziError {
    /// Null/zero-length buffers, invalid block size, invalid job count, etc.
    /// Rejected synchronously; never partially applied.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Closed stream, truncated read, or underlying I/O failure from the
    /// bit-level layer.
    #[error("write failed: {0}")]
    Write(#[source] BitstreamError),

    #[error("read failed: {0}")]
    Read(#[source] BitstreamError),

    /// Invalid header checksum, invalid alphabet size, corrupted code
    /// lengths, impossible block size, entropy length mismatch, etc.
    #[error("invalid compressed stream: {0}")]
    InvalidStream(String),

    /// A worker thread failed while processing a block; carries the first
    /// error observed across the pool (spec §5 "Cancellation").
    #[error("block processing failed: {0}")]
    ProcessBlock(String),

    /// A worker observed the `CANCEL` sentinel set by a sibling worker.
    #[error("operation canceled")]
    Canceled,

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl KanziError {
    /// Maps this error to the §6 exit-code table for the bundled CLI binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            KanziError::InvalidParameter(_) => 1,
            KanziError::Write(_) => 1,       // ERR_WRITE_FILE
            KanziError::Read(_) => 2,        // ERR_READ_FILE
            KanziError::ProcessBlock(_) => 3, // ERR_PROCESS_BLOCK
            KanziError::Canceled => 3,
            KanziError::InvalidStream(_) => 4, // ERR_INVALID_STREAM
            KanziError::Unknown(_) => 5,
        }
    }
}

impl From<CodecError> for KanziError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Bitstream(b) => KanziError::Read(b),
            other => KanziError::InvalidStream(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, KanziError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_table() {
        assert_eq!(KanziError::InvalidParameter("x".into()).exit_code(), 1);
        assert_eq!(
            KanziError::Read(BitstreamError::EndOfStream).exit_code(),
            2
        );
        assert_eq!(KanziError::ProcessBlock("x".into()).exit_code(), 3);
        assert_eq!(KanziError::Canceled.exit_code(), 3);
        assert_eq!(KanziError::InvalidStream("x".into()).exit_code(), 4);
    }

    #[test]
    fn codec_error_converts_to_kanzi_error() {
        let e: KanziError = CodecError::InvalidAlphabetSize(0).into();
        assert!(matches!(e, KanziError::InvalidStream(_)));
    }

    #[test]
    fn bitstream_error_wraps_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let be: BitstreamError = io_err.into();
        assert!(matches!(be, BitstreamError::Io(_)));
    }
}
