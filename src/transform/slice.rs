//! Shared contract for reversible transforms (spec §4.4).

use crate::error::Result;

/// A reversible, fallible byte transform. Every implementation is
/// in-place incompatible: `input` and `output` must be distinct buffers.
///
/// A transform that cannot usefully apply to `input` (too short, wrong
/// data shape, estimated expansion) returns `Ok(false)` from `forward`
/// rather than an error — the pipeline records a skip-flag and feeds the
/// original bytes to the entropy coder instead.
pub trait Transform {
    /// Attempts to transform `input` into `output`. Returns `Ok(false)`
    /// (with `output` left unspecified) when the transform declines.
    fn forward(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<bool>;

    /// Reverses a transform applied by a prior `forward` call that
    /// returned `Ok(true)`.
    fn inverse(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()>;

    /// Upper bound on the size `forward` can produce for an input of
    /// `input_len` bytes, used to size scratch buffers up front.
    fn max_encoded_length(&self, input_len: usize) -> usize;
}
