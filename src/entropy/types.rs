//! Common entropy-coder contract (spec §4.2): `encode`/`decode` against a
//! private in-memory bit stream, chunked, self-delimited framing, and a
//! factory keyed by [`crate::config::EntropyType`].

use std::io::Cursor;

use crate::bitstream::{BitReader, BitWriter};
use crate::config::EntropyType;
use crate::error::Result;
use crate::support::varint;

/// Concrete bit-writer type entropy coders operate against: a private,
/// growable in-memory buffer per spec §4.1a, not the shared output stream.
pub type BlockWriter = BitWriter<Cursor<Vec<u8>>>;
/// Concrete bit-reader type entropy coders operate against.
pub type BlockReader = BitReader<Cursor<Vec<u8>>>;

/// Capability implemented by every entropy encoder.
pub trait EntropyEncoder {
    /// Encodes `buf` into `writer`, chunking internally if `buf` exceeds
    /// this coder's maximum chunk size.
    fn encode(&mut self, writer: &mut BlockWriter, buf: &[u8]) -> Result<()>;
    /// Flushes any pending state (sub-chunk tails, final range-coder state).
    fn dispose(&mut self, writer: &mut BlockWriter) -> Result<()>;
}

/// Capability implemented by every entropy decoder.
pub trait EntropyDecoder {
    /// Decodes exactly `buf.len()` bytes from `reader` into `buf`.
    fn decode(&mut self, reader: &mut BlockReader, buf: &mut [u8]) -> Result<()>;
    fn dispose(&mut self, reader: &mut BlockReader) -> Result<()>;
}

/// Writes a self-delimited chunk header: a varint byte length, MSB-first,
/// 8 bits at a time (cheaper than bit-packing a varint, and the trailing
/// range-coder state is already byte-aligned at chunk boundaries).
pub(crate) fn write_chunk_len(writer: &mut BlockWriter, len: usize) -> Result<()> {
    let mut buf = Vec::new();
    varint::write_varint(&mut buf, len as u64);
    writer.write_bits(buf.len() as u64, 8)?;
    for b in buf {
        writer.write_bits(b as u64, 8)?;
    }
    Ok(())
}

pub(crate) fn read_chunk_len(reader: &mut BlockReader) -> Result<usize> {
    let nbytes = reader.read_bits(8)? as usize;
    let mut buf = vec![0u8; nbytes];
    for b in buf.iter_mut() {
        *b = reader.read_bits(8)? as u8;
    }
    let mut pos = 0;
    varint::read_varint(&buf, &mut pos)
        .map(|v| v as usize)
        .ok_or_else(|| {
            crate::error::KanziError::InvalidStream("corrupted chunk length varint".into())
        })
}

/// Builds the encoder for `kind`.
pub fn make_encoder(kind: EntropyType) -> Box<dyn EntropyEncoder> {
    match kind {
        EntropyType::None => Box::new(super::null::NullEncoder::new()),
        EntropyType::Range => Box::new(super::range::RangeEncoder::new()),
        EntropyType::Fpaq => Box::new(super::fpaq::FpaqEncoder::new()),
        EntropyType::Cm => Box::new(super::cm::CmEncoder::new()),
        EntropyType::Tpaq => Box::new(super::cm::TpaqEncoder::new()),
        EntropyType::Ans0 => Box::new(super::ans::AnsEncoder::new(0)),
        EntropyType::Ans1 => Box::new(super::ans::AnsEncoder::new(1)),
        EntropyType::Huffman => Box::new(super::huffman::HuffmanEncoder::new()),
    }
}

/// Builds the decoder for `kind`.
pub fn make_decoder(kind: EntropyType) -> Box<dyn EntropyDecoder> {
    match kind {
        EntropyType::None => Box::new(super::null::NullDecoder::new()),
        EntropyType::Range => Box::new(super::range::RangeDecoder::new()),
        EntropyType::Fpaq => Box::new(super::fpaq::FpaqDecoder::new()),
        EntropyType::Cm => Box::new(super::cm::CmDecoder::new()),
        EntropyType::Tpaq => Box::new(super::cm::TpaqDecoder::new()),
        EntropyType::Ans0 => Box::new(super::ans::AnsDecoder::new(0)),
        EntropyType::Ans1 => Box::new(super::ans::AnsDecoder::new(1)),
        EntropyType::Huffman => Box::new(super::huffman::HuffmanDecoder::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_len_roundtrips() {
        let mut w = BlockWriter::new(Cursor::new(Vec::new()));
        write_chunk_len(&mut w, 70000).unwrap();
        w.close().unwrap();
        let bytes = w.into_inner().unwrap().into_inner();
        let mut r = BlockReader::new(Cursor::new(bytes));
        assert_eq!(read_chunk_len(&mut r).unwrap(), 70000);
    }

    #[test]
    fn factory_builds_matching_pairs_for_every_entropy_type() {
        for kind in [
            EntropyType::None,
            EntropyType::Range,
            EntropyType::Fpaq,
            EntropyType::Cm,
            EntropyType::Tpaq,
            EntropyType::Ans0,
            EntropyType::Ans1,
            EntropyType::Huffman,
        ] {
            let _ = make_encoder(kind);
            let _ = make_decoder(kind);
        }
    }
}
