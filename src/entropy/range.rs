//! Binary adaptive range coder (spec §4.2.1) plus the shared
//! [`RangeEncoderCore`]/[`RangeDecoderCore`] engine reused by FPAQ and
//! CM/TPAQ (§4.2.2/§4.2.3), which only swap in a different [`Predictor`].
//!
//! Implements the "Universal range-coder invariant" from §4.2: range
//! `[low, high]` starts at `[0, 2^56-1]`; whenever the top 32 bits of `low`
//! and `high` agree, they're shifted out as a big-endian 32-bit word.

use super::types::{read_chunk_len, write_chunk_len, BlockReader, BlockWriter, EntropyDecoder, EntropyEncoder};
use crate::error::Result;
use crate::predictor::{OrderOneBitPredictor, Predictor};

const RC_BITS: u32 = 56;
const RC_MASK: u64 = (1u64 << RC_BITS) - 1;

/// Default chunk size before the binary coder starts a fresh sub-chunk
/// (spec: "splits large blocks (>= 64 MiB) into sub-chunks").
pub const DEFAULT_MAX_CHUNK: usize = 64 * 1024 * 1024;

pub struct RangeEncoderCore<P: Predictor> {
    predictor: P,
    low: u64,
    high: u64,
}

impl<P: Predictor> RangeEncoderCore<P> {
    pub fn new(predictor: P) -> Self {
        RangeEncoderCore {
            predictor,
            low: 0,
            high: RC_MASK,
        }
    }

    pub fn encode_bit(&mut self, writer: &mut BlockWriter, bit: u8) -> Result<()> {
        let p = self.predictor.get() as u64;
        let range = self.high - self.low;
        let split = self.low + (((range >> 4) * p) >> 8);
        if bit != 0 {
            self.high = split;
        } else {
            self.low = split + 1;
        }
        self.predictor.update(bit);
        self.renorm(writer)
    }

    pub fn encode_byte(&mut self, writer: &mut BlockWriter, byte: u8) -> Result<()> {
        for i in (0..8).rev() {
            self.encode_bit(writer, (byte >> i) & 1)?;
        }
        Ok(())
    }

    fn renorm(&mut self, writer: &mut BlockWriter) -> Result<()> {
        while ((self.low ^ self.high) >> 24) & 0xFFFF_FFFF == 0 {
            let word = (self.high >> 24) & 0xFFFF_FFFF;
            writer.write_bits(word, 32)?;
            self.low = (self.low << 32) & RC_MASK;
            self.high = ((self.high << 32) | 0xFFFF_FFFF) & RC_MASK;
        }
        Ok(())
    }

    pub fn flush(&mut self, writer: &mut BlockWriter) -> Result<()> {
        writer.write_bits(self.low, RC_BITS)?;
        Ok(())
    }
}

pub struct RangeDecoderCore<P: Predictor> {
    predictor: P,
    low: u64,
    high: u64,
    code: u64,
}

impl<P: Predictor> RangeDecoderCore<P> {
    pub fn new(predictor: P, reader: &mut BlockReader) -> Result<Self> {
        let code = reader.read_bits(RC_BITS)?;
        Ok(RangeDecoderCore {
            predictor,
            low: 0,
            high: RC_MASK,
            code,
        })
    }

    pub fn decode_bit(&mut self, reader: &mut BlockReader) -> Result<u8> {
        let p = self.predictor.get() as u64;
        let range = self.high - self.low;
        let split = self.low + (((range >> 4) * p) >> 8);
        let bit = if self.code <= split { 1 } else { 0 };
        if bit != 0 {
            self.high = split;
        } else {
            self.low = split + 1;
        }
        self.predictor.update(bit);
        self.renorm(reader)?;
        Ok(bit)
    }

    pub fn decode_byte(&mut self, reader: &mut BlockReader) -> Result<u8> {
        let mut byte = 0u8;
        for _ in 0..8 {
            byte = (byte << 1) | self.decode_bit(reader)?;
        }
        Ok(byte)
    }

    fn renorm(&mut self, reader: &mut BlockReader) -> Result<()> {
        while ((self.low ^ self.high) >> 24) & 0xFFFF_FFFF == 0 {
            self.low = (self.low << 32) & RC_MASK;
            self.high = ((self.high << 32) | 0xFFFF_FFFF) & RC_MASK;
            let next = reader.read_bits(32)?;
            self.code = ((self.code << 32) | next) & RC_MASK;
        }
        Ok(())
    }
}

/// `RANGE` entropy id: the binary coder driven by a cheap order-1
/// [`OrderOneBitPredictor`] fallback.
pub struct RangeEncoder {
    max_chunk: usize,
}

impl RangeEncoder {
    pub fn new() -> Self {
        RangeEncoder {
            max_chunk: DEFAULT_MAX_CHUNK,
        }
    }

    pub fn with_chunk_size(max_chunk: usize) -> Self {
        RangeEncoder { max_chunk }
    }
}

impl Default for RangeEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyEncoder for RangeEncoder {
    fn encode(&mut self, writer: &mut BlockWriter, buf: &[u8]) -> Result<()> {
        for chunk in buf.chunks(self.max_chunk.max(1)) {
            write_chunk_len(writer, chunk.len())?;
            let mut core = RangeEncoderCore::new(OrderOneBitPredictor::new());
            for &b in chunk {
                core.encode_byte(writer, b)?;
            }
            core.flush(writer)?;
        }
        Ok(())
    }

    fn dispose(&mut self, _writer: &mut BlockWriter) -> Result<()> {
        Ok(())
    }
}

pub struct RangeDecoder {
    max_chunk: usize,
}

impl RangeDecoder {
    pub fn new() -> Self {
        RangeDecoder {
            max_chunk: DEFAULT_MAX_CHUNK,
        }
    }

    pub fn with_chunk_size(max_chunk: usize) -> Self {
        RangeDecoder { max_chunk }
    }
}

impl Default for RangeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyDecoder for RangeDecoder {
    fn decode(&mut self, reader: &mut BlockReader, buf: &mut [u8]) -> Result<()> {
        let mut offset = 0;
        while offset < buf.len() {
            let clen = read_chunk_len(reader)?;
            let mut core = RangeDecoderCore::new(OrderOneBitPredictor::new(), reader)?;
            for i in 0..clen {
                buf[offset + i] = core.decode_byte(reader)?;
            }
            offset += clen;
        }
        let _ = self.max_chunk; // only the encoder's chunk count matters on decode
        Ok(())
    }

    fn dispose(&mut self, _reader: &mut BlockReader) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(data: &[u8], max_chunk: usize) {
        let mut w = BlockWriter::new(Cursor::new(Vec::new()));
        let mut enc = RangeEncoder::with_chunk_size(max_chunk);
        enc.encode(&mut w, data).unwrap();
        w.close().unwrap();
        let bytes = w.into_inner().unwrap().into_inner();

        let mut r = BlockReader::new(Cursor::new(bytes));
        let mut dec = RangeDecoder::with_chunk_size(max_chunk);
        let mut out = vec![0u8; data.len()];
        dec.decode(&mut r, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn roundtrips_empty_input() {
        roundtrip(&[], 4096);
    }

    #[test]
    fn roundtrips_repetitive_data() {
        roundtrip(&[b'a'; 5000], 4096);
    }

    #[test]
    fn roundtrips_random_looking_data() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i.wrapping_mul(2654435761) >> 17) as u8).collect();
        roundtrip(&data, 4096);
    }

    #[test]
    fn roundtrips_across_multiple_chunks() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        roundtrip(&data, 1000);
    }
}
