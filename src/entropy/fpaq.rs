//! FPAQ coder (spec §4.2.2): a self-contained binary predictor, `p[4][256]`,
//! indexed by `(context-class, current-byte-prefix)`, driving the shared
//! range-coder engine from [`super::range`].
//!
//! **Version note:** only the current (`bsVersion >= 4`, 8-bit split) stream
//! format is implemented at this layer — see DESIGN.md's Open Question
//! resolutions for the legacy 4-bit-split variant.

use super::range::{RangeDecoderCore, RangeEncoderCore};
use super::types::{read_chunk_len, write_chunk_len, BlockReader, BlockWriter, EntropyDecoder, EntropyEncoder};
use crate::error::Result;
use crate::predictor::Predictor;

const P_SCALE: i32 = 65536;
const ADAPT_SHIFT: i32 = 6;

pub const DEFAULT_MAX_CHUNK: usize = 4 * 1024 * 1024;

pub struct FpaqPredictor {
    table: [[u16; 256]; 4],
    partial: u16,
    prev_byte: u8,
}

impl FpaqPredictor {
    pub fn new() -> Self {
        FpaqPredictor {
            table: [[(P_SCALE / 2) as u16; 256]; 4],
            partial: 1,
            prev_byte: 0,
        }
    }

    #[inline]
    fn ctx_class(&self) -> usize {
        ((self.prev_byte as usize) >> 6) & 3
    }
}

impl Default for FpaqPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for FpaqPredictor {
    fn get(&self) -> u32 {
        (self.table[self.ctx_class()][self.partial as usize] as u32) >> 4
    }

    fn update(&mut self, bit: u8) {
        let ctx = self.ctx_class();
        let idx = self.partial as usize;
        let p = self.table[ctx][idx] as i32;
        let target = (bit as i32) * P_SCALE;
        let updated = p - ((p - target) >> ADAPT_SHIFT);
        self.table[ctx][idx] = updated.clamp(1, P_SCALE - 2) as u16;

        self.partial = (self.partial << 1) | (bit as u16 & 1);
        if self.partial >= 256 {
            self.prev_byte = (self.partial & 0xFF) as u8;
            self.partial = 1;
        }
    }
}

pub struct FpaqEncoder {
    max_chunk: usize,
}

impl FpaqEncoder {
    pub fn new() -> Self {
        FpaqEncoder {
            max_chunk: DEFAULT_MAX_CHUNK,
        }
    }
}

impl Default for FpaqEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyEncoder for FpaqEncoder {
    fn encode(&mut self, writer: &mut BlockWriter, buf: &[u8]) -> Result<()> {
        for chunk in buf.chunks(self.max_chunk.max(1)) {
            write_chunk_len(writer, chunk.len())?;
            let mut core = RangeEncoderCore::new(FpaqPredictor::new());
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

pub struct FpaqDecoder;

impl FpaqDecoder {
    pub fn new() -> Self {
        FpaqDecoder
    }
}

impl Default for FpaqDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyDecoder for FpaqDecoder {
    fn decode(&mut self, reader: &mut BlockReader, buf: &mut [u8]) -> Result<()> {
        let mut offset = 0;
        while offset < buf.len() {
            let clen = read_chunk_len(reader)?;
            let mut core = RangeDecoderCore::new(FpaqPredictor::new(), reader)?;
            for i in 0..clen {
                buf[offset + i] = core.decode_byte(reader)?;
            }
            offset += clen;
        }
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

    fn roundtrip(data: &[u8]) {
        let mut w = BlockWriter::new(Cursor::new(Vec::new()));
        FpaqEncoder::new().encode(&mut w, data).unwrap();
        w.close().unwrap();
        let bytes = w.into_inner().unwrap().into_inner();

        let mut r = BlockReader::new(Cursor::new(bytes));
        let mut out = vec![0u8; data.len()];
        FpaqDecoder::new().decode(&mut r, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn roundtrips_empty_input() {
        roundtrip(&[]);
    }

    #[test]
    fn roundtrips_text_like_data() {
        roundtrip(b"the quick brown fox jumps over the lazy dog".repeat(20).as_slice());
    }

    #[test]
    fn predictor_converges_on_constant_bit() {
        let mut p = FpaqPredictor::new();
        for _ in 0..2000 {
            p.update(1);
        }
        assert!(p.get() > 2048);
    }
}
