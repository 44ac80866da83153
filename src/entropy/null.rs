//! Pass-through entropy coder (spec §4.2.7): writes/reads raw bytes through
//! the bit layer in chunks of at most 8 MiB.

use super::types::{read_chunk_len, write_chunk_len, BlockReader, BlockWriter, EntropyDecoder, EntropyEncoder};
use crate::error::Result;

pub const MAX_CHUNK: usize = 8 * 1024 * 1024;

pub struct NullEncoder;

impl NullEncoder {
    pub fn new() -> Self {
        NullEncoder
    }
}

impl Default for NullEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyEncoder for NullEncoder {
    fn encode(&mut self, writer: &mut BlockWriter, buf: &[u8]) -> Result<()> {
        for chunk in buf.chunks(MAX_CHUNK) {
            write_chunk_len(writer, chunk.len())?;
            writer.write_bits_from_bytes(chunk, 0, chunk.len() * 8)?;
        }
        Ok(())
    }

    fn dispose(&mut self, _writer: &mut BlockWriter) -> Result<()> {
        Ok(())
    }
}

pub struct NullDecoder;

impl NullDecoder {
    pub fn new() -> Self {
        NullDecoder
    }
}

impl Default for NullDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyDecoder for NullDecoder {
    fn decode(&mut self, reader: &mut BlockReader, buf: &mut [u8]) -> Result<()> {
        let mut offset = 0;
        while offset < buf.len() {
            let clen = read_chunk_len(reader)?;
            reader.read_bits_into_bytes(&mut buf[offset..offset + clen], 0, clen * 8)?;
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

    #[test]
    fn roundtrips_arbitrary_bytes() {
        let data = b"any bytes at all, including \x00\xFF binary garbage".to_vec();
        let mut w = BlockWriter::new(Cursor::new(Vec::new()));
        NullEncoder::new().encode(&mut w, &data).unwrap();
        w.close().unwrap();
        let bytes = w.into_inner().unwrap().into_inner();

        let mut r = BlockReader::new(Cursor::new(bytes));
        let mut out = vec![0u8; data.len()];
        NullDecoder::new().decode(&mut r, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn roundtrips_empty_input() {
        let mut w = BlockWriter::new(Cursor::new(Vec::new()));
        NullEncoder::new().encode(&mut w, &[]).unwrap();
        w.close().unwrap();
        let bytes = w.into_inner().unwrap().into_inner();
        let mut r = BlockReader::new(Cursor::new(bytes));
        let mut out: Vec<u8> = Vec::new();
        NullDecoder::new().decode(&mut r, &mut out).unwrap();
        assert!(out.is_empty());
    }
}
