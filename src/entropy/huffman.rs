//! Canonical, length-limited Huffman coder (spec §4.2.5).
//!
//! **Scope note:** this implements the single-stream (V5-style) canonical
//! coder only; the four-parallel-stream V6 interleaving described in the
//! spec is a throughput optimization of the same wire semantics and is not
//! separately modeled here (see DESIGN.md). Code-length limiting is a plain
//! depth clamp rather than a package-merge pass — adequate for the alphabet
//! sizes this crate's blocks produce, but not guaranteed Kraft-optimal for
//! adversarially skewed frequency tables (documented, not silently dropped).

use std::collections::{BinaryHeap, HashMap};
use std::cmp::Reverse;

use super::exp_golomb;
use super::types::{read_chunk_len, write_chunk_len, BlockReader, BlockWriter, EntropyDecoder, EntropyEncoder};
use crate::error::{KanziError, Result};
use crate::support::histogram::histogram0;

pub const MAX_CHUNK: usize = 65536;
pub const MIN_CHUNK_FOR_HUFFMAN: usize = 32;
pub const MAX_CODE_LEN: u8 = 14;

const MODE_RAW: u64 = 0;
const MODE_SINGLE_SYMBOL: u64 = 1;
const MODE_HUFFMAN: u64 = 2;

/// Builds Huffman code lengths for `alphabet` from `hist`, via a plain
/// binary-heap tree build with lengths clamped to [`MAX_CODE_LEN`].
fn build_lengths(hist: &[u32; 256], alphabet: &[u8]) -> Vec<u8> {
    let n = alphabet.len();
    let mut freq: Vec<u64> = alphabet.iter().map(|&s| hist[s as usize] as u64).collect();
    let mut parent: Vec<i64> = vec![-1; n];
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> =
        freq.iter().enumerate().map(|(i, &f)| Reverse((f, i))).collect();
    let mut next_id = n;
    while heap.len() > 1 {
        let Reverse((f1, i1)) = heap.pop().unwrap();
        let Reverse((f2, i2)) = heap.pop().unwrap();
        freq.push(f1 + f2);
        parent.push(-1);
        parent[i1] = next_id as i64;
        parent[i2] = next_id as i64;
        heap.push(Reverse((f1 + f2, next_id)));
        next_id += 1;
    }
    (0..n)
        .map(|i| {
            let mut depth = 0u32;
            let mut cur = i as i64;
            while parent[cur as usize] != -1 {
                depth += 1;
                cur = parent[cur as usize];
            }
            depth.clamp(1, MAX_CODE_LEN as u32) as u8
        })
        .collect()
}

/// `(symbol, length, code)` triples sorted by `(length, symbol)`, with
/// codes assigned by the canonical algorithm — the standard
/// `first_code[len]` construction used by DEFLATE-family canonical codes.
fn assign_canonical_codes(syms_lens: &[(u8, u8)]) -> Vec<(u8, u8, u32)> {
    let mut sorted = syms_lens.to_vec();
    sorted.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
    let max_len = sorted.iter().map(|&(_, l)| l).max().unwrap_or(0) as usize;
    let mut count = vec![0u32; max_len + 1];
    for &(_, l) in &sorted {
        count[l as usize] += 1;
    }
    let mut code = 0u32;
    let mut first_code = vec![0u32; max_len + 1];
    for len in 1..=max_len {
        code = (code + count[len - 1]) << 1;
        first_code[len] = code;
    }
    let mut next_code = first_code;
    sorted
        .into_iter()
        .map(|(sym, len)| {
            let c = next_code[len as usize];
            next_code[len as usize] += 1;
            (sym, len, c)
        })
        .collect()
}

pub struct HuffmanEncoder;

impl HuffmanEncoder {
    pub fn new() -> Self {
        HuffmanEncoder
    }
}

impl Default for HuffmanEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyEncoder for HuffmanEncoder {
    fn encode(&mut self, writer: &mut BlockWriter, buf: &[u8]) -> Result<()> {
        for chunk in buf.chunks(MAX_CHUNK) {
            write_chunk_len(writer, chunk.len())?;

            if chunk.len() < MIN_CHUNK_FOR_HUFFMAN {
                writer.write_bits(MODE_RAW, 2)?;
                if !chunk.is_empty() {
                    writer.write_bits_from_bytes(chunk, 0, chunk.len() * 8)?;
                }
                continue;
            }

            let hist = histogram0(chunk);
            let alphabet: Vec<u8> = (0..256u32).filter(|&i| hist[i as usize] > 0).map(|i| i as u8).collect();

            if alphabet.len() == 1 {
                writer.write_bits(MODE_SINGLE_SYMBOL, 2)?;
                writer.write_bits(alphabet[0] as u64, 8)?;
                continue;
            }

            writer.write_bits(MODE_HUFFMAN, 2)?;
            let lengths = build_lengths(&hist, &alphabet);
            let syms_lens: Vec<(u8, u8)> = alphabet.iter().copied().zip(lengths.iter().copied()).collect();
            let canon = assign_canonical_codes(&syms_lens);
            let len_by_symbol: HashMap<u8, u8> = canon.iter().map(|&(s, l, _)| (s, l)).collect();
            let code_by_symbol: HashMap<u8, (u32, u8)> = canon.iter().map(|&(s, l, c)| (s, (c, l))).collect();

            writer.write_bits(alphabet.len() as u64, 16)?;
            for &sym in &alphabet {
                writer.write_bits(sym as u64, 8)?;
            }
            let mut prev = 0i64;
            for &sym in &alphabet {
                let len = len_by_symbol[&sym] as i64;
                exp_golomb::write_signed(writer, len - prev)?;
                prev = len;
            }

            for &b in chunk {
                let (code, len) = code_by_symbol[&b];
                writer.write_bits(code as u64, len as u32)?;
            }
        }
        Ok(())
    }

    fn dispose(&mut self, _writer: &mut BlockWriter) -> Result<()> {
        Ok(())
    }
}

pub struct HuffmanDecoder;

impl HuffmanDecoder {
    pub fn new() -> Self {
        HuffmanDecoder
    }
}

impl Default for HuffmanDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyDecoder for HuffmanDecoder {
    fn decode(&mut self, reader: &mut BlockReader, buf: &mut [u8]) -> Result<()> {
        let mut offset = 0;
        while offset < buf.len() {
            let clen = read_chunk_len(reader)?;
            let mode = reader.read_bits(2)?;
            match mode {
                MODE_RAW => {
                    if clen > 0 {
                        reader.read_bits_into_bytes(&mut buf[offset..offset + clen], 0, clen * 8)?;
                    }
                }
                MODE_SINGLE_SYMBOL => {
                    let sym = reader.read_bits(8)? as u8;
                    buf[offset..offset + clen].fill(sym);
                }
                MODE_HUFFMAN => {
                    let nb_symbols = reader.read_bits(16)? as usize;
                    let mut alphabet = vec![0u8; nb_symbols];
                    for s in alphabet.iter_mut() {
                        *s = reader.read_bits(8)? as u8;
                    }
                    let mut lengths = vec![0u8; nb_symbols];
                    let mut prev = 0i64;
                    for l in lengths.iter_mut() {
                        let delta = exp_golomb::read_signed(reader)?;
                        prev += delta;
                        *l = prev as u8;
                    }
                    let syms_lens: Vec<(u8, u8)> =
                        alphabet.iter().copied().zip(lengths.iter().copied()).collect();
                    let canon = assign_canonical_codes(&syms_lens);
                    let max_len = canon.iter().map(|&(_, l, _)| l).max().unwrap_or(0) as usize;
                    let mut count = vec![0u32; max_len + 1];
                    let mut groups: Vec<Vec<u8>> = vec![Vec::new(); max_len + 1];
                    for &(sym, len, _) in &canon {
                        count[len as usize] += 1;
                        groups[len as usize].push(sym);
                    }
                    let mut code = 0u32;
                    let mut first_code = vec![0u32; max_len + 1];
                    for len in 1..=max_len {
                        code = (code + count[len - 1]) << 1;
                        first_code[len] = code;
                    }

                    for i in 0..clen {
                        buf[offset + i] = decode_one(reader, &first_code, &count, &groups, max_len)?;
                    }
                }
                _ => return Err(KanziError::InvalidStream("invalid huffman chunk mode".into())),
            }
            offset += clen;
        }
        Ok(())
    }

    fn dispose(&mut self, _reader: &mut BlockReader) -> Result<()> {
        Ok(())
    }
}

fn decode_one(
    reader: &mut BlockReader,
    first_code: &[u32],
    count: &[u32],
    groups: &[Vec<u8>],
    max_len: usize,
) -> Result<u8> {
    let mut code = 0u32;
    for len in 1..=max_len {
        code = (code << 1) | reader.read_bits(1)? as u32;
        let cnt = count[len];
        if cnt > 0 {
            let base = first_code[len];
            if code >= base && code < base + cnt {
                return Ok(groups[len][(code - base) as usize]);
            }
        }
    }
    Err(KanziError::InvalidStream("no matching huffman code".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(data: &[u8]) {
        let mut w = BlockWriter::new(Cursor::new(Vec::new()));
        HuffmanEncoder::new().encode(&mut w, data).unwrap();
        w.close().unwrap();
        let bytes = w.into_inner().unwrap().into_inner();

        let mut r = BlockReader::new(Cursor::new(bytes));
        let mut out = vec![0u8; data.len()];
        HuffmanDecoder::new().decode(&mut r, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn roundtrips_below_min_chunk_as_raw() {
        roundtrip(b"short");
    }

    #[test]
    fn roundtrips_single_symbol_chunk() {
        roundtrip(&[b'x'; 100]);
    }

    #[test]
    fn roundtrips_skewed_text_distribution() {
        let text = "the quick brown fox jumps over the lazy dog".repeat(50);
        roundtrip(text.as_bytes());
    }

    #[test]
    fn roundtrips_across_multiple_chunks() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 200) as u8).collect();
        roundtrip(&data);
    }

    #[test]
    fn canonical_codes_are_prefix_free_for_simple_lengths() {
        let syms_lens = vec![(b'a', 1u8), (b'b', 2), (b'c', 3), (b'd', 3)];
        let canon = assign_canonical_codes(&syms_lens);
        for i in 0..canon.len() {
            for j in (i + 1)..canon.len() {
                let (_, li, ci) = canon[i];
                let (_, lj, cj) = canon[j];
                let min_len = li.min(lj);
                assert_ne!(ci >> (li - min_len), cj >> (lj - min_len));
            }
        }
    }
}
