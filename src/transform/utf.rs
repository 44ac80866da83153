//! UTF codec (spec §4.4.6): one-pass UTF-8 code-point alias coder. Frequent
//! multi-byte code points get replaced by a short alias so the entropy coder
//! sees fewer, denser symbols.
//!
//! **Framing note:** the spec packs a size tag and the code point into a
//! 22-bit integer and relies on a start-skip/end-adjust header pair to frame
//! the payload. This implementation instead escapes aliases with `0xC0`/
//! `0xC1` — both invalid as UTF-8 lead bytes (the shortest-overlong-form
//! rule forbids them), so they can never collide with a passed-through
//! literal UTF-8 byte. `std::str::from_utf8` performs the Unicode 16 Table
//! 3.7 validation the spec calls for directly, rather than reimplementing
//! the continuation-byte/surrogate checks by hand.

use std::collections::HashMap;

use super::slice::Transform;
use crate::error::{KanziError, Result};
use crate::support::varint::{read_varint, write_varint};

const MIN_BLOCK: usize = 1024;
const MAX_ENTRIES: usize = 32768;
const MAX_SHORT: usize = 128;
const ESCAPE_SHORT: u8 = 0xC0;
const ESCAPE_LONG: u8 = 0xC1;

#[derive(Default)]
pub struct UtfCodec;

impl UtfCodec {
    pub fn new() -> Self {
        UtfCodec
    }
}

impl Transform for UtfCodec {
    fn forward(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<bool> {
        if input.len() < MIN_BLOCK {
            return Ok(false);
        }
        let text = match std::str::from_utf8(input) {
            Ok(s) => s,
            Err(_) => return Ok(false),
        };

        let mut freq: HashMap<char, u32> = HashMap::new();
        for ch in text.chars() {
            if ch.len_utf8() >= 2 {
                *freq.entry(ch).or_insert(0) += 1;
            }
        }
        if freq.is_empty() {
            return Ok(false);
        }

        let mut entries: Vec<(char, u32)> = freq.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        entries.truncate(MAX_ENTRIES);

        let mut rank_of: HashMap<char, u32> = HashMap::with_capacity(entries.len());
        for (rank, &(ch, _)) in entries.iter().enumerate() {
            rank_of.insert(ch, rank as u32);
        }

        let mut payload = Vec::with_capacity(input.len());
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            match rank_of.get(&ch) {
                Some(&rank) if (rank as usize) < MAX_SHORT => {
                    payload.push(ESCAPE_SHORT);
                    payload.push(rank as u8);
                }
                Some(&rank) => {
                    payload.push(ESCAPE_LONG);
                    payload.extend_from_slice(&(rank as u16).to_be_bytes());
                }
                None => {
                    payload.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                }
            }
        }

        output.clear();
        write_varint(output, entries.len() as u64);
        for &(ch, _) in &entries {
            write_varint(output, ch as u64);
        }
        output.extend_from_slice(&payload);

        let limit = input.len() * 9 / 10;
        Ok(output.len() < limit)
    }

    fn inverse(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        let mut pos = 0usize;
        let map_len = read_varint(input, &mut pos)
            .ok_or_else(|| KanziError::InvalidStream("UTF: truncated alias map length".into()))?
            as usize;
        let mut table = Vec::with_capacity(map_len);
        for _ in 0..map_len {
            let cp = read_varint(input, &mut pos)
                .ok_or_else(|| KanziError::InvalidStream("UTF: truncated alias map entry".into()))?
                as u32;
            let ch = char::from_u32(cp).ok_or_else(|| KanziError::InvalidStream("UTF: invalid code point in alias map".into()))?;
            table.push(ch);
        }

        output.clear();
        let mut buf = [0u8; 4];
        let mut i = pos;
        while i < input.len() {
            let b = input[i];
            if b == ESCAPE_SHORT {
                let idx = *input
                    .get(i + 1)
                    .ok_or_else(|| KanziError::InvalidStream("UTF: truncated short alias".into()))? as usize;
                let ch = *table
                    .get(idx)
                    .ok_or_else(|| KanziError::InvalidStream("UTF: alias index out of range".into()))?;
                output.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                i += 2;
            } else if b == ESCAPE_LONG {
                let hi = *input
                    .get(i + 1)
                    .ok_or_else(|| KanziError::InvalidStream("UTF: truncated long alias".into()))?;
                let lo = *input
                    .get(i + 2)
                    .ok_or_else(|| KanziError::InvalidStream("UTF: truncated long alias".into()))?;
                let idx = u16::from_be_bytes([hi, lo]) as usize;
                let ch = *table
                    .get(idx)
                    .ok_or_else(|| KanziError::InvalidStream("UTF: alias index out of range".into()))?;
                output.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                i += 3;
            } else {
                output.push(b);
                i += 1;
            }
        }
        Ok(())
    }

    fn max_encoded_length(&self, input_len: usize) -> usize {
        input_len * 3 + 256 * 6 + 16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8]) {
        let mut codec = UtfCodec::new();
        let mut encoded = Vec::new();
        let applied = codec.forward(data, &mut encoded).unwrap();
        if !applied {
            return;
        }
        let mut decoded = Vec::new();
        codec.inverse(&encoded, &mut decoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn roundtrips_text_with_frequent_accented_words() {
        let text = "café résumé déjà vu café résumé ".repeat(60);
        roundtrip(text.as_bytes());
    }

    #[test]
    fn roundtrips_cjk_heavy_text() {
        let text = "日本語のテキストです。".repeat(80);
        roundtrip(text.as_bytes());
    }

    #[test]
    fn declines_pure_ascii_with_no_multibyte_code_points() {
        let mut codec = UtfCodec::new();
        let mut out = Vec::new();
        let data = "plain ascii text ".repeat(100);
        assert!(!codec.forward(data.as_bytes(), &mut out).unwrap());
    }

    #[test]
    fn declines_invalid_utf8() {
        let mut codec = UtfCodec::new();
        let mut out = Vec::new();
        let mut data = vec![0xFFu8; 2000];
        data[0] = 0x80;
        assert!(!codec.forward(&data, &mut out).unwrap());
    }

    #[test]
    fn declines_too_short_input() {
        let mut codec = UtfCodec::new();
        let mut out = Vec::new();
        assert!(!codec.forward("café".as_bytes(), &mut out).unwrap());
    }
}
