//! BRT — Behemoth Rank Transform (spec §4.4.4): a move-to-front variant
//! seeded from a frequency-sorted initial symbol order rather than the
//! identity order classic MTF starts from.
//!
//! Phase 1 ranks symbols by decreasing frequency (`support::sort::rank_by_frequency`).
//! Phase 2 writes a varint header describing that order so the decoder can
//! rebuild the same starting list without re-deriving it from the payload.
//! Phase 3 replaces each byte with its current rank in the list, then moves
//! it to rank 0 — a plain `Vec::copy_within` shift rather than the spec's
//! vectorized "decrement all ranks above" pass, since this crate has no SIMD
//! lane to target; the algorithmic shape (symbol-by-symbol rank emission,
//! move-to-front) is unchanged.

use super::slice::Transform;
use crate::error::{KanziError, Result};
use crate::support::histogram::histogram0;
use crate::support::sort::rank_by_frequency;
use crate::support::varint::{read_varint, write_varint};

fn move_to_front(list: &mut [u8], rank: usize) {
    let sym = list[rank];
    list.copy_within(0..rank, 1);
    list[0] = sym;
}

#[derive(Default)]
pub struct BrtCodec;

impl BrtCodec {
    pub fn new() -> Self {
        BrtCodec
    }
}

impl Transform for BrtCodec {
    fn forward(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<bool> {
        if input.is_empty() {
            return Ok(false);
        }
        let hist = histogram0(input);
        let ranked = rank_by_frequency(&hist);
        let present: Vec<u8> = ranked.into_iter().filter(|&s| hist[s] > 0).map(|s| s as u8).collect();

        output.clear();
        write_varint(output, present.len() as u64);
        for &sym in &present {
            output.push(sym);
            write_varint(output, hist[sym as usize] as u64);
        }

        let mut list = present.clone();
        let mut pos_of = [0u8; 256];
        for (i, &s) in list.iter().enumerate() {
            pos_of[s as usize] = i as u8;
        }

        for &b in input {
            let rank = pos_of[b as usize] as usize;
            output.push(rank as u8);
            move_to_front(&mut list, rank);
            for i in 0..=rank {
                pos_of[list[i] as usize] = i as u8;
            }
        }

        Ok(output.len() < input.len())
    }

    fn inverse(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        let mut pos = 0usize;
        let nb_symbols = read_varint(input, &mut pos)
            .ok_or_else(|| KanziError::InvalidStream("BRT: truncated symbol count".into()))? as usize;

        let mut list = Vec::with_capacity(nb_symbols);
        let mut total = 0u64;
        for _ in 0..nb_symbols {
            let sym = *input
                .get(pos)
                .ok_or_else(|| KanziError::InvalidStream("BRT: truncated symbol table".into()))?;
            pos += 1;
            let freq = read_varint(input, &mut pos)
                .ok_or_else(|| KanziError::InvalidStream("BRT: truncated symbol frequency".into()))?;
            list.push(sym);
            total += freq;
        }

        output.clear();
        output.reserve(total as usize);
        for _ in 0..total {
            let rank = *input
                .get(pos)
                .ok_or_else(|| KanziError::InvalidStream("BRT: truncated rank stream".into()))? as usize;
            pos += 1;
            if rank >= list.len() {
                return Err(KanziError::InvalidStream("BRT: rank out of range".into()));
            }
            let sym = list[rank];
            output.push(sym);
            move_to_front(&mut list, rank);
        }
        Ok(())
    }

    fn max_encoded_length(&self, input_len: usize) -> usize {
        input_len + 256 * 6 + 16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8]) {
        let mut codec = BrtCodec::new();
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
    fn roundtrips_skewed_text() {
        roundtrip("mississippi river mississippi river".repeat(10).as_bytes());
    }

    #[test]
    fn roundtrips_single_symbol_run() {
        roundtrip(&[5u8; 200]);
    }

    #[test]
    fn roundtrips_full_byte_alphabet() {
        let data: Vec<u8> = (0..=255u8).cycle().take(2000).collect();
        roundtrip(&data);
    }

    #[test]
    fn declines_empty_input() {
        let mut codec = BrtCodec::new();
        let mut out = Vec::new();
        assert!(!codec.forward(&[], &mut out).unwrap());
    }
}
