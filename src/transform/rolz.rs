//! ROLZ codec (spec §4.4.3): Reduced-Offset LZ keyed by the last two bytes,
//! each context owning a small ring of recent positions searched for a
//! match.
//!
//! **Variant note:** this implements the bit-serial ROLZ2/ROLZX shape —
//! literal and match decisions coded directly through two
//! [`crate::predictor::rolz::RolzPredictor`] instances driving one binary
//! range coder — since it exercises the predictor this crate already built
//! for it. ROLZ1's alternative three-ANS-stream framing (separate
//! literal/index/length streams) is a wire-level repackaging of the same
//! match-finding core and is not implemented as a second codec, the same
//! scope call made for Huffman's V5-only framing.

use std::io::Cursor;

use super::slice::Transform;
use crate::entropy::types::{BlockReader, BlockWriter};
use crate::error::{KanziError, Result};
use crate::predictor::rolz::RolzPredictor;
use crate::predictor::Predictor;
use crate::support::varint::{read_varint, write_varint};

const MIN_MATCH: usize = 3;
const MAX_MATCH: usize = 258;
const POS_CHECKS: usize = 4;
const RC_BITS: u32 = 56;
const RC_MASK: u64 = (1u64 << RC_BITS) - 1;

const KEY_MATCH_FLAG: u8 = 100;
const KEY_CANDIDATE_BASE: u8 = 150;
const KEY_LENGTH_BASE: u8 = 200;

fn ctx_key(prev2: u8, prev1: u8) -> usize {
    ((prev2 as usize) << 8) | prev1 as usize
}

fn common_len(a: &[u8], start_a: usize, b: &[u8], start_b: usize, max: usize) -> usize {
    let mut n = 0;
    while n < max && start_a + n < a.len() && start_b + n < b.len() && a[start_a + n] == b[start_b + n] {
        n += 1;
    }
    n
}

struct BitCoder {
    low: u64,
    high: u64,
}

impl BitCoder {
    fn new() -> Self {
        BitCoder { low: 0, high: RC_MASK }
    }

    fn encode_bit(&mut self, writer: &mut BlockWriter, predictor: &mut dyn Predictor, bit: u8) -> Result<()> {
        let p = predictor.get() as u64;
        let range = self.high - self.low;
        let split = self.low + (((range >> 4) * p) >> 8);
        if bit != 0 {
            self.high = split;
        } else {
            self.low = split + 1;
        }
        predictor.update(bit);
        while ((self.low ^ self.high) >> 24) & 0xFFFF_FFFF == 0 {
            let word = (self.high >> 24) & 0xFFFF_FFFF;
            writer.write_bits(word, 32)?;
            self.low = (self.low << 32) & RC_MASK;
            self.high = ((self.high << 32) | 0xFFFF_FFFF) & RC_MASK;
        }
        Ok(())
    }

    fn flush(&mut self, writer: &mut BlockWriter) -> Result<()> {
        writer.write_bits(self.low, RC_BITS)?;
        Ok(())
    }
}

struct BitDecoder {
    low: u64,
    high: u64,
    code: u64,
}

impl BitDecoder {
    fn new(reader: &mut BlockReader) -> Result<Self> {
        let code = reader.read_bits(RC_BITS)?;
        Ok(BitDecoder { low: 0, high: RC_MASK, code })
    }

    fn decode_bit(&mut self, reader: &mut BlockReader, predictor: &mut dyn Predictor) -> Result<u8> {
        let p = predictor.get() as u64;
        let range = self.high - self.low;
        let split = self.low + (((range >> 4) * p) >> 8);
        let bit = if self.code <= split { 1 } else { 0 };
        if bit != 0 {
            self.high = split;
        } else {
            self.low = split + 1;
        }
        predictor.update(bit);
        while ((self.low ^ self.high) >> 24) & 0xFFFF_FFFF == 0 {
            self.low = (self.low << 32) & RC_MASK;
            self.high = ((self.high << 32) | 0xFFFF_FFFF) & RC_MASK;
            let next = reader.read_bits(32)?;
            self.code = ((self.code << 32) | next) & RC_MASK;
        }
        Ok(bit)
    }
}

struct RolzTable {
    positions: Vec<[i64; POS_CHECKS]>,
    ring: Vec<u8>,
}

impl RolzTable {
    fn new() -> Self {
        RolzTable {
            positions: vec![[-1i64; POS_CHECKS]; 1 << 16],
            ring: vec![0u8; 1 << 16],
        }
    }

    fn candidates(&self, ctx: usize) -> [i64; POS_CHECKS] {
        self.positions[ctx]
    }

    fn record(&mut self, ctx: usize, pos: usize) {
        let slot = self.ring[ctx] as usize;
        self.positions[ctx][slot] = pos as i64;
        self.ring[ctx] = ((slot + 1) % POS_CHECKS) as u8;
    }
}

#[derive(Default)]
pub struct RolzCodec;

impl RolzCodec {
    pub fn new() -> Self {
        RolzCodec
    }
}

impl Transform for RolzCodec {
    fn forward(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<bool> {
        if input.len() < 64 {
            return Ok(false);
        }
        let mut table = RolzTable::new();
        let mut literal_pred = RolzPredictor::new(POS_CHECKS);
        let mut match_pred = RolzPredictor::new(POS_CHECKS);
        let mut writer = BlockWriter::new(Cursor::new(Vec::new()));
        let mut rc = BitCoder::new();

        let mut prev2 = 0u8;
        let mut prev1 = 0u8;
        let mut i = 0usize;
        while i < input.len() {
            let ctx = ctx_key(prev2, prev1);
            let candidates = table.candidates(ctx);
            let mut best_len = 0usize;
            let mut best_slot = 0usize;
            for (slot, &cand) in candidates.iter().enumerate() {
                if cand >= 0 {
                    let l = common_len(input, cand as usize, input, i, MAX_MATCH);
                    if l > best_len {
                        best_len = l;
                        best_slot = slot;
                    }
                }
            }
            let has_match = best_len >= MIN_MATCH;

            match_pred.set_context(KEY_MATCH_FLAG, 0);
            rc.encode_bit(&mut writer, &mut match_pred, has_match as u8)?;

            let consumed = if has_match {
                for slot in 0..POS_CHECKS {
                    let bit = (slot == best_slot) as u8;
                    match_pred.set_context(KEY_CANDIDATE_BASE + slot as u8, 0);
                    rc.encode_bit(&mut writer, &mut match_pred, bit)?;
                    if bit == 1 {
                        break;
                    }
                }
                let lenval = (best_len - MIN_MATCH) as u8;
                for b in (0..8u8).rev() {
                    let bit = (lenval >> b) & 1;
                    match_pred.set_context(KEY_LENGTH_BASE + (7 - b), 0);
                    rc.encode_bit(&mut writer, &mut match_pred, bit)?;
                }
                best_len
            } else {
                let byte = input[i];
                let mut partial: u16 = 1;
                for b in (0..8u8).rev() {
                    let bit = (byte >> b) & 1;
                    literal_pred.set_context(partial as u8, 0);
                    rc.encode_bit(&mut writer, &mut literal_pred, bit)?;
                    partial = (partial << 1) | bit as u16;
                }
                1
            };

            table.record(ctx, i);
            for p in i..(i + consumed).min(input.len()) {
                prev2 = prev1;
                prev1 = input[p];
            }
            i += consumed;
        }
        rc.flush(&mut writer)?;
        writer.close()?;
        let coded = writer.into_inner()?.into_inner();

        output.clear();
        write_varint(output, input.len() as u64);
        output.extend_from_slice(&coded);
        Ok(output.len() < input.len())
    }

    fn inverse(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        let mut pos = 0usize;
        let target_len = read_varint(input, &mut pos)
            .ok_or_else(|| KanziError::InvalidStream("ROLZ: truncated length header".into()))?
            as usize;

        let mut table = RolzTable::new();
        let mut literal_pred = RolzPredictor::new(POS_CHECKS);
        let mut match_pred = RolzPredictor::new(POS_CHECKS);
        let mut reader = BlockReader::new(Cursor::new(input[pos..].to_vec()));
        let mut rc = BitDecoder::new(&mut reader)?;

        output.clear();
        let mut prev2 = 0u8;
        let mut prev1 = 0u8;
        while output.len() < target_len {
            let ctx = ctx_key(prev2, prev1);
            let candidates = table.candidates(ctx);

            match_pred.set_context(KEY_MATCH_FLAG, 0);
            let has_match = rc.decode_bit(&mut reader, &mut match_pred)? == 1;

            let start = output.len();
            if has_match {
                let mut chosen = None;
                for slot in 0..POS_CHECKS {
                    match_pred.set_context(KEY_CANDIDATE_BASE + slot as u8, 0);
                    let bit = rc.decode_bit(&mut reader, &mut match_pred)?;
                    if bit == 1 {
                        chosen = Some(slot);
                        break;
                    }
                }
                let slot = chosen.ok_or_else(|| KanziError::InvalidStream("ROLZ: no candidate slot selected".into()))?;
                let mut len_val: u8 = 0;
                for b in (0..8u8).rev() {
                    match_pred.set_context(KEY_LENGTH_BASE + (7 - b), 0);
                    let bit = rc.decode_bit(&mut reader, &mut match_pred)?;
                    len_val = (len_val << 1) | bit;
                }
                let match_len = len_val as usize + MIN_MATCH;
                let cand = candidates[slot];
                if cand < 0 {
                    return Err(KanziError::InvalidStream("ROLZ: selected candidate has no recorded position".into()));
                }
                let cand = cand as usize;
                for k in 0..match_len {
                    let b = output[cand + k];
                    output.push(b);
                }
            } else {
                let mut partial: u16 = 1;
                for _ in 0..8 {
                    literal_pred.set_context(partial as u8, 0);
                    let bit = rc.decode_bit(&mut reader, &mut literal_pred)?;
                    partial = (partial << 1) | bit as u16;
                }
                output.push((partial & 0xFF) as u8);
            }

            table.record(ctx, start);
            for p in start..output.len() {
                prev2 = prev1;
                prev1 = output[p];
            }
        }
        Ok(())
    }

    fn max_encoded_length(&self, input_len: usize) -> usize {
        input_len + input_len / 4 + 64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8]) {
        let mut codec = RolzCodec::new();
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
    fn roundtrips_repetitive_text() {
        roundtrip("the quick brown fox jumps over the lazy dog ".repeat(40).as_bytes());
    }

    #[test]
    fn roundtrips_binary_like_data() {
        let data: Vec<u8> = (0..3000u32).map(|i| ((i * 7) % 251) as u8).collect();
        roundtrip(&data);
    }

    #[test]
    fn declines_too_short_input() {
        let mut codec = RolzCodec::new();
        let mut out = Vec::new();
        assert!(!codec.forward(b"short", &mut out).unwrap());
    }
}
