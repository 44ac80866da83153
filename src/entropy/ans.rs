//! Tabled ANS coder (spec §4.2.4): order-0 and order-1 range-asymmetric
//! numeral system coding with a 12-bit frequency scale.
//!
//! **Fidelity note:** order-0 splits each chunk across four independent
//! interleaved states (matching the spec's "four parallel states" framing
//! for throughput); order-1's per-position frequency table depends on the
//! immediately preceding byte, which doesn't factor cleanly across
//! independent lanes, so order-1 instead runs a single state over the whole
//! chunk. Both reuse the classic byte-renormalized rANS recurrence (as in
//! Fabian Giesen's `rans_byte.h`): `x_max = (L >> scale_bits << 8) * freq`,
//! emit/pull bytes on renormalization.

use super::types::{read_chunk_len, write_chunk_len, BlockReader, BlockWriter, EntropyDecoder, EntropyEncoder};
use crate::error::{KanziError, Result};
use crate::support::histogram::{histogram0, histogram1};
use std::collections::HashMap;

pub const MAX_CHUNK: usize = 1 << 20;
const SCALE_BITS: u32 = 12;
const SCALE: u32 = 1 << SCALE_BITS;
const RANS_L: u32 = 1 << 23;
const LANES: usize = 4;

fn normalize_freqs(counts: &[u32], target: u32) -> Vec<u32> {
    let total: u64 = counts.iter().map(|&c| c as u64).sum();
    if total == 0 {
        let base = target / counts.len() as u32;
        let mut freqs = vec![base; counts.len()];
        for f in freqs.iter_mut().take((target - base * counts.len() as u32) as usize) {
            *f += 1;
        }
        return freqs;
    }
    let mut freqs: Vec<u32> = counts
        .iter()
        .map(|&c| if c > 0 { ((c as u64 * target as u64) / total).max(1) as u32 } else { 0 })
        .collect();
    let mut diff = target as i64 - freqs.iter().map(|&f| f as i64).sum::<i64>();
    while diff != 0 {
        let idx = freqs
            .iter()
            .enumerate()
            .filter(|&(i, _)| counts[i] > 0)
            .max_by_key(|&(_, &f)| f)
            .map(|(i, _)| i)
            .expect("normalize_freqs called with at least one non-zero count");
        if diff > 0 {
            freqs[idx] += 1;
            diff -= 1;
        } else if freqs[idx] > 1 {
            freqs[idx] -= 1;
            diff += 1;
        } else {
            break;
        }
    }
    freqs
}

fn build_cum(freqs: &[u32]) -> Vec<u32> {
    let mut cum = vec![0u32; freqs.len() + 1];
    for i in 0..freqs.len() {
        cum[i + 1] = cum[i] + freqs[i];
    }
    cum
}

fn cum_to_symbol(cum: &[u32], slot: u32) -> usize {
    cum.partition_point(|&c| c <= slot) - 1
}

#[inline]
fn encode_symbol(state: &mut u32, start: u32, freq: u32, out: &mut Vec<u8>) {
    let x_max = ((RANS_L >> SCALE_BITS) << 8) * freq;
    while *state >= x_max {
        out.push((*state & 0xFF) as u8);
        *state >>= 8;
    }
    *state = ((*state / freq) << SCALE_BITS) + (*state % freq) + start;
}

#[inline]
fn decode_symbol_advance(state: &mut u32, start: u32, freq: u32, bytes: &[u8], pos: &mut usize) {
    let slot = *state & (SCALE - 1);
    let x = freq * (*state >> SCALE_BITS) + slot - start;
    *state = x;
    while *state < RANS_L {
        let b = bytes.get(*pos).copied().unwrap_or(0);
        *pos += 1;
        *state = (*state << 8) | (b as u32);
    }
}

fn encode_lane(symbols: &[u8], freq: &[u32], cum: &[u32]) -> (u32, Vec<u8>) {
    let mut state = RANS_L;
    let mut out = Vec::new();
    for &s in symbols.iter().rev() {
        encode_symbol(&mut state, cum[s as usize], freq[s as usize], &mut out);
    }
    out.reverse();
    (state, out)
}

fn decode_lane(n: usize, state0: u32, bytes: &[u8], freq: &[u32], cum: &[u32]) -> Vec<u8> {
    let mut state = state0;
    let mut pos = 0usize;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let slot = state & (SCALE - 1);
        let s = cum_to_symbol(cum, slot);
        out.push(s as u8);
        decode_symbol_advance(&mut state, cum[s], freq[s], bytes, &mut pos);
    }
    out
}

fn write_freq_table(writer: &mut BlockWriter, freqs: &[u32]) -> Result<()> {
    for &f in freqs {
        writer.write_bits(f as u64, SCALE_BITS)?;
    }
    Ok(())
}

fn read_freq_table(reader: &mut BlockReader) -> Result<Vec<u32>> {
    let mut freqs = vec![0u32; 256];
    for f in freqs.iter_mut() {
        *f = reader.read_bits(SCALE_BITS)? as u32;
    }
    Ok(freqs)
}

fn lane_len(n: usize, lane: usize) -> usize {
    let base = n / LANES;
    let rem = n % LANES;
    base + if lane < rem { 1 } else { 0 }
}

fn encode_order0(writer: &mut BlockWriter, chunk: &[u8]) -> Result<()> {
    let hist = histogram0(chunk);
    let freq = normalize_freqs(&hist, SCALE);
    let cum = build_cum(&freq);
    write_freq_table(writer, &freq)?;

    let mut lanes: [Vec<u8>; LANES] = Default::default();
    for (i, &b) in chunk.iter().enumerate() {
        lanes[i % LANES].push(b);
    }
    for lane in &lanes {
        let (state, bytes) = encode_lane(lane, &freq, &cum);
        writer.write_bits(state as u64, 32)?;
        writer.write_bits(bytes.len() as u64, 32)?;
        for b in &bytes {
            writer.write_bits(*b as u64, 8)?;
        }
    }
    Ok(())
}

fn decode_order0(reader: &mut BlockReader, n: usize, out: &mut [u8]) -> Result<()> {
    let freq = read_freq_table(reader)?;
    let cum = build_cum(&freq);

    let mut lanes: Vec<Vec<u8>> = Vec::with_capacity(LANES);
    for k in 0..LANES {
        let state0 = reader.read_bits(32)? as u32;
        let byte_len = reader.read_bits(32)? as usize;
        let mut bytes = vec![0u8; byte_len];
        for b in bytes.iter_mut() {
            *b = reader.read_bits(8)? as u8;
        }
        lanes.push(decode_lane(lane_len(n, k), state0, &bytes, &freq, &cum));
    }
    let mut idx = [0usize; LANES];
    for (i, slot) in out.iter_mut().enumerate() {
        let k = i % LANES;
        *slot = lanes[k][idx[k]];
        idx[k] += 1;
    }
    Ok(())
}

fn encode_order1(writer: &mut BlockWriter, chunk: &[u8]) -> Result<()> {
    let hist1 = histogram1(chunk);
    let used_ctxs: Vec<u8> = (0..256u32).filter(|&c| hist1[c as usize].iter().any(|&v| v > 0)).map(|c| c as u8).collect();

    let mut tables: HashMap<u8, (Vec<u32>, Vec<u32>)> = HashMap::new();
    writer.write_bits(used_ctxs.len() as u64, 16)?;
    for &ctx in &used_ctxs {
        let freq = normalize_freqs(&hist1[ctx as usize], SCALE);
        writer.write_bits(ctx as u64, 8)?;
        write_freq_table(writer, &freq)?;
        let cum = build_cum(&freq);
        tables.insert(ctx, (freq, cum));
    }

    let mut state = RANS_L;
    let mut out = Vec::new();
    for i in (0..chunk.len()).rev() {
        let ctx = if i == 0 { 0 } else { chunk[i - 1] };
        let (freq, cum) = tables
            .get(&ctx)
            .expect("every context touched during encoding was recorded in the table");
        let sym = chunk[i];
        encode_symbol(&mut state, cum[sym as usize], freq[sym as usize], &mut out);
    }
    out.reverse();
    writer.write_bits(state as u64, 32)?;
    writer.write_bits(out.len() as u64, 32)?;
    for b in &out {
        writer.write_bits(*b as u64, 8)?;
    }
    Ok(())
}

fn decode_order1(reader: &mut BlockReader, n: usize, out: &mut [u8]) -> Result<()> {
    let nb_contexts = reader.read_bits(16)? as usize;
    let mut tables: HashMap<u8, (Vec<u32>, Vec<u32>)> = HashMap::with_capacity(nb_contexts);
    for _ in 0..nb_contexts {
        let ctx = reader.read_bits(8)? as u8;
        let freq = read_freq_table(reader)?;
        let cum = build_cum(&freq);
        tables.insert(ctx, (freq, cum));
    }

    let state0 = reader.read_bits(32)? as u32;
    let byte_len = reader.read_bits(32)? as usize;
    let mut bytes = vec![0u8; byte_len];
    for b in bytes.iter_mut() {
        *b = reader.read_bits(8)? as u8;
    }

    let mut state = state0;
    let mut pos = 0usize;
    let mut prev = 0u8;
    for slot in out.iter_mut().take(n) {
        let (freq, cum) = tables
            .get(&prev)
            .ok_or_else(|| KanziError::InvalidStream("ANS order-1 context missing from stream".into()))?;
        let rans_slot = state & (SCALE - 1);
        let sym = cum_to_symbol(cum, rans_slot);
        *slot = sym as u8;
        decode_symbol_advance(&mut state, cum[sym], freq[sym], &bytes, &mut pos);
        prev = sym as u8;
    }
    Ok(())
}

pub struct AnsEncoder {
    order: u8,
}

impl AnsEncoder {
    pub fn new(order: u8) -> Self {
        AnsEncoder { order }
    }
}

impl EntropyEncoder for AnsEncoder {
    fn encode(&mut self, writer: &mut BlockWriter, buf: &[u8]) -> Result<()> {
        for chunk in buf.chunks(MAX_CHUNK.max(1)) {
            write_chunk_len(writer, chunk.len())?;
            if chunk.is_empty() {
                continue;
            }
            match self.order {
                0 => encode_order0(writer, chunk)?,
                _ => encode_order1(writer, chunk)?,
            }
        }
        Ok(())
    }

    fn dispose(&mut self, _writer: &mut BlockWriter) -> Result<()> {
        Ok(())
    }
}

pub struct AnsDecoder {
    order: u8,
}

impl AnsDecoder {
    pub fn new(order: u8) -> Self {
        AnsDecoder { order }
    }
}

impl EntropyDecoder for AnsDecoder {
    fn decode(&mut self, reader: &mut BlockReader, buf: &mut [u8]) -> Result<()> {
        let mut offset = 0;
        while offset < buf.len() {
            let clen = read_chunk_len(reader)?;
            if clen > 0 {
                match self.order {
                    0 => decode_order0(reader, clen, &mut buf[offset..offset + clen])?,
                    _ => decode_order1(reader, clen, &mut buf[offset..offset + clen])?,
                }
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

    fn roundtrip(order: u8, data: &[u8]) {
        let mut w = BlockWriter::new(Cursor::new(Vec::new()));
        AnsEncoder::new(order).encode(&mut w, data).unwrap();
        w.close().unwrap();
        let bytes = w.into_inner().unwrap().into_inner();

        let mut r = BlockReader::new(Cursor::new(bytes));
        let mut out = vec![0u8; data.len()];
        AnsDecoder::new(order).decode(&mut r, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn order0_roundtrips_empty_input() {
        roundtrip(0, &[]);
    }

    #[test]
    fn order0_roundtrips_text_like_data() {
        roundtrip(0, "the quick brown fox jumps over the lazy dog".repeat(100).as_bytes());
    }

    #[test]
    fn order0_roundtrips_single_symbol() {
        roundtrip(0, &[7u8; 500]);
    }

    #[test]
    fn order0_roundtrips_length_not_divisible_by_lane_count() {
        let data: Vec<u8> = (0..257u32).map(|i| (i % 250) as u8).collect();
        roundtrip(0, &data);
    }

    #[test]
    fn order1_roundtrips_markov_like_data() {
        let mut data = Vec::new();
        for i in 0..2000u32 {
            data.push(if i % 2 == 0 { b'a' } else { b'b' });
        }
        roundtrip(1, &data);
    }

    #[test]
    fn order1_roundtrips_single_byte_chunk() {
        roundtrip(1, &[42u8]);
    }

    #[test]
    fn normalize_freqs_sums_to_target() {
        let counts = [10u32, 0, 5, 0, 1];
        let freqs = normalize_freqs(&counts, 4096);
        assert_eq!(freqs.iter().sum::<u32>(), 4096);
        assert_eq!(freqs[1], 0);
        assert_eq!(freqs[3], 0);
        assert!(freqs[0] > 0 && freqs[2] > 0 && freqs[4] > 0);
    }
}
