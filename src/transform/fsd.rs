//! FSD codec (spec §4.4.7): Fixed-Step Delta. Samples the block at a few
//! candidate strides, picks the one with the lowest first-order entropy, and
//! re-encodes each byte as a residual against the byte `stride` positions
//! earlier — exploits the fixed-width records common in binary/audio data.

use super::slice::Transform;
use crate::error::{KanziError, Result};
use crate::support::entropy::bits_per_symbol;
use crate::support::histogram::histogram0;

const STRIDES: [usize; 5] = [1, 2, 3, 4, 8];
const SAMPLE_FRACTION: usize = 10;
const LARGE_DELTA_THRESHOLD_PCT: usize = 3;
const ESCAPE: u8 = 0xFF;
const MODE_DELTA: u8 = 0;
const MODE_XOR: u8 = 1;

fn sample_region(data: &[u8], offset_frac: usize) -> (usize, usize) {
    let len = data.len();
    let sample_len = (len / SAMPLE_FRACTION).max(1).min(len);
    let start = ((len * offset_frac) / SAMPLE_FRACTION).min(len - sample_len);
    (start, start + sample_len)
}

fn entropy_for_stride(data: &[u8], stride: usize, start: usize, end: usize) -> f64 {
    let mut hist = [0u32; 256];
    let mut total = 0u64;
    for i in start.max(stride)..end {
        let residual = data[i].wrapping_sub(data[i - stride]);
        hist[residual as usize] += 1;
        total += 1;
    }
    bits_per_symbol(&hist, total)
}

fn zigzag_encode(delta: i32) -> u32 {
    ((delta << 1) ^ (delta >> 31)) as u32
}

fn zigzag_decode(z: u32) -> i32 {
    ((z >> 1) as i32) ^ -((z & 1) as i32)
}

#[derive(Default)]
pub struct FsdCodec;

impl FsdCodec {
    pub fn new() -> Self {
        FsdCodec
    }
}

impl Transform for FsdCodec {
    fn forward(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<bool> {
        if input.len() < 256 {
            return Ok(false);
        }
        let (s1_start, s1_end) = sample_region(input, 2);
        let (s2_start, s2_end) = sample_region(input, 6);

        let baseline_hist = histogram0(&input[s1_start..s1_end]);
        let baseline = bits_per_symbol(&baseline_hist, (s1_end - s1_start) as u64);

        let mut best_stride = STRIDES[0];
        let mut best_entropy = f64::INFINITY;
        for &stride in &STRIDES {
            let e = entropy_for_stride(input, stride, s1_start, s1_end) + entropy_for_stride(input, stride, s2_start, s2_end);
            if e < best_entropy {
                best_entropy = e;
                best_stride = stride;
            }
        }
        let winning_entropy = best_entropy / 2.0;
        if baseline > 0.0 && winning_entropy >= baseline * 123.0 / 128.0 {
            return Ok(false);
        }

        let (large_start, large_end) = sample_region(input, 4);
        let mut large = 0usize;
        let mut sampled = 0usize;
        for i in large_start.max(best_stride)..large_end {
            let delta = input[i] as i32 - input[i - best_stride] as i32;
            if delta.unsigned_abs() > 63 {
                large += 1;
            }
            sampled += 1;
        }
        let mode = if sampled > 0 && large * 100 / sampled > LARGE_DELTA_THRESHOLD_PCT {
            MODE_XOR
        } else {
            MODE_DELTA
        };

        output.clear();
        output.push(best_stride as u8);
        output.push(mode);
        output.extend_from_slice(&input[..best_stride.min(input.len())]);

        for i in best_stride..input.len() {
            let prev = input[i - best_stride];
            let cur = input[i];
            if mode == MODE_XOR {
                output.push(cur ^ prev);
            } else {
                let delta = cur as i32 - prev as i32;
                let zz = zigzag_encode(delta);
                if zz < ESCAPE as u32 {
                    output.push(zz as u8);
                } else {
                    output.push(ESCAPE);
                    output.extend_from_slice(&(delta as i16).to_le_bytes());
                }
            }
        }

        Ok(output.len() < input.len())
    }

    fn inverse(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        if input.len() < 2 {
            return Err(KanziError::InvalidStream("FSD: truncated header".into()));
        }
        let stride = input[0] as usize;
        let mode = input[1];
        if stride == 0 {
            return Err(KanziError::InvalidStream("FSD: stride must be nonzero".into()));
        }
        let mut pos = 2usize;
        output.clear();
        let prefix_end = (pos + stride).min(input.len());
        output.extend_from_slice(&input[pos..prefix_end]);
        pos = prefix_end;

        while pos < input.len() {
            let idx = output.len();
            if idx < stride {
                return Err(KanziError::InvalidStream("FSD: residual before prefix established".into()));
            }
            let prev = output[idx - stride];
            if mode == MODE_XOR {
                let b = input[pos];
                output.push(b ^ prev);
                pos += 1;
            } else {
                let tok = input[pos];
                if tok == ESCAPE {
                    let lo = *input
                        .get(pos + 1)
                        .ok_or_else(|| KanziError::InvalidStream("FSD: truncated escape delta".into()))?;
                    let hi = *input
                        .get(pos + 2)
                        .ok_or_else(|| KanziError::InvalidStream("FSD: truncated escape delta".into()))?;
                    let delta = i16::from_le_bytes([lo, hi]) as i32;
                    output.push((prev as i32 + delta) as u8);
                    pos += 3;
                } else {
                    let delta = zigzag_decode(tok as u32);
                    output.push((prev as i32 + delta) as u8);
                    pos += 1;
                }
            }
        }
        Ok(())
    }

    fn max_encoded_length(&self, input_len: usize) -> usize {
        input_len * 3 + 16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8]) {
        let mut codec = FsdCodec::new();
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
    fn roundtrips_stride_two_pcm_like_samples() {
        let mut data = Vec::new();
        let mut v: i32 = 1000;
        for i in 0..4000 {
            v += ((i % 7) as i32) - 3;
            let s = (v % 30000) as i16;
            data.extend_from_slice(&s.to_le_bytes());
        }
        roundtrip(&data);
    }

    #[test]
    fn roundtrips_stride_four_struct_like_data() {
        let data: Vec<u8> = (0..4000u32).map(|i| ((i / 4) % 251) as u8).collect();
        roundtrip(&data);
    }

    #[test]
    fn roundtrips_data_requiring_escape_deltas() {
        let data: Vec<u8> = (0..2000u32).map(|i| if i % 13 == 0 { 255 } else { 0 }).collect();
        roundtrip(&data);
    }

    #[test]
    fn declines_too_short_input() {
        let mut codec = FsdCodec::new();
        let mut out = Vec::new();
        assert!(!codec.forward(b"tiny", &mut out).unwrap());
    }

    #[test]
    fn declines_already_high_entropy_data() {
        let mut codec = FsdCodec::new();
        let mut out = Vec::new();
        let data: Vec<u8> = (0..4000u32).map(|i| ((i * 2654435761) % 256) as u8).collect();
        assert!(!codec.forward(&data, &mut out).unwrap());
    }
}
