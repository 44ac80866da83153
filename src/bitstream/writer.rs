//! MSB-first bit writer (spec §4.1).
//!
//! Internally uses a 128-bit accumulator (FIFO: new bits are appended on the
//! low side, flushed words are extracted from the high side) rather than a
//! literal 64-bit register — this sidesteps shift-overflow edge cases when a
//! partial word is carried across a `write_bits` call while a full 64-bit
//! big-endian word is still emitted on every flush, so the wire format is
//! unaffected. Grounded on the teacher's byte-order helpers
//! (`frame::header::write_le64`-style explicit-endianness writes, here
//! big-endian per spec) and its generic-over-`Write` I/O plumbing.

use std::io::Write;

use crate::bitstream::normalize_buffer_size;
use crate::error::{BitstreamError, KanziError, Result};

#[inline]
fn mask128(n: u32) -> u128 {
    if n == 0 {
        0
    } else if n >= 128 {
        u128::MAX
    } else {
        (1u128 << n) - 1
    }
}

/// Buffered MSB-first bit writer over any [`Write`] sink.
pub struct BitWriter<W: Write> {
    sink: W,
    out_buf: Vec<u8>,
    out_cap: usize,
    acc: u128,
    acc_bits: u32,
    written: u64,
    closed: bool,
}

impl<W: Write> BitWriter<W> {
    /// Creates a writer with the default (minimum) internal buffer size.
    pub fn new(sink: W) -> Self {
        Self::with_buffer_size(sink, crate::bitstream::MIN_BUFFER_SIZE)
    }

    /// Creates a writer with a caller-chosen internal buffer size, rounded
    /// up to the nearest valid size per spec §4.1.
    pub fn with_buffer_size(sink: W, buffer_size: usize) -> Self {
        let cap = normalize_buffer_size(buffer_size);
        BitWriter {
            sink,
            out_buf: Vec::with_capacity(cap),
            out_cap: cap,
            acc: 0,
            acc_bits: 0,
            written: 0,
            closed: false,
        }
    }

    /// Total number of payload bits written so far (excludes final padding).
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, bit: u8) -> Result<()> {
        self.write_bits((bit & 1) as u64, 1).map(|_| ())
    }

    /// Writes the low `n` bits of `value`, MSB-first, for `1 <= n <= 64`.
    pub fn write_bits(&mut self, value: u64, n: u32) -> Result<u32> {
        if self.closed {
            return Err(KanziError::Write(BitstreamError::StreamClosed));
        }
        if n == 0 || n > 64 {
            return Err(KanziError::InvalidParameter(format!(
                "write_bits: n={n} out of range [1,64]"
            )));
        }
        let v = if n == 64 {
            value as u128
        } else {
            (value as u128) & mask128(n)
        };
        self.append(v, n)?;
        self.written += n as u64;
        Ok(n)
    }

    /// Bulk write of `n` bits read from `buf` starting at bit offset
    /// `start_bit` (0 = the MSB of `buf[0]`). Uses a byte-aligned fast path
    /// when both the writer and the source offset are byte-aligned, falling
    /// back to a per-bit path otherwise (spec §4.1 "byte-aligned and
    /// non-aligned fast paths").
    pub fn write_bits_from_bytes(&mut self, buf: &[u8], start_bit: usize, n: usize) -> Result<usize> {
        if self.closed {
            return Err(KanziError::Write(BitstreamError::StreamClosed));
        }
        let mut remaining = n;
        let mut bit_pos = start_bit;
        while remaining > 0 {
            if self.acc_bits == 0 && bit_pos % 8 == 0 && remaining >= 8 {
                let nbytes = remaining / 8;
                let byte_start = bit_pos / 8;
                for &byte in &buf[byte_start..byte_start + nbytes] {
                    self.out_buf.push(byte);
                }
                self.written += (nbytes * 8) as u64;
                bit_pos += nbytes * 8;
                remaining -= nbytes * 8;
                if self.out_buf.len() >= self.out_cap {
                    self.flush_buffer()?;
                }
            } else {
                let byte_idx = bit_pos / 8;
                let bit_in_byte = 7 - (bit_pos % 8);
                let bit = (buf[byte_idx] >> bit_in_byte) & 1;
                self.write_bit(bit)?;
                bit_pos += 1;
                remaining -= 1;
            }
        }
        Ok(n)
    }

    #[inline]
    fn append(&mut self, v: u128, n: u32) -> Result<()> {
        self.acc = (self.acc << n) | v;
        self.acc_bits += n;
        while self.acc_bits >= 64 {
            let shift = self.acc_bits - 64;
            let word = (self.acc >> shift) as u64;
            self.out_buf.extend_from_slice(&word.to_be_bytes());
            self.acc &= mask128(shift);
            self.acc_bits = shift;
            if self.out_buf.len() >= self.out_cap {
                self.flush_buffer()?;
            }
        }
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if !self.out_buf.is_empty() {
            self.sink
                .write_all(&self.out_buf)
                .map_err(|e| KanziError::Write(BitstreamError::Io(e)))?;
            self.out_buf.clear();
        }
        Ok(())
    }

    /// Flushes any remaining bits (padding the final byte with zero bits),
    /// flushes the internal buffer to the sink, and marks the writer closed.
    /// Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if self.acc_bits > 0 {
            let pad = (8 - (self.acc_bits % 8)) % 8;
            let total_bits = self.acc_bits + pad;
            let shifted = self.acc << pad;
            let nbytes = (total_bits / 8) as usize;
            let bytes = shifted.to_be_bytes();
            // `shifted` is right-aligned in a 128-bit value; the payload
            // occupies its low `total_bits` bits, i.e. the last `nbytes`
            // bytes of the big-endian representation.
            self.out_buf
                .extend_from_slice(&bytes[bytes.len() - nbytes..]);
            self.acc = 0;
            self.acc_bits = 0;
        }
        self.flush_buffer()?;
        self.sink
            .flush()
            .map_err(|e| KanziError::Write(BitstreamError::Io(e)))?;
        self.closed = true;
        Ok(())
    }

    /// Consumes the writer, closing it first, and returns the underlying sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.close()?;
        // SAFETY-free: `sink` is moved out; avoid double-close in `Drop` by
        // reading it via ptr::read after forgetting self's destructor.
        let sink = unsafe { std::ptr::read(&self.sink) };
        std::mem::forget(self);
        Ok(sink)
    }
}

impl<W: Write> Drop for BitWriter<W> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::reader::BitReader;
    use std::io::Cursor;

    #[test]
    fn single_bits_roundtrip() {
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf);
            for b in [1u8, 0, 1, 1, 0, 0, 1, 0] {
                w.write_bit(b).unwrap();
            }
            w.close().unwrap();
        }
        let mut r = BitReader::new(Cursor::new(buf));
        let expected = [1u8, 0, 1, 1, 0, 0, 1, 0];
        for e in expected {
            assert_eq!(r.read_bit().unwrap(), e);
        }
    }

    #[test]
    fn arbitrary_widths_roundtrip_all_sizes() {
        let mut buf = Vec::new();
        let values: Vec<(u64, u32)> = (1..=64)
            .map(|n| {
                let v = if n == 64 { u64::MAX } else { (1u64 << n) - 1 };
                (v, n)
            })
            .collect();
        {
            let mut w = BitWriter::new(&mut buf);
            for &(v, n) in &values {
                w.write_bits(v, n).unwrap();
            }
            w.close().unwrap();
        }
        let mut r = BitReader::new(Cursor::new(buf));
        for &(v, n) in &values {
            assert_eq!(r.read_bits(n).unwrap(), v, "n={n}");
        }
    }

    #[test]
    fn written_tracks_logical_bits_not_padding() {
        let mut buf = Vec::new();
        let mut w = BitWriter::new(buf.clone());
        w.write_bits(0b101, 3).unwrap();
        assert_eq!(w.written(), 3);
        w.close().unwrap();
        assert_eq!(w.written(), 3);
        let _ = &mut buf;
    }

    #[test]
    fn close_is_idempotent() {
        let mut w = BitWriter::new(Vec::new());
        w.write_bits(42, 10).unwrap();
        w.close().unwrap();
        w.close().unwrap();
    }

    #[test]
    fn write_after_close_is_an_error() {
        let mut w = BitWriter::new(Vec::new());
        w.close().unwrap();
        assert!(w.write_bit(1).is_err());
    }

    #[test]
    fn bulk_byte_aligned_roundtrip() {
        let payload = [0xDEu8, 0xAD, 0xBE, 0xEF];
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf);
            w.write_bits_from_bytes(&payload, 0, 32).unwrap();
            w.close().unwrap();
        }
        assert_eq!(&buf[..4], &payload);
    }

    #[test]
    fn bulk_unaligned_roundtrip() {
        // Write 4 padding bits, then 12 bits from a 2-byte buffer starting
        // at bit offset 4 (mid-byte, exercises the slow path).
        let payload = [0b1010_1100u8, 0b1111_0000];
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf);
            w.write_bits(0, 4).unwrap();
            w.write_bits_from_bytes(&payload, 4, 12).unwrap();
            w.close().unwrap();
        }
        let mut r = BitReader::new(Cursor::new(buf));
        assert_eq!(r.read_bits(4).unwrap(), 0);
        assert_eq!(r.read_bits(12).unwrap(), 0b1100_1111_0000);
    }
}
