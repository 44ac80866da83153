//! MSB-first bit reader (spec §4.1), the mirror of [`super::writer::BitWriter`].
//!
//! Bytes pulled from the source are appended into a 128-bit FIFO accumulator
//! on the low side and consumed from the high side, so the read order
//! exactly matches the order `BitWriter` emitted them in, regardless of how
//! the n-bit requests are chunked on either side.

use std::io::Read;

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

/// Buffered MSB-first bit reader over any [`Read`] source.
pub struct BitReader<R: Read> {
    source: R,
    in_buf: Vec<u8>,
    in_cap: usize,
    buf_pos: usize,
    buf_len: usize,
    acc: u128,
    acc_bits: u32,
    read: u64,
    source_exhausted: bool,
    closed: bool,
}

impl<R: Read> BitReader<R> {
    /// Creates a reader with the default (minimum) internal buffer size.
    pub fn new(source: R) -> Self {
        Self::with_buffer_size(source, crate::bitstream::MIN_BUFFER_SIZE)
    }

    /// Creates a reader with a caller-chosen internal buffer size, rounded
    /// up to the nearest valid size per spec §4.1.
    pub fn with_buffer_size(source: R, buffer_size: usize) -> Self {
        let cap = normalize_buffer_size(buffer_size);
        BitReader {
            source,
            in_buf: vec![0u8; cap],
            in_cap: cap,
            buf_pos: 0,
            buf_len: 0,
            acc: 0,
            acc_bits: 0,
            read: 0,
            source_exhausted: false,
            closed: false,
        }
    }

    /// Total number of bits consumed so far.
    pub fn read(&self) -> u64 {
        self.read
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self) -> Result<u8> {
        self.read_bits(1).map(|v| v as u8)
    }

    /// Reads `n` bits, MSB-first, for `1 <= n <= 64`, returning them
    /// right-aligned in the result.
    pub fn read_bits(&mut self, n: u32) -> Result<u64> {
        if self.closed {
            return Err(KanziError::Read(BitstreamError::StreamClosed));
        }
        if n == 0 || n > 64 {
            return Err(KanziError::InvalidParameter(format!(
                "read_bits: n={n} out of range [1,64]"
            )));
        }
        self.ensure_bits(n)?;
        let shift = self.acc_bits - n;
        let value = ((self.acc >> shift) & mask128(n)) as u64;
        self.acc &= mask128(shift);
        self.acc_bits = shift;
        self.read += n as u64;
        Ok(value)
    }

    /// Bulk read of `n` bits into `buf` starting at bit offset `start_bit`
    /// (0 = the MSB of `buf[0]`), mirroring
    /// [`super::writer::BitWriter::write_bits_from_bytes`]. `buf` must be
    /// large enough to hold `start_bit + n` bits.
    pub fn read_bits_into_bytes(&mut self, buf: &mut [u8], start_bit: usize, n: usize) -> Result<usize> {
        let mut remaining = n;
        let mut bit_pos = start_bit;
        while remaining > 0 {
            if self.acc_bits == 0 && bit_pos % 8 == 0 && remaining >= 8 {
                let nbytes = remaining / 8;
                for i in 0..nbytes {
                    let byte_idx = bit_pos / 8 + i;
                    buf[byte_idx] = self.read_bits(8)? as u8;
                }
                bit_pos += nbytes * 8;
                remaining -= nbytes * 8;
            } else {
                let bit = self.read_bit()?;
                let byte_idx = bit_pos / 8;
                let bit_in_byte = 7 - (bit_pos % 8);
                if bit != 0 {
                    buf[byte_idx] |= 1 << bit_in_byte;
                } else {
                    buf[byte_idx] &= !(1 << bit_in_byte);
                }
                bit_pos += 1;
                remaining -= 1;
            }
        }
        Ok(n)
    }

    fn ensure_bits(&mut self, n: u32) -> Result<()> {
        while self.acc_bits < n {
            if self.buf_pos >= self.buf_len {
                self.refill()?;
                if self.buf_len == 0 {
                    return Err(KanziError::Read(BitstreamError::EndOfStream));
                }
            }
            let byte = self.in_buf[self.buf_pos];
            self.buf_pos += 1;
            self.acc = (self.acc << 8) | byte as u128;
            self.acc_bits += 8;
        }
        Ok(())
    }

    fn refill(&mut self) -> Result<()> {
        if self.source_exhausted {
            self.buf_len = 0;
            return Ok(());
        }
        let mut total = 0;
        while total < self.in_cap {
            let n = self
                .source
                .read(&mut self.in_buf[total..])
                .map_err(|e| KanziError::Read(BitstreamError::Io(e)))?;
            if n == 0 {
                self.source_exhausted = true;
                break;
            }
            total += n;
        }
        self.buf_pos = 0;
        self.buf_len = total;
        Ok(())
    }

    /// Marks the reader closed; further reads return [`BitstreamError::StreamClosed`].
    pub fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::writer::BitWriter;
    use std::io::Cursor;

    #[test]
    fn read_past_end_of_stream_is_an_error() {
        let mut r = BitReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(matches!(
            r.read_bits(8),
            Err(KanziError::Read(BitstreamError::EndOfStream))
        ));
    }

    #[test]
    fn read_tracks_total_bits_consumed() {
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf);
            w.write_bits(0xABCD, 16).unwrap();
            w.close().unwrap();
        }
        let mut r = BitReader::new(Cursor::new(buf));
        assert_eq!(r.read(), 0);
        r.read_bits(4).unwrap();
        assert_eq!(r.read(), 4);
        r.read_bits(12).unwrap();
        assert_eq!(r.read(), 16);
    }

    #[test]
    fn read_after_close_is_an_error() {
        let mut r = BitReader::new(Cursor::new(vec![0u8; 8]));
        r.close();
        assert!(matches!(
            r.read_bit(),
            Err(KanziError::Read(BitstreamError::StreamClosed))
        ));
    }

    #[test]
    fn small_buffer_size_still_roundtrips_across_refills() {
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::with_buffer_size(&mut buf, 0);
            for i in 0..500u64 {
                w.write_bits(i & 0xFF, 8).unwrap();
            }
            w.close().unwrap();
        }
        let mut r = BitReader::with_buffer_size(Cursor::new(buf), 0);
        for i in 0..500u64 {
            assert_eq!(r.read_bits(8).unwrap(), i & 0xFF);
        }
    }

    #[test]
    fn bulk_into_bytes_mirrors_write_bits_from_bytes() {
        let payload = [0xDEu8, 0xAD, 0xBE, 0xEF];
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf);
            w.write_bits_from_bytes(&payload, 0, 32).unwrap();
            w.close().unwrap();
        }
        let mut r = BitReader::new(Cursor::new(buf));
        let mut out = [0u8; 4];
        r.read_bits_into_bytes(&mut out, 0, 32).unwrap();
        assert_eq!(out, payload);
    }
}
