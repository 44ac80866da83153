//! Exp-Golomb coder (spec §4.2.6), used by the Huffman coder to delta-encode
//! code lengths. Unsigned uses the standard `1.0^k.m` layout; signed encodes
//! the magnitude unsigned, followed by a sign bit when the magnitude is
//! non-zero ("zigzag-style reconstruction on decode").

use super::types::{BlockReader, BlockWriter};
use crate::error::{KanziError, Result};

/// Writes `value` using the standard order-0 Exp-Golomb code.
pub fn write_unsigned(writer: &mut BlockWriter, value: u64) -> Result<()> {
    let n = value + 1;
    let nbits = 64 - n.leading_zeros();
    for _ in 0..(nbits - 1) {
        writer.write_bit(0)?;
    }
    writer.write_bits(n, nbits)?;
    Ok(())
}

/// Reads a value written by [`write_unsigned`].
pub fn read_unsigned(reader: &mut BlockReader) -> Result<u64> {
    let mut zeros = 0u32;
    loop {
        if reader.read_bit()? == 1 {
            break;
        }
        zeros += 1;
        if zeros > 62 {
            return Err(KanziError::InvalidStream(
                "Exp-Golomb prefix exceeds 62 leading zero bits".into(),
            ));
        }
    }
    let rest = if zeros > 0 { reader.read_bits(zeros)? } else { 0 };
    let n = (1u64 << zeros) | rest;
    Ok(n - 1)
}

/// Writes a signed value: magnitude via [`write_unsigned`], then a sign bit
/// when the magnitude is non-zero.
pub fn write_signed(writer: &mut BlockWriter, value: i64) -> Result<()> {
    let mag = value.unsigned_abs();
    write_unsigned(writer, mag)?;
    if mag != 0 {
        writer.write_bit((value < 0) as u8)?;
    }
    Ok(())
}

/// Reads a value written by [`write_signed`].
pub fn read_signed(reader: &mut BlockReader) -> Result<i64> {
    let mag = read_unsigned(reader)?;
    if mag == 0 {
        return Ok(0);
    }
    let sign = reader.read_bit()?;
    Ok(if sign != 0 { -(mag as i64) } else { mag as i64 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn unsigned_roundtrips_small_and_large_values() {
        let values = [0u64, 1, 2, 7, 8, 255, 65535, 1_000_000];
        let mut w = BlockWriter::new(Cursor::new(Vec::new()));
        for &v in &values {
            write_unsigned(&mut w, v).unwrap();
        }
        w.close().unwrap();
        let bytes = w.into_inner().unwrap().into_inner();
        let mut r = BlockReader::new(Cursor::new(bytes));
        for &v in &values {
            assert_eq!(read_unsigned(&mut r).unwrap(), v);
        }
    }

    #[test]
    fn signed_roundtrips_with_sign() {
        let values = [0i64, 1, -1, 42, -42, 1000, -1000];
        let mut w = BlockWriter::new(Cursor::new(Vec::new()));
        for &v in &values {
            write_signed(&mut w, v).unwrap();
        }
        w.close().unwrap();
        let bytes = w.into_inner().unwrap().into_inner();
        let mut r = BlockReader::new(Cursor::new(bytes));
        for &v in &values {
            assert_eq!(read_signed(&mut r).unwrap(), v);
        }
    }
}
