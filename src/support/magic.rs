//! Magic-byte data-type detection (spec §4.5a), used to drive transform-chain
//! selection when the caller leaves the chain unspecified ("auto" mode).
//!
//! Grounded on the teacher's byte-signature-table idiom for its own frame
//! magic numbers (`frame::types` in the teacher), applied here to container
//! formats instead of the LZ4 frame magic.

/// Coarse classification of a block's content, used to pick a transform
/// chain when the caller requests "auto" detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Unknown,
    Elf,
    Pe,
    MachO,
    Utf8Bom,
    /// Already compressed (gzip/zip/7z/xz/bzip2) — prefer `NONE`/`PACK` only.
    AlreadyCompressed,
    Text,
}

const SIGNATURES: &[(&[u8], DataType)] = &[
    (&[0x7F, b'E', b'L', b'F'], DataType::Elf),
    (&[b'M', b'Z'], DataType::Pe),
    (&[0xFE, 0xED, 0xFA, 0xCE], DataType::MachO), // 32-bit BE
    (&[0xFE, 0xED, 0xFA, 0xCF], DataType::MachO), // 64-bit BE
    (&[0xCE, 0xFA, 0xED, 0xFE], DataType::MachO), // 32-bit LE
    (&[0xCF, 0xFA, 0xED, 0xFE], DataType::MachO), // 64-bit LE
    (&[0xEF, 0xBB, 0xBF], DataType::Utf8Bom),
    (&[0x1F, 0x8B], DataType::AlreadyCompressed), // gzip
    (&[b'P', b'K', 0x03, 0x04], DataType::AlreadyCompressed), // zip
    (&[b'7', b'z', 0xBC, 0xAF, 0x27, 0x1C], DataType::AlreadyCompressed), // 7z
    (&[0xFD, b'7', b'z', b'X', b'Z', 0x00], DataType::AlreadyCompressed), // xz
    (&[b'B', b'Z', b'h'], DataType::AlreadyCompressed), // bzip2
];

/// Classifies `data` by signature match, falling back to
/// [`crate::transform::text::looks_like_text`] for a plain-text heuristic.
pub fn detect(data: &[u8]) -> DataType {
    for (sig, kind) in SIGNATURES {
        if data.starts_with(sig) {
            return *kind;
        }
    }
    if crate::transform::text::looks_like_text(data) {
        DataType::Text
    } else {
        DataType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_elf() {
        let mut buf = vec![0x7F, b'E', b'L', b'F'];
        buf.extend([0u8; 12]);
        assert_eq!(detect(&buf), DataType::Elf);
    }

    #[test]
    fn detects_pe() {
        assert_eq!(detect(b"MZ\x90\x00"), DataType::Pe);
    }

    #[test]
    fn detects_gzip() {
        assert_eq!(detect(&[0x1F, 0x8B, 0x08, 0x00]), DataType::AlreadyCompressed);
    }

    #[test]
    fn falls_back_to_text_heuristic() {
        let text = b"The quick brown fox jumps over the lazy dog. ".repeat(4);
        assert_eq!(detect(&text), DataType::Text);
    }

    #[test]
    fn unknown_for_random_binary() {
        let data: Vec<u8> = (0..64u32).map(|i| ((i * 37) % 256) as u8).collect();
        assert_eq!(detect(&data), DataType::Unknown);
    }
}
