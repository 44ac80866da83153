//! Configuration data model (spec §6, expansion §2a).
//!
//! This module holds the *enumerated configuration surface* as plain data
//! with a validating constructor. Parsing that data out of `argv` or a
//! config file is the excluded "user-facing configuration parsing"
//! collaborator (spec §1); the bundled CLI (`src/main.rs`) is the only
//! consumer that builds a [`CompressorConfig`] from user input, and it does
//! the minimal possible mapping.
//!
//! Grounded on the teacher's `io::prefs::Prefs` (plain struct + `Default`,
//! no parsing logic baked in).

use crate::error::{KanziError, Result};

/// Minimum allowed block size in bytes (spec §3 "Block").
pub const MIN_BLOCK_SIZE: usize = 1024;
/// Maximum allowed block size in bytes (spec §3 "Block").
pub const MAX_BLOCK_SIZE: usize = 1 << 30;
/// Block sizes must be a multiple of this value (spec §3 "Block").
pub const BLOCK_SIZE_ALIGNMENT: usize = 16;
/// Blocks at or below this size bypass transforms/entropy entirely
/// (spec §4.5 "COPY_BLOCK").
pub const COPY_BLOCK_THRESHOLD: usize = 15;

pub const MAX_JOBS: usize = 64;

/// Current bitstream format version. Encode always stamps this value
/// (spec §6 "bsVersion: ... encode always writes version 6").
pub const CURRENT_BS_VERSION: u8 = 6;
/// Oldest bitstream format version this crate can decode.
pub const MIN_SUPPORTED_BS_VERSION: u8 = 3;

/// Frame magic number (spec §3).
pub const MAGIC: u32 = 0x4B41_4E5A;

/// Entropy coder selection (spec §6). The discriminant is the 5-bit wire id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntropyType {
    None = 0,
    Huffman = 1,
    Ans0 = 2,
    Ans1 = 3,
    Range = 4,
    Fpaq = 5,
    Tpaq = 6,
    Cm = 7,
}

impl EntropyType {
    pub fn from_id(id: u8) -> Result<Self> {
        Ok(match id {
            0 => EntropyType::None,
            1 => EntropyType::Huffman,
            2 => EntropyType::Ans0,
            3 => EntropyType::Ans1,
            4 => EntropyType::Range,
            5 => EntropyType::Fpaq,
            6 => EntropyType::Tpaq,
            7 => EntropyType::Cm,
            other => {
                return Err(KanziError::InvalidStream(format!(
                    "unknown entropy type id {other}"
                )))
            }
        })
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match name.to_ascii_uppercase().as_str() {
            "NONE" => EntropyType::None,
            "HUFFMAN" => EntropyType::Huffman,
            "ANS0" => EntropyType::Ans0,
            "ANS1" => EntropyType::Ans1,
            "RANGE" => EntropyType::Range,
            "FPAQ" => EntropyType::Fpaq,
            "TPAQ" => EntropyType::Tpaq,
            "CM" => EntropyType::Cm,
            other => {
                return Err(KanziError::InvalidParameter(format!(
                    "unknown entropy name '{other}'"
                )))
            }
        })
    }
}

/// Transform selection (spec §6). Ids > the algorithms this spec details in
/// §4.4 are accepted on the wire and alias a sibling implementation per
/// SPEC_FULL.md §6's closing paragraph and DESIGN.md Open Question 1 — the
/// 48-bit mask's id space is never narrowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransformType {
    None = 0,
    Pack = 1,
    Bwt = 2,
    Bwts = 3,
    Lz = 4,
    Lzx = 5,
    Lzp = 6,
    Rolz = 7,
    Rolzx = 8,
    Rlt = 9,
    Zrlt = 10,
    Mtft = 11,
    Rank = 12,
    Srt = 13,
    Text = 14,
    Mm = 15,
    Utf = 16,
    Exe = 17,
    Fsd = 18,
    Merge = 19,
    X86 = 20,
    Diff = 21,
}

impl TransformType {
    pub fn from_id(id: u8) -> Result<Self> {
        Ok(match id {
            0 => TransformType::None,
            1 => TransformType::Pack,
            2 => TransformType::Bwt,
            3 => TransformType::Bwts,
            4 => TransformType::Lz,
            5 => TransformType::Lzx,
            6 => TransformType::Lzp,
            7 => TransformType::Rolz,
            8 => TransformType::Rolzx,
            9 => TransformType::Rlt,
            10 => TransformType::Zrlt,
            11 => TransformType::Mtft,
            12 => TransformType::Rank,
            13 => TransformType::Srt,
            14 => TransformType::Text,
            15 => TransformType::Mm,
            16 => TransformType::Utf,
            17 => TransformType::Exe,
            18 => TransformType::Fsd,
            19 => TransformType::Merge,
            20 => TransformType::X86,
            21 => TransformType::Diff,
            other => {
                return Err(KanziError::InvalidStream(format!(
                    "unknown transform type id {other}"
                )))
            }
        })
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match name.to_ascii_uppercase().as_str() {
            "NONE" => TransformType::None,
            "PACK" => TransformType::Pack,
            "BWT" => TransformType::Bwt,
            "BWTS" => TransformType::Bwts,
            "LZ" => TransformType::Lz,
            "LZX" => TransformType::Lzx,
            "LZP" => TransformType::Lzp,
            "ROLZ" => TransformType::Rolz,
            "ROLZX" => TransformType::Rolzx,
            "RLT" => TransformType::Rlt,
            "ZRLT" => TransformType::Zrlt,
            "MTFT" => TransformType::Mtft,
            "RANK" => TransformType::Rank,
            "SRT" => TransformType::Srt,
            "TEXT" => TransformType::Text,
            "MM" => TransformType::Mm,
            "UTF" => TransformType::Utf,
            "EXE" => TransformType::Exe,
            "FSD" => TransformType::Fsd,
            "MERGE" => TransformType::Merge,
            "X86" => TransformType::X86,
            "DIFF" => TransformType::Diff,
            other => {
                return Err(KanziError::InvalidParameter(format!(
                    "unknown transform name '{other}'"
                )))
            }
        })
    }
}

/// Checksum width applied per block (spec §6 `checksum`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checksum {
    None,
    Bits32,
    Bits64,
}

impl Checksum {
    pub fn wire_id(self) -> u8 {
        match self {
            Checksum::None => 0,
            Checksum::Bits32 => 1,
            Checksum::Bits64 => 2,
        }
    }

    pub fn from_wire_id(id: u8) -> Result<Self> {
        Ok(match id {
            0 => Checksum::None,
            1 => Checksum::Bits32,
            2 => Checksum::Bits64,
            other => {
                return Err(KanziError::InvalidStream(format!(
                    "unknown checksum kind id {other}"
                )))
            }
        })
    }

    pub fn bits(self) -> u32 {
        match self {
            Checksum::None => 0,
            Checksum::Bits32 => 32,
            Checksum::Bits64 => 64,
        }
    }
}

/// Default block size: 1 MiB, a multiple of 16, well within bounds.
pub const DEFAULT_BLOCK_SIZE: usize = 1 << 20;

/// Full compressor configuration (spec §6).
#[derive(Debug, Clone)]
pub struct CompressorConfig {
    pub entropy: EntropyType,
    pub transforms: Vec<TransformType>,
    pub block_size: usize,
    pub jobs: usize,
    pub checksum: Checksum,
    pub file_size: Option<u64>,
    pub headerless: bool,
    pub bs_version: u8,
    pub skip_blocks: bool,
    pub verbosity: u8,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        CompressorConfig {
            entropy: EntropyType::Huffman,
            transforms: vec![TransformType::Lzx],
            block_size: DEFAULT_BLOCK_SIZE,
            jobs: 1,
            checksum: Checksum::None,
            file_size: None,
            headerless: false,
            bs_version: CURRENT_BS_VERSION,
            skip_blocks: false,
            verbosity: 0,
        }
    }
}

impl CompressorConfig {
    /// Validates this configuration against spec §3/§6 bounds. Never mutates
    /// the configuration; callers that want defaults filled in should start
    /// from [`CompressorConfig::default`].
    pub fn validate(&self) -> Result<()> {
        if self.block_size < MIN_BLOCK_SIZE || self.block_size > MAX_BLOCK_SIZE {
            return Err(KanziError::InvalidParameter(format!(
                "block_size {} out of range [{}, {}]",
                self.block_size, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE
            )));
        }
        if self.block_size % BLOCK_SIZE_ALIGNMENT != 0 {
            return Err(KanziError::InvalidParameter(format!(
                "block_size {} is not a multiple of {}",
                self.block_size, BLOCK_SIZE_ALIGNMENT
            )));
        }
        if self.jobs == 0 || self.jobs > MAX_JOBS {
            return Err(KanziError::InvalidParameter(format!(
                "jobs {} out of range [1, {}]",
                self.jobs, MAX_JOBS
            )));
        }
        if self.transforms.len() > 8 {
            return Err(KanziError::InvalidParameter(format!(
                "transform chain has {} slots, maximum is 8",
                self.transforms.len()
            )));
        }
        if self.bs_version < MIN_SUPPORTED_BS_VERSION || self.bs_version > CURRENT_BS_VERSION {
            return Err(KanziError::InvalidParameter(format!(
                "bsVersion {} out of supported range [{}, {}]",
                self.bs_version, MIN_SUPPORTED_BS_VERSION, CURRENT_BS_VERSION
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        CompressorConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_undersized_block() {
        let cfg = CompressorConfig {
            block_size: 100,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_unaligned_block_size() {
        let cfg = CompressorConfig {
            block_size: MIN_BLOCK_SIZE + 1,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_jobs() {
        let cfg = CompressorConfig {
            jobs: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_too_many_jobs() {
        let cfg = CompressorConfig {
            jobs: MAX_JOBS + 1,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_oversized_transform_chain() {
        let cfg = CompressorConfig {
            transforms: vec![TransformType::None; 9],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn entropy_type_roundtrips_through_id() {
        for id in 0..=7u8 {
            let t = EntropyType::from_id(id).unwrap();
            assert_eq!(t.id(), id);
        }
    }

    #[test]
    fn entropy_type_rejects_unknown_id() {
        assert!(EntropyType::from_id(8).is_err());
    }

    #[test]
    fn transform_type_roundtrips_through_id() {
        for id in 0..=21u8 {
            let t = TransformType::from_id(id).unwrap();
            assert_eq!(t.id(), id);
        }
    }

    #[test]
    fn transform_type_rejects_unknown_id() {
        assert!(TransformType::from_id(22).is_err());
    }

    #[test]
    fn checksum_roundtrips_through_wire_id() {
        for id in 0..=2u8 {
            let c = Checksum::from_wire_id(id).unwrap();
            assert_eq!(c.wire_id(), id);
        }
    }

    #[test]
    fn entropy_type_from_name_case_insensitive() {
        assert_eq!(EntropyType::from_name("cm").unwrap(), EntropyType::Cm);
        assert_eq!(EntropyType::from_name("CM").unwrap(), EntropyType::Cm);
    }
}
