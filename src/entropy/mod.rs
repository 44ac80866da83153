//! Entropy coders (spec §4.2): NONE/RANGE/FPAQ/CM/TPAQ/ANS0/ANS1/HUFFMAN,
//! all sharing the [`types::EntropyEncoder`]/[`types::EntropyDecoder`]
//! contract and self-delimited chunk framing.

pub mod ans;
pub mod cm;
pub mod exp_golomb;
pub mod fpaq;
pub mod huffman;
pub mod null;
pub mod range;
pub mod types;

pub use types::{make_decoder, make_encoder, BlockReader, BlockWriter, EntropyDecoder, EntropyEncoder};
