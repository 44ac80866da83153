//! Bit-probability predictors shared by the entropy coders (spec §4.3).
//!
//! Every predictor implements [`Predictor`]: `get()` returns a probability in
//! `[0, 4096]` that the next bit is 1, `update(bit)` adjusts internal state
//! after the true bit is known. Grounded on the teacher's small-capability-
//! trait idiom (`block::decompress_api`'s reader/writer traits), applied here
//! to probability modeling instead of byte framing.

pub mod apm;
pub mod cm;
pub mod range;
pub mod rolz;

pub use apm::FastLogisticApm;
pub use cm::ContextMixPredictor;
pub use range::OrderOneBitPredictor;
pub use rolz::RolzPredictor;

/// Upper bound (exclusive range is `[0, PSCALE]`) for probabilities returned
/// by [`Predictor::get`].
pub const PSCALE: u32 = 4096;
pub const PSCALE_BITS: u32 = 12;

/// Capability shared by every bit-probability model in the crate.
pub trait Predictor {
    /// Probability that the next bit is 1, scaled to `[0, PSCALE]`.
    fn get(&self) -> u32;
    /// Updates internal state after observing the true bit (0 or 1).
    fn update(&mut self, bit: u8);
}

/// `stretch(p) = ln(p / (1-p))` scaled and table-driven, paired with
/// [`squash`] as its inverse. Used by the context-mixing predictor and the
/// APM (§4.3 "precomputed `squash`/`stretch` pair").
pub mod logistic {
    use std::sync::OnceLock;

    const STRETCH_SIZE: usize = 4096;

    fn squash_raw(d: i32) -> i32 {
        if d >= 2047 {
            return 4095;
        }
        if d <= -2047 {
            return 0;
        }
        let w = d & 127;
        let d = ((d >> 7) + 16) as usize;
        const T: [i32; 33] = [
            1, 2, 3, 6, 10, 16, 27, 45, 73, 120, 194, 310, 488, 747, 1101, 1546, 2047, 2549, 2994,
            3348, 3607, 3785, 3901, 3975, 4022, 4050, 4068, 4079, 4085, 4089, 4092, 4093, 4094,
        ];
        (T[d] * (128 - w) + T[d + 1] * w + 64) >> 7
    }

    /// Maps a stretched value back to a probability in `[0, 4095]`.
    pub fn squash(d: i32) -> i32 {
        squash_raw(d)
    }

    fn build_stretch_table() -> Vec<i16> {
        let mut table = vec![0i16; STRETCH_SIZE];
        let mut pi = 0usize;
        for x in -2047..=2047 {
            let v = squash_raw(x);
            for p in pi..=(v as usize) {
                table[p] = x as i16;
            }
            pi = v as usize + 1;
        }
        for p in pi..STRETCH_SIZE {
            table[p] = 2047;
        }
        table
    }

    static STRETCH_TABLE: OnceLock<Vec<i16>> = OnceLock::new();

    /// Inverse of [`squash`]: maps a probability in `[0, 4095]` to a
    /// stretched (logit-like) value in `[-2047, 2047]`.
    pub fn stretch(p: i32) -> i32 {
        let table = STRETCH_TABLE.get_or_init(build_stretch_table);
        table[p.clamp(0, STRETCH_SIZE as i32 - 1) as usize] as i32
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn squash_is_monotonic() {
            let mut prev = squash(-2047);
            for d in -2046..=2047 {
                let v = squash(d);
                assert!(v >= prev);
                prev = v;
            }
        }

        #[test]
        fn squash_stretch_roundtrip_is_approximate_inverse() {
            for p in [1, 100, 1000, 2048, 3000, 4000, 4094] {
                let s = stretch(p);
                let back = squash(s);
                assert!((back - p).abs() <= 16, "p={p} back={back}");
            }
        }

        #[test]
        fn squash_saturates_at_bounds() {
            assert_eq!(squash(-3000), 0);
            assert_eq!(squash(3000), 4095);
        }
    }
}
