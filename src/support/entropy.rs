//! Shannon first-order entropy estimate (spec §4.6), used by FSD's
//! stride/coding-mode selection and the optional `skipBlocks`
//! incompressibility pre-check (spec §6).

/// Estimated bits-per-symbol for the distribution in `hist`, given `total`
/// observations. Returns 0.0 for an empty or single-symbol histogram.
pub fn bits_per_symbol(hist: &[u32; 256], total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let mut entropy = 0.0f64;
    for &count in hist {
        if count == 0 {
            continue;
        }
        let p = count as f64 / total as f64;
        entropy -= p * p.log2();
    }
    entropy
}

/// Estimated compressed size in bytes for `data` under an order-0 model,
/// used by `skipBlocks` to decide whether a block is worth entropy coding.
pub fn estimate_bits(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let hist = super::histogram::histogram0(data);
    bits_per_symbol(&hist, data.len() as u64) * data.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::histogram::histogram0;

    #[test]
    fn constant_data_has_zero_entropy() {
        let hist = histogram0(&[7u8; 100]);
        assert_eq!(bits_per_symbol(&hist, 100), 0.0);
    }

    #[test]
    fn uniform_byte_distribution_approaches_eight_bits() {
        let data: Vec<u8> = (0..=255u8).collect();
        let hist = histogram0(&data);
        let bps = bits_per_symbol(&hist, data.len() as u64);
        assert!((bps - 8.0).abs() < 1e-9);
    }

    #[test]
    fn empty_data_has_zero_estimate() {
        assert_eq!(estimate_bits(&[]), 0.0);
    }

    #[test]
    fn skewed_distribution_is_cheaper_than_uniform() {
        let skewed = [0u8; 1000];
        let uniform: Vec<u8> = (0..1000).map(|i| (i % 256) as u8).collect();
        assert!(estimate_bits(&skewed) < estimate_bits(&uniform));
    }
}
