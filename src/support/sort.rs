//! Indirect-sort helper shared by BRT's `sortedMap` construction and ANS's
//! alphabet ordering (spec §4.6) — decreasing frequency, ties broken by
//! ascending symbol value. Not a novel algorithm; kept as a named seam so
//! BRT and ANS don't each re-derive the tie-break rule independently.

/// Returns the symbols `0..hist.len()` ordered by decreasing frequency,
/// ties broken by ascending symbol value.
pub fn rank_by_frequency(hist: &[u32]) -> Vec<usize> {
    let mut symbols: Vec<usize> = (0..hist.len()).collect();
    symbols.sort_unstable_by(|&a, &b| hist[b].cmp(&hist[a]).then(a.cmp(&b)));
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_decreasing_frequency() {
        let hist = [5u32, 1, 5, 0, 3];
        let ranked = rank_by_frequency(&hist);
        assert_eq!(ranked, vec![0, 2, 4, 1, 3]);
    }

    #[test]
    fn empty_histogram_yields_empty_ranking() {
        assert!(rank_by_frequency(&[]).is_empty());
    }

    #[test]
    fn uniform_histogram_keeps_symbol_order() {
        let hist = [2u32, 2, 2, 2];
        assert_eq!(rank_by_frequency(&hist), vec![0, 1, 2, 3]);
    }
}
