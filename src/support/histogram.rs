//! Order-0 and order-1 byte-frequency counting (spec §4.6), used by ANS
//! normalization, FSD stride selection, and the text/UTF detectors.

/// Order-0 (256-entry) byte histogram.
pub fn histogram0(data: &[u8]) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &b in data {
        hist[b as usize] += 1;
    }
    hist
}

/// Order-1 (256x256) byte-pair histogram, boxed to keep it off the stack.
pub fn histogram1(data: &[u8]) -> Box<[[u32; 256]; 256]> {
    let mut hist = Box::new([[0u32; 256]; 256]);
    let mut prev = 0u8;
    for &b in data {
        hist[prev as usize][b as usize] += 1;
        prev = b;
    }
    hist
}

/// Number of distinct symbols with a non-zero count.
pub fn alphabet_size(hist: &[u32; 256]) -> usize {
    hist.iter().filter(|&&c| c > 0).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_order0_frequencies() {
        let hist = histogram0(b"aabbbc");
        assert_eq!(hist[b'a' as usize], 2);
        assert_eq!(hist[b'b' as usize], 3);
        assert_eq!(hist[b'c' as usize], 1);
        assert_eq!(alphabet_size(&hist), 3);
    }

    #[test]
    fn counts_order1_pairs() {
        let hist = histogram1(b"abab");
        assert_eq!(hist[b'a' as usize][b'b' as usize], 2);
        assert_eq!(hist[b'b' as usize][b'a' as usize], 1);
    }

    #[test]
    fn empty_input_has_empty_alphabet() {
        let hist = histogram0(&[]);
        assert_eq!(alphabet_size(&hist), 0);
    }
}
