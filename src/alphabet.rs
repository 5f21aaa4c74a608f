//src/alphabet.rs

//! Residue classification tables and 2-bit k-mer helpers.
//!
//! Both tables are built at compile time and indexed by raw byte value, so
//! classifying a residue is a single array load.

/// Composition bucket for anything that is not A/C/G/T.
pub const BUCKET_OTHER: u8 = 4;

/// Byte -> composition bucket (0..=3 for A/C/G/T in either case, 4 otherwise).
pub static BUCKET_TABLE: [u8; 256] = build_bucket_table();

/// Byte -> 2-bit base code, or -1 for ambiguous/invalid symbols.
pub static CODE_TABLE: [i8; 256] = build_code_table();

const fn build_bucket_table() -> [u8; 256] {
    let mut table = [BUCKET_OTHER; 256];
    table[b'A' as usize] = 0;
    table[b'a' as usize] = 0;
    table[b'C' as usize] = 1;
    table[b'c' as usize] = 1;
    table[b'G' as usize] = 2;
    table[b'g' as usize] = 2;
    table[b'T' as usize] = 3;
    table[b't' as usize] = 3;
    table
}

const fn build_code_table() -> [i8; 256] {
    let mut table = [-1i8; 256];
    table[b'A' as usize] = 0;
    table[b'a' as usize] = 0;
    table[b'C' as usize] = 1;
    table[b'c' as usize] = 1;
    table[b'G' as usize] = 2;
    table[b'g' as usize] = 2;
    table[b'T' as usize] = 3;
    table[b't' as usize] = 3;
    table
}

/// Look up the composition bucket and, for A/C/G/T, the 2-bit code of `b`.
#[inline]
pub fn classify(b: u8) -> (u8, Option<u8>) {
    let code = CODE_TABLE[b as usize];
    let code = if code < 0 { None } else { Some(code as u8) };
    (BUCKET_TABLE[b as usize], code)
}

/// Mask covering the low `2 * k` bits.
#[inline]
pub fn kmer_mask(k: usize) -> u64 {
    if k >= 32 {
        u64::MAX
    } else {
        (1u64 << (2 * k)) - 1
    }
}

/// Encode `seq` into a 2-bit representation. Returns `None` on any non-ACGT byte.
pub fn encode_kmer(seq: &[u8]) -> Option<u64> {
    let mut val = 0u64;
    for &b in seq {
        let code = CODE_TABLE[b as usize];
        if code < 0 {
            return None;
        }
        val = (val << 2) | code as u64;
    }
    Some(val)
}

/// Decode a packed k-mer back into its letters, most significant base first.
pub fn decode_kmer(code: u64, k: usize) -> String {
    const LETTERS: [char; 4] = ['A', 'C', 'G', 'T'];
    (0..k)
        .rev()
        .map(|i| LETTERS[((code >> (2 * i)) & 3) as usize])
        .collect()
}

/// Reverse complement of a packed k-mer of `k` bases.
pub fn reverse_complement(mut kmer: u64, k: usize) -> u64 {
    // Reverse the order of the 2-bit groups, then complement (A<->T, C<->G is !x on 2 bits).
    kmer = ((kmer >> 2) & 0x3333333333333333) | ((kmer & 0x3333333333333333) << 2);
    kmer = ((kmer >> 4) & 0x0F0F0F0F0F0F0F0F) | ((kmer & 0x0F0F0F0F0F0F0F0F) << 4);
    kmer = ((kmer >> 8) & 0x00FF00FF00FF00FF) | ((kmer & 0x00FF00FF00FF00FF) << 8);
    kmer = ((kmer >> 16) & 0x0000FFFF0000FFFF) | ((kmer & 0x0000FFFF0000FFFF) << 16);
    kmer = (kmer >> 32) | (kmer << 32);
    (!kmer) >> (64 - 2 * k)
}

/// Lexicographically smaller of `kmer` and its reverse complement.
#[inline]
pub fn canonical_kmer(kmer: u64, k: usize) -> u64 {
    kmer.min(reverse_complement(kmer, k))
}

/// Shannon entropy (bits) of a base-count vector. Zero when nothing was counted.
pub fn shannon_entropy(counts: &[u64; 4]) -> f64 {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let c = c as f64;
            (c / total) * (total / c).log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify(b'A'), (0, Some(0)));
        assert_eq!(classify(b'c'), (1, Some(1)));
        assert_eq!(classify(b'G'), (2, Some(2)));
        assert_eq!(classify(b't'), (3, Some(3)));
        assert_eq!(classify(b'N'), (BUCKET_OTHER, None));
        assert_eq!(classify(b'-'), (BUCKET_OTHER, None));
        assert_eq!(classify(b'R'), (BUCKET_OTHER, None));
    }

    #[test]
    fn test_encode_decode() {
        let code = encode_kmer(b"ACGTT").unwrap();
        assert_eq!(code, 0b00_01_10_11_11);
        assert_eq!(decode_kmer(code, 5), "ACGTT");
        assert_eq!(decode_kmer(0, 5), "AAAAA");
        assert_eq!(decode_kmer(kmer_mask(5), 5), "TTTTT");
        assert!(encode_kmer(b"ACNGT").is_none());
    }

    #[test]
    fn test_reverse_complement_and_canonical() {
        let fwd = encode_kmer(b"AACGT").unwrap();
        let rc = reverse_complement(fwd, 5);
        assert_eq!(decode_kmer(rc, 5), "ACGTT");
        assert_eq!(reverse_complement(rc, 5), fwd);
        assert_eq!(decode_kmer(canonical_kmer(rc, 5), 5), "AACGT");

        let tttt = encode_kmer(b"TTTTT").unwrap();
        assert_eq!(decode_kmer(canonical_kmer(tttt, 5), 5), "AAAAA");
    }

    #[test]
    fn test_shannon_entropy() {
        assert_eq!(shannon_entropy(&[0, 0, 0, 0]), 0.0);
        assert_eq!(shannon_entropy(&[7, 0, 0, 0]), 0.0);
        assert!((shannon_entropy(&[1, 1, 1, 1]) - 2.0).abs() < 1e-12);
        assert!((shannon_entropy(&[2, 2, 0, 0]) - 1.0).abs() < 1e-12);
    }
}
