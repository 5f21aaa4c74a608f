//src/finalize.rs

use std::collections::BTreeMap;

use crate::accumulator::{KmerTable, StatsAccumulator};
use crate::alphabet::decode_kmer;
use crate::config::KMER_SIZE;
use crate::types::{KmerCount, NxStats, StatsResult};

/// Compute `(N_pct, L_pct)` from lengths already sorted in descending order.
///
/// The threshold is `ceil(total * pct / 100)`; the first entry at which the
/// running sum reaches it gives N (its length) and L (its 1-based position).
pub fn nx_from_sorted(sorted_desc: &[u64], total: u64, pct: u64) -> (u64, u64) {
    if sorted_desc.is_empty() {
        return (0, 0);
    }
    let threshold = ((total as u128 * pct as u128 + 99) / 100) as u64;
    let mut cumulative = 0u64;
    for (i, &len) in sorted_desc.iter().enumerate() {
        cumulative += len;
        if cumulative >= threshold {
            return (len, i as u64 + 1);
        }
    }
    // Only reachable if `total` exceeds the real sum
    (sorted_desc[sorted_desc.len() - 1], sorted_desc.len() as u64)
}

/// N50/N90/L50/L90 of `lengths`. Works on a sorted copy; `lengths` is untouched.
pub fn nx_stats(lengths: &[u64]) -> NxStats {
    let mut sorted = lengths.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let total: u64 = sorted.iter().sum();

    let (n50, l50) = nx_from_sorted(&sorted, total, 50);
    let (n90, l90) = nx_from_sorted(&sorted, total, 90);
    NxStats {
        count: sorted.len() as u64,
        n50,
        n90,
        l50,
        l90,
    }
}

/// Coarse, log-scaled histogram bin for a sequence length.
pub fn histogram_bin(len: u64) -> u64 {
    match len {
        0..=999 => len,
        1_000..=9_999 => len / 1_000 * 1_000,
        10_000..=99_999 => len / 10_000 * 10_000,
        100_000..=999_999 => len / 100_000 * 100_000,
        _ => len / 1_000_000 * 1_000_000,
    }
}

pub fn length_histogram(lengths: &[u64]) -> BTreeMap<u64, u64> {
    let mut hist = BTreeMap::new();
    for &len in lengths {
        *hist.entry(histogram_bin(len)).or_insert(0) += 1;
    }
    hist
}

/// The `limit` most frequent k-mers, ties broken by packed code ascending.
pub fn top_kmers(table: &KmerTable, k: usize, limit: usize) -> Vec<KmerCount> {
    let mut entries: Vec<(u64, u64)> = table.iter().map(|(&code, &count)| (code, count)).collect();
    entries.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    entries
        .into_iter()
        .take(limit)
        .map(|(code, count)| KmerCount {
            kmer: decode_kmer(code, k),
            count,
        })
        .collect()
}

#[inline]
fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl StatsAccumulator {
    /// Build the final statistics. Reads the accumulator only, so it can be
    /// called again with identical output.
    pub fn finalize(&self, top_k: usize) -> StatsResult {
        let n = self.sequence_count;
        let total = self.total_length;

        let mut base_frequencies = [0.0; 5];
        for (freq, &count) in base_frequencies.iter_mut().zip(&self.base_counts) {
            *freq = ratio(count, total);
        }
        let [_, c, g, _, _] = self.base_counts;
        let [_, uc, ug, _] = self.ungapped_base_counts;

        StatsResult {
            sequence_count: n,
            total_length: total,
            ungapped_length: self.ungapped_length,
            ambiguous_base_count: self.ambiguous_base_count,
            gap_count: self.gap_count,
            min_length: if n == 0 { 0 } else { self.min_length },
            max_length: self.max_length,
            avg_length: ratio(total, n),
            base_counts: self.base_counts,
            ungapped_base_counts: self.ungapped_base_counts,
            base_frequencies,
            gc_content: ratio(g + c, total),
            gc_content_ungapped: ratio(ug + uc, self.ungapped_length),
            ambiguous_fraction: ratio(self.ambiguous_base_count, total),
            scaffold: nx_stats(&self.scaffold_lengths),
            contig: nx_stats(&self.contig_lengths),
            duplicate_sequence_count: self.duplicate_count,
            duplicate_fraction: ratio(self.duplicate_count, n),
            avg_shannon_entropy: if n == 0 { 0.0 } else { self.entropy_sum / n as f64 },
            length_histogram: length_histogram(&self.scaffold_lengths),
            kmers_counted: self.kmers_counted,
            top_kmers: top_kmers(&self.kmer_table, KMER_SIZE, top_k),
        }
    }
}
