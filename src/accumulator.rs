//src/accumulator.rs

use ahash::{AHashMap, AHashSet};

use crate::alphabet::{canonical_kmer, classify, kmer_mask, shannon_entropy};
use crate::config::{StatsConfig, KMER_SIZE};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A k-mer code -> occurrence count table.
pub type KmerTable = AHashMap<u64, u64>;

/// Number of distinct packed k-mer codes for `KMER_SIZE`.
pub const KMER_SPACE: usize = 1 << (2 * KMER_SIZE);

/// Everything one record contributes, computed in a single pass over its
/// residues before anything is committed to the running totals.
///
/// Memory is fixed: k-mers are tallied into a code-indexed array, so a
/// multi-megabase record costs no more than a short read.
#[derive(Debug, Clone)]
pub struct RecordScan {
    pub length: u64,
    pub base_counts: [u64; 5],
    /// A/C/G/T inside contigs; doubles as the entropy tally
    pub ungapped_counts: [u64; 4],
    pub contig_lengths: Vec<u64>,
    pub ambiguous: u64,
    pub gap_runs: u64,
    /// FNV-1a over the upper-cased residues
    pub fingerprint: u64,
    pub entropy: f64,
    /// Per-code k-mer counts for this record, capped by the budget left over
    pub kmer_counts: [u64; KMER_SPACE],
    pub kmers_in_record: u64,
}

impl Default for RecordScan {
    fn default() -> Self {
        Self {
            length: 0,
            base_counts: [0; 5],
            ungapped_counts: [0; 4],
            contig_lengths: Vec::new(),
            ambiguous: 0,
            gap_runs: 0,
            fingerprint: FNV_OFFSET_BASIS,
            entropy: 0.0,
            kmer_counts: [0; KMER_SPACE],
            kmers_in_record: 0,
        }
    }
}

impl RecordScan {
    fn reset(&mut self) {
        self.length = 0;
        self.base_counts = [0; 5];
        self.ungapped_counts = [0; 4];
        self.contig_lengths.clear();
        self.ambiguous = 0;
        self.gap_runs = 0;
        self.fingerprint = FNV_OFFSET_BASIS;
        self.entropy = 0.0;
        if self.kmers_in_record > 0 {
            self.kmer_counts = [0; KMER_SPACE];
            self.kmers_in_record = 0;
        }
    }

    /// Nonzero `(code, count)` pairs of this record's k-mers.
    pub fn kmers(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.kmer_counts
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n > 0)
            .map(|(code, &n)| (code as u64, n))
    }

    /// Scan `seq` once, left to right. At most `kmer_allowance` k-mers are kept.
    pub fn scan(&mut self, seq: &[u8], kmer_allowance: u64, canonical: bool) {
        self.reset();

        let k = KMER_SIZE;
        let mask = kmer_mask(k);
        let mut hash = FNV_OFFSET_BASIS;
        let mut contig = 0u64;
        let mut window = 0u64;
        let mut run = 0usize;
        let mut prev_ambiguous = false;

        for &b in seq {
            let (bucket, code) = classify(b);
            self.base_counts[bucket as usize] += 1;

            hash ^= b.to_ascii_uppercase() as u64;
            hash = hash.wrapping_mul(FNV_PRIME);

            match code {
                Some(code) => {
                    contig += 1;
                    self.ungapped_counts[code as usize] += 1;

                    window = ((window << 2) | code as u64) & mask;
                    run += 1;
                    if run >= k && self.kmers_in_record < kmer_allowance {
                        let kmer = if canonical { canonical_kmer(window, k) } else { window };
                        self.kmer_counts[kmer as usize] += 1;
                        self.kmers_in_record += 1;
                    }
                    prev_ambiguous = false;
                }
                None => {
                    if contig > 0 {
                        self.contig_lengths.push(contig);
                        contig = 0;
                    }
                    self.ambiguous += 1;
                    if !prev_ambiguous {
                        self.gap_runs += 1;
                    }
                    prev_ambiguous = true;

                    // A k-mer never spans a gap
                    window = 0;
                    run = 0;
                }
            }
        }

        if contig > 0 {
            self.contig_lengths.push(contig);
        }
        self.length = seq.len() as u64;
        self.fingerprint = hash;
        self.entropy = shannon_entropy(&self.ungapped_counts);
    }
}

/// Running totals over every record seen so far.
///
/// Duplicate detection keeps only a 64-bit fingerprint per distinct sequence:
/// two different sequences with the same fingerprint count as duplicates. This
/// is an approximation that keeps memory independent of total sequence bytes.
#[derive(Debug, Clone)]
pub struct StatsAccumulator {
    kmer_budget: u64,
    canonical_kmers: bool,

    pub(crate) sequence_count: u64,
    pub(crate) total_length: u64,
    pub(crate) ungapped_length: u64,
    pub(crate) ambiguous_base_count: u64,
    pub(crate) gap_count: u64,
    pub(crate) min_length: u64,
    pub(crate) max_length: u64,

    pub(crate) base_counts: [u64; 5],
    pub(crate) ungapped_base_counts: [u64; 4],

    pub(crate) scaffold_lengths: Vec<u64>,
    pub(crate) contig_lengths: Vec<u64>,

    pub(crate) seen: AHashSet<u64>,
    pub(crate) duplicate_count: u64,
    pub(crate) entropy_sum: f64,

    pub(crate) kmer_table: KmerTable,
    pub(crate) kmers_counted: u64,

    scratch: Option<Box<RecordScan>>,
}

impl StatsAccumulator {
    pub fn new(config: &StatsConfig) -> Self {
        Self {
            kmer_budget: config.kmer_budget,
            canonical_kmers: config.canonical_kmers,
            sequence_count: 0,
            total_length: 0,
            ungapped_length: 0,
            ambiguous_base_count: 0,
            gap_count: 0,
            min_length: u64::MAX,
            max_length: 0,
            base_counts: [0; 5],
            ungapped_base_counts: [0; 4],
            scaffold_lengths: Vec::new(),
            contig_lengths: Vec::new(),
            seen: AHashSet::new(),
            duplicate_count: 0,
            entropy_sum: 0.0,
            kmer_table: KmerTable::new(),
            kmers_counted: 0,
            scratch: None,
        }
    }

    pub fn sequence_count(&self) -> u64 {
        self.sequence_count
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn kmers_counted(&self) -> u64 {
        self.kmers_counted
    }

    pub fn scaffold_lengths(&self) -> &[u64] {
        &self.scaffold_lengths
    }

    pub fn contig_lengths(&self) -> &[u64] {
        &self.contig_lengths
    }

    pub fn kmer_budget_left(&self) -> u64 {
        self.kmer_budget.saturating_sub(self.kmers_counted)
    }

    /// Scan one record's residues and fold them into the totals.
    pub fn add_record(&mut self, seq: &[u8]) {
        let mut scan = self.scratch.take().unwrap_or_default();
        scan.scan(seq, self.kmer_budget_left(), self.canonical_kmers);
        self.commit(&scan);
        self.scratch = Some(scan);
    }

    /// Apply a finished scan. Nothing from a record is visible before this.
    pub fn commit(&mut self, scan: &RecordScan) {
        self.sequence_count += 1;
        self.total_length += scan.length;
        self.min_length = self.min_length.min(scan.length);
        self.max_length = self.max_length.max(scan.length);

        for (total, n) in self.base_counts.iter_mut().zip(scan.base_counts) {
            *total += n;
        }
        for (total, n) in self.ungapped_base_counts.iter_mut().zip(scan.ungapped_counts) {
            *total += n;
        }

        self.ungapped_length += scan.contig_lengths.iter().sum::<u64>();
        self.contig_lengths.extend_from_slice(&scan.contig_lengths);
        self.scaffold_lengths.push(scan.length);

        self.ambiguous_base_count += scan.ambiguous;
        self.gap_count += scan.gap_runs;

        if !self.seen.insert(scan.fingerprint) {
            self.duplicate_count += 1;
        }
        self.entropy_sum += scan.entropy;

        if scan.kmers_in_record > 0 {
            for (kmer, n) in scan.kmers() {
                *self.kmer_table.entry(kmer).or_insert(0) += n;
            }
            self.kmers_counted += scan.kmers_in_record;
        }
    }

    /// Fold `other` into `self`. Sums, min/max and set union, so the result
    /// does not depend on how records were split, except for k-mer sampling:
    /// each side filled its table under its own budget.
    pub fn merge(mut self, other: StatsAccumulator) -> StatsAccumulator {
        self.sequence_count += other.sequence_count;
        self.total_length += other.total_length;
        self.ungapped_length += other.ungapped_length;
        self.ambiguous_base_count += other.ambiguous_base_count;
        self.gap_count += other.gap_count;
        self.min_length = self.min_length.min(other.min_length);
        self.max_length = self.max_length.max(other.max_length);

        for (total, n) in self.base_counts.iter_mut().zip(other.base_counts) {
            *total += n;
        }
        for (total, n) in self.ungapped_base_counts.iter_mut().zip(other.ungapped_base_counts) {
            *total += n;
        }

        self.scaffold_lengths.extend(other.scaffold_lengths);
        self.contig_lengths.extend(other.contig_lengths);

        // Sequences first seen on the other side but already known here are repeats
        self.duplicate_count += other.duplicate_count;
        self.seen.reserve(other.seen.len());
        for fingerprint in other.seen {
            if !self.seen.insert(fingerprint) {
                self.duplicate_count += 1;
            }
        }
        self.entropy_sum += other.entropy_sum;

        for (kmer, count) in other.kmer_table {
            *self.kmer_table.entry(kmer).or_insert(0) += count;
        }
        self.kmers_counted += other.kmers_counted;

        self
    }
}
