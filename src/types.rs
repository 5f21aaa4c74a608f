//src/types.rs

use std::collections::BTreeMap;

/// A minimal representation of one FASTA/FASTQ record.
/// Residues are kept as raw bytes; any byte value is a valid symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub id: String,
    pub seq: Vec<u8>,
}

impl SequenceRecord {
    pub fn new(id: impl Into<String>, seq: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            seq: seq.into(),
        }
    }
}

/// Composition buckets, in the order used by every count array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Base {
    A,
    C,
    G,
    T,
    N,
}

impl Base {
    pub const ALL: [Base; 5] = [Base::A, Base::C, Base::G, Base::T, Base::N];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn symbol(self) -> char {
        match self {
            Base::A => 'A',
            Base::C => 'C',
            Base::G => 'G',
            Base::T => 'T',
            Base::N => 'N',
        }
    }
}

/// N50/N90 and L50/L90 of one length sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NxStats {
    /// Number of entries in the length sequence
    pub count: u64,
    pub n50: u64,
    pub n90: u64,
    pub l50: u64,
    pub l90: u64,
}

/// One entry of the top k-mer table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmerCount {
    pub kmer: String,
    pub count: u64,
}

/// Final, immutable statistics for one input.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsResult {
    pub sequence_count: u64,
    /// All residues, gaps included
    pub total_length: u64,
    /// Residues inside contigs (A/C/G/T only)
    pub ungapped_length: u64,
    pub ambiguous_base_count: u64,
    /// Number of maximal runs of ambiguous symbols
    pub gap_count: u64,
    pub min_length: u64,
    pub max_length: u64,
    pub avg_length: f64,

    /// Indexed by `Base::index()`
    pub base_counts: [u64; 5],
    /// A, C, G, T inside contigs
    pub ungapped_base_counts: [u64; 4],
    pub base_frequencies: [f64; 5],
    pub gc_content: f64,
    pub gc_content_ungapped: f64,
    pub ambiguous_fraction: f64,

    pub scaffold: NxStats,
    pub contig: NxStats,

    pub duplicate_sequence_count: u64,
    pub duplicate_fraction: f64,
    pub avg_shannon_entropy: f64,

    /// Histogram bin (lower bound) -> number of sequences
    pub length_histogram: BTreeMap<u64, u64>,
    /// K-mer occurrences actually counted under the sampling budget
    pub kmers_counted: u64,
    pub top_kmers: Vec<KmerCount>,
}

impl StatsResult {
    /// The result for an input that yielded no records at all.
    pub fn empty() -> Self {
        Self {
            sequence_count: 0,
            total_length: 0,
            ungapped_length: 0,
            ambiguous_base_count: 0,
            gap_count: 0,
            min_length: 0,
            max_length: 0,
            avg_length: 0.0,
            base_counts: [0; 5],
            ungapped_base_counts: [0; 4],
            base_frequencies: [0.0; 5],
            gc_content: 0.0,
            gc_content_ungapped: 0.0,
            ambiguous_fraction: 0.0,
            scaffold: NxStats::default(),
            contig: NxStats::default(),
            duplicate_sequence_count: 0,
            duplicate_fraction: 0.0,
            avg_shannon_entropy: 0.0,
            length_histogram: BTreeMap::new(),
            kmers_counted: 0,
            top_kmers: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sequence_count == 0
    }

    pub fn base_frequency(&self, base: Base) -> f64 {
        self.base_frequencies[base.index()]
    }

    pub fn base_count(&self, base: Base) -> u64 {
        self.base_counts[base.index()]
    }
}
