//src/config.rs

/// Length of the sampled k-mers.
pub const KMER_SIZE: usize = 5;

/// Default number of k-mer occurrences counted before sampling stops.
pub const DEFAULT_KMER_BUDGET: u64 = 100_000;

/// Default size of the reported top k-mer table.
pub const DEFAULT_TOP_KMERS: usize = 100;

/// Default number of consecutive records per shard in the sharded path.
pub const DEFAULT_SHARD_RECORDS: usize = 10_000;

/// Knobs for one statistics run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsConfig {
    /// Total k-mer occurrences to count. In the sharded path every shard gets
    /// this budget on its own.
    pub kmer_budget: u64,
    /// How many of the most frequent k-mers end up in the result
    pub top_kmers: usize,
    /// Count each k-mer as the smaller of itself and its reverse complement
    pub canonical_kmers: bool,
    pub shard_records: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            kmer_budget: DEFAULT_KMER_BUDGET,
            top_kmers: DEFAULT_TOP_KMERS,
            canonical_kmers: false,
            shard_records: DEFAULT_SHARD_RECORDS,
        }
    }
}

impl StatsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kmer_budget(mut self, kmer_budget: u64) -> Self {
        self.kmer_budget = kmer_budget;
        self
    }

    pub fn with_top_kmers(mut self, top_kmers: usize) -> Self {
        self.top_kmers = top_kmers;
        self
    }

    pub fn with_canonical_kmers(mut self, canonical_kmers: bool) -> Self {
        self.canonical_kmers = canonical_kmers;
        self
    }

    /// Zero is bumped to one so a shard always makes progress.
    pub fn with_shard_records(mut self, shard_records: usize) -> Self {
        self.shard_records = shard_records.max(1);
        self
    }
}
