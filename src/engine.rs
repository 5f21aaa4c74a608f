//src/engine.rs

use rayon::prelude::*;

use crate::accumulator::StatsAccumulator;
use crate::config::StatsConfig;
use crate::error::SeqQcError;
use crate::fastx::RecordSource;
use crate::types::{SequenceRecord, StatsResult};

/// How often (in records) consumption progress is logged.
const PROGRESS_EVERY: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Consuming,
    Finalizing,
    Done,
}

/// Drives one statistics run over one record source.
///
/// `Idle -> Consuming -> Finalizing -> Done`, never backwards. `run` and
/// `run_sharded` take the engine by value, so an engine is used exactly once.
pub struct StatsEngine {
    config: StatsConfig,
    state: EngineState,
    accumulator: StatsAccumulator,
}

impl StatsEngine {
    pub fn new(config: StatsConfig) -> Self {
        let accumulator = StatsAccumulator::new(&config);
        Self {
            config,
            state: EngineState::Idle,
            accumulator,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    fn transition(&mut self, next: EngineState) {
        log::debug!("engine: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Pull every record from `source`, one at a time, then finalize.
    /// Any source error aborts the run without a result.
    pub fn run<S: RecordSource + ?Sized>(mut self, source: &mut S) -> Result<StatsResult, SeqQcError> {
        self.consume(source)?;
        Ok(self.finish())
    }

    fn consume<S: RecordSource + ?Sized>(&mut self, source: &mut S) -> Result<(), SeqQcError> {
        self.transition(EngineState::Consuming);
        while source.has_next() {
            let record = source.next_record()?;
            self.accumulator.add_record(&record.seq);

            let n = self.accumulator.sequence_count();
            if n % PROGRESS_EVERY == 0 {
                log::debug!("{} records, {} bases", n, self.accumulator.total_length());
            }
        }
        Ok(())
    }

    /// Same as `run`, but records are scanned in parallel shards of
    /// `config.shard_records` consecutive records.
    ///
    /// Every shard samples k-mers under its own full `kmer_budget`, so the
    /// k-mer table can differ from `run`; all other fields are the same. The
    /// outcome depends on the shard size, not on the number of threads.
    pub fn run_sharded<S: RecordSource + ?Sized>(
        mut self,
        source: &mut S,
    ) -> Result<StatsResult, SeqQcError> {
        self.consume_sharded(source)?;
        Ok(self.finish())
    }

    fn consume_sharded<S: RecordSource + ?Sized>(&mut self, source: &mut S) -> Result<(), SeqQcError> {
        self.transition(EngineState::Consuming);

        let shard_records = self.config.shard_records.max(1);
        // A whole number of shards per batch keeps shard boundaries fixed
        let batch_records = shard_records * rayon::current_num_threads().max(1);
        let mut batch: Vec<SequenceRecord> = Vec::with_capacity(batch_records);

        loop {
            batch.clear();
            while batch.len() < batch_records && source.has_next() {
                batch.push(source.next_record()?);
            }
            if batch.is_empty() {
                break;
            }

            let config = &self.config;
            let shards: Vec<StatsAccumulator> = batch
                .par_chunks(shard_records)
                .map(|chunk| {
                    let mut shard = StatsAccumulator::new(config);
                    for record in chunk {
                        shard.add_record(&record.seq);
                    }
                    shard
                })
                .collect();

            log::debug!("merging {} shard(s) of up to {} records", shards.len(), shard_records);
            let mut total = std::mem::replace(&mut self.accumulator, StatsAccumulator::new(config));
            for shard in shards {
                total = total.merge(shard);
            }
            self.accumulator = total;
        }
        Ok(())
    }

    fn finish(&mut self) -> StatsResult {
        if self.accumulator.sequence_count() == 0 {
            log::warn!("No records consumed; skipping finalization");
            self.transition(EngineState::Done);
            return StatsResult::empty();
        }

        self.transition(EngineState::Finalizing);
        let result = self.accumulator.finalize(self.config.top_kmers);
        log::info!(
            "Finalized {} sequences ({} bases, {} k-mers sampled)",
            result.sequence_count,
            result.total_length,
            result.kmers_counted
        );
        self.transition(EngineState::Done);
        result
    }
}

/// Compute statistics for every record in `source`, sequentially.
pub fn compute_stats<S: RecordSource + ?Sized>(
    source: &mut S,
    config: &StatsConfig,
) -> Result<StatsResult, SeqQcError> {
    StatsEngine::new(config.clone()).run(source)
}

/// Compute statistics with parallel shards on the current rayon pool.
pub fn compute_stats_sharded<S: RecordSource + ?Sized>(
    source: &mut S,
    config: &StatsConfig,
) -> Result<StatsResult, SeqQcError> {
    StatsEngine::new(config.clone()).run_sharded(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fastx::{FastaReader, FastqReader};
    use crate::types::Base;
    use std::io::Cursor;

    fn fasta_stats(data: &str, config: &StatsConfig) -> StatsResult {
        let mut reader = FastaReader::new(Cursor::new(data.to_string()));
        compute_stats(&mut reader, config).expect("stats")
    }

    #[test]
    fn test_two_identical_records() {
        let r = fasta_stats(">s1\nACGT\n>s2\nACGT\n", &StatsConfig::default());
        assert_eq!(r.sequence_count, 2);
        assert_eq!(r.duplicate_sequence_count, 1);
        assert_eq!(r.duplicate_fraction, 0.5);
        assert_eq!(r.gc_content, 0.5);
        assert_eq!(r.min_length, 4);
        assert_eq!(r.max_length, 4);
        assert_eq!(r.avg_length, 4.0);
        assert!((r.avg_shannon_entropy - 2.0).abs() < 1e-12);
        // two 4-mers but k = 5: nothing to sample
        assert!(r.top_kmers.is_empty());
    }

    #[test]
    fn test_all_ambiguous_record() {
        let r = fasta_stats(">s1\nNNNN\n", &StatsConfig::default());
        assert_eq!(r.ambiguous_base_count, 4);
        assert_eq!(r.gap_count, 1);
        assert_eq!(r.contig.n50, 0);
        assert_eq!(r.contig.count, 0);
        assert_eq!(r.avg_shannon_entropy, 0.0);
        assert_eq!(r.ambiguous_fraction, 1.0);
        assert_eq!(r.gc_content_ungapped, 0.0);
        assert_eq!(r.scaffold.n50, 4);
    }

    #[test]
    fn test_non_utf8_residues_are_counted() {
        let data = &b">s1 caf\xe9\nAC\xe9GT\n>s2\nACGT\n"[..];
        let mut reader = FastaReader::new(Cursor::new(data));
        let r = compute_stats(&mut reader, &StatsConfig::default()).unwrap();
        assert_eq!(r.sequence_count, 2);
        assert_eq!(r.total_length, 9);
        // 0xE9 lands in the N/other bucket and splits the first record
        assert_eq!(r.base_count(Base::N), 1);
        assert_eq!(r.gap_count, 1);
        assert_eq!(r.contig.count, 3);
    }

    #[test]
    fn test_empty_input() {
        let r = fasta_stats("", &StatsConfig::default());
        assert!(r.is_empty());
        assert_eq!(r, StatsResult::empty());
        assert_eq!(r.gc_content, 0.0);
        assert_eq!(r.avg_length, 0.0);
        assert_eq!(r.duplicate_fraction, 0.0);
    }

    #[test]
    fn test_zero_kmer_budget() {
        let config = StatsConfig::default().with_kmer_budget(0);
        let r = fasta_stats(">a\nACGTACGTACGTACGT\n>b\nGGGGGGGGGGGG\n", &config);
        assert!(r.top_kmers.is_empty());
        assert_eq!(r.kmers_counted, 0);
    }

    #[test]
    fn test_composition_and_gc() {
        let r = fasta_stats(">a\nGGCCNNAT\n>b\nacgt\n", &StatsConfig::default());
        assert_eq!(r.total_length, 12);
        assert_eq!(r.base_counts.iter().sum::<u64>(), r.total_length);
        assert_eq!(r.base_count(Base::G), 3);
        assert_eq!(r.base_count(Base::N), 2);
        assert!((r.gc_content - 6.0 / 12.0).abs() < 1e-12);
        assert_eq!(r.ungapped_length, 10);
        assert!((r.gc_content_ungapped - 0.6).abs() < 1e-12);
        assert!((r.base_frequency(Base::N) - 2.0 / 12.0).abs() < 1e-12);
        // contigs: GGCC, AT, acgt
        assert_eq!(r.contig.count, 3);
        // sorted 4, 4, 2 with threshold 5: crossed by the second entry
        assert_eq!((r.contig.n50, r.contig.l50), (4, 2));
        assert_eq!((r.scaffold.n50, r.scaffold.l50), (8, 1));
    }

    #[test]
    fn test_top_kmers_counted() {
        let r = fasta_stats(">a\nAAAAAAA\n>b\nAAAAACCCCC\n", &StatsConfig::default());
        assert_eq!(r.kmers_counted, 3 + 6);
        assert_eq!(r.top_kmers[0].kmer, "AAAAA");
        assert_eq!(r.top_kmers[0].count, 4);
        assert_eq!(r.top_kmers.len(), 6);
    }

    #[test]
    fn test_deterministic() {
        let data = ">a\nACGTNNACGTTT\n>b\nGGGATTACA\n>c\nACGTNNACGTTT\n>d\n\n";
        let config = StatsConfig::default();
        assert_eq!(fasta_stats(data, &config), fasta_stats(data, &config));
    }

    #[test]
    fn test_fastq_source() {
        let data = "@r1\nACGTACGT\n+\nIIIIIIII\n@r2\nNNACG\n+\n!!!!!\n";
        let mut reader = FastqReader::new(Cursor::new(data));
        let r = compute_stats(&mut reader, &StatsConfig::default()).unwrap();
        assert_eq!(r.sequence_count, 2);
        assert_eq!(r.total_length, 13);
        assert_eq!(r.ambiguous_base_count, 2);
    }

    #[test]
    fn test_malformed_input_aborts() {
        let data = "@r1\nACGT\n+\nIIII\n@r2\n";
        let mut reader = FastqReader::new(Cursor::new(data));
        let err = compute_stats(&mut reader, &StatsConfig::default()).unwrap_err();
        assert!(matches!(err, SeqQcError::MalformedInput { .. }));
    }

    #[test]
    fn test_state_transitions() {
        let mut engine = StatsEngine::new(StatsConfig::default());
        assert_eq!(engine.state(), EngineState::Idle);
        let mut reader = FastaReader::new(Cursor::new(">a\nACGT\n"));
        engine.consume(&mut reader).unwrap();
        assert_eq!(engine.state(), EngineState::Consuming);
        let result = engine.finish();
        assert_eq!(engine.state(), EngineState::Done);
        assert_eq!(result.sequence_count, 1);
    }

    #[test]
    fn test_sharded_matches_sequential() {
        let mut data = String::new();
        for i in 0..57 {
            data.push_str(&format!(">r{i}\n"));
            let body = match i % 4 {
                0 => "ACGTACGTNNNNGGCCA",
                1 => "acgtacgtnnnnggcca",
                2 => "TTTTTTTTTTT",
                _ => "GATTACAGATTACA",
            };
            data.push_str(&body[..(i % body.len()) + 1]);
            data.push('\n');
        }

        // budget large enough to never bind, so k-mers agree too
        let config = StatsConfig::default().with_shard_records(5);
        let sequential = fasta_stats(&data, &config);
        let mut reader = FastaReader::new(Cursor::new(data.clone()));
        let mut sharded = compute_stats_sharded(&mut reader, &config).unwrap();

        assert!((sharded.avg_shannon_entropy - sequential.avg_shannon_entropy).abs() < 1e-9);
        sharded.avg_shannon_entropy = sequential.avg_shannon_entropy;
        assert_eq!(sharded, sequential);
    }

    #[test]
    fn test_sharded_budget_is_per_shard() {
        let data = ">a\nAAAAAAAAAA\n>b\nAAAAAAAAAA\n>c\nAAAAAAAAAA\n";
        let config = StatsConfig::default().with_kmer_budget(4).with_shard_records(1);
        let mut reader = FastaReader::new(Cursor::new(data));
        let sharded = compute_stats_sharded(&mut reader, &config).unwrap();
        assert_eq!(sharded.kmers_counted, 12);

        let sequential = fasta_stats(data, &config);
        assert_eq!(sequential.kmers_counted, 4);
        assert_eq!(sharded.duplicate_sequence_count, 2);
        assert_eq!(sequential.duplicate_sequence_count, 2);
    }

    #[test]
    fn test_sharded_empty_input() {
        let mut reader = FastaReader::new(Cursor::new(""));
        let r = compute_stats_sharded(&mut reader, &StatsConfig::default()).unwrap();
        assert!(r.is_empty());
    }
}
