// src/lib.rs
pub mod types;
pub mod error;
pub mod config;
pub mod alphabet;
pub mod fastx;
pub mod accumulator;
pub mod finalize;
pub mod engine;
pub mod report;

use std::path::Path;

pub use crate::config::StatsConfig;
pub use crate::engine::{compute_stats, compute_stats_sharded, EngineState, StatsEngine};
pub use crate::error::SeqQcError;
pub use crate::fastx::{open_record_source, RecordSource};
pub use crate::report::{render_json, render_summary};
pub use crate::types::{Base, KmerCount, NxStats, SequenceRecord, StatsResult};

/// Unified entry point: open `path` (format from its extension), stream every
/// record through the statistics engine and return the final result.
///
/// With `sharded` set the records are scanned in parallel shards on the
/// current rayon pool (see `StatsEngine::run_sharded`).
pub fn stats_for_path<P: AsRef<Path>>(
    path: P,
    config: &StatsConfig,
    sharded: bool,
) -> Result<StatsResult, SeqQcError> {
    // 1. Detect the format and open the source (fails before reading anything)
    let mut source = open_record_source(path)?;

    // 2. Stream records through the engine; the source is closed on drop
    if sharded {
        compute_stats_sharded(&mut source, config)
    } else {
        compute_stats(&mut source, config)
    }
}
