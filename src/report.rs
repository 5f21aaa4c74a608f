//src/report.rs

use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::value::RawValue;

use crate::error::SeqQcError;
use crate::types::{Base, KmerCount, StatsResult};

/// Human-readable, line-oriented summary.
pub fn render_summary(result: &StatsResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Sequences:            {}", result.sequence_count);
    let _ = writeln!(out, "Total length:         {}", result.total_length);
    let _ = writeln!(out, "Ungapped length:      {}", result.ungapped_length);
    let _ = writeln!(out, "Min length:           {}", result.min_length);
    let _ = writeln!(out, "Max length:           {}", result.max_length);
    let _ = writeln!(out, "Avg length:           {:.2}", result.avg_length);
    let _ = writeln!(out, "GC content:           {:.4}", result.gc_content);
    let _ = writeln!(out, "GC content (ungapped): {:.4}", result.gc_content_ungapped);

    let freqs: Vec<String> = Base::ALL
        .iter()
        .map(|&b| format!("{}={:.4}", b.symbol(), result.base_frequency(b)))
        .collect();
    let _ = writeln!(out, "Base frequencies:     {}", freqs.join(" "));

    let _ = writeln!(
        out,
        "Ambiguous bases:      {} ({:.4}) in {} gap run(s)",
        result.ambiguous_base_count, result.ambiguous_fraction, result.gap_count
    );
    let _ = writeln!(
        out,
        "Scaffold N50/N90:     {} / {}  (L50/L90: {} / {})",
        result.scaffold.n50, result.scaffold.n90, result.scaffold.l50, result.scaffold.l90
    );
    let _ = writeln!(
        out,
        "Contig N50/N90:       {} / {}  (L50/L90: {} / {}, {} contigs)",
        result.contig.n50,
        result.contig.n90,
        result.contig.l50,
        result.contig.l90,
        result.contig.count
    );
    let _ = writeln!(
        out,
        "Duplicates:           {} ({:.4})",
        result.duplicate_sequence_count, result.duplicate_fraction
    );
    let _ = writeln!(out, "Mean entropy (bits):  {:.4}", result.avg_shannon_entropy);

    out.push_str("Length histogram:\n");
    for (bin, count) in &result.length_histogram {
        let _ = writeln!(out, "  {bin}\t{count}");
    }

    let _ = writeln!(
        out,
        "Top k-mers ({} occurrences sampled):",
        result.kmers_counted
    );
    for kmer in result.top_kmers.iter().take(10) {
        let _ = writeln!(out, "  {}\t{}", kmer.kmer, kmer.count);
    }
    out
}

/// A fraction written with exactly 8 decimals.
type Fixed8 = Box<RawValue>;

fn fixed8(x: f64) -> Result<Fixed8, SeqQcError> {
    Ok(RawValue::from_string(format!("{x:.8}"))?)
}

#[derive(Serialize)]
struct BaseFrequencies {
    #[serde(rename = "A")]
    a: Fixed8,
    #[serde(rename = "C")]
    c: Fixed8,
    #[serde(rename = "G")]
    g: Fixed8,
    #[serde(rename = "T")]
    t: Fixed8,
    #[serde(rename = "N")]
    n: Fixed8,
}

/// `topKmers` keeps the ranking order, which is not key order.
struct TopKmers<'a>(&'a [KmerCount]);

impl Serialize for TopKmers<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for k in self.0 {
            map.serialize_entry(&k.kmer, &k.count)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    sequence_count: u64,
    total_length: u64,
    ungapped_length: u64,
    min_length: u64,
    max_length: u64,
    avg_length: Fixed8,
    gc_content: Fixed8,
    gc_content_ungapped: Fixed8,
    base_frequencies: BaseFrequencies,
    n50: u64,
    n90: u64,
    l50: u64,
    l90: u64,
    contig_count: u64,
    #[serde(rename = "contigN50")]
    contig_n50: u64,
    #[serde(rename = "contigN90")]
    contig_n90: u64,
    #[serde(rename = "contigL50")]
    contig_l50: u64,
    #[serde(rename = "contigL90")]
    contig_l90: u64,
    gap_count: u64,
    duplicate_fraction: Fixed8,
    duplicate_sequence_count: u64,
    ambiguous_base_count: u64,
    ambiguous_fraction: Fixed8,
    avg_shannon_entropy: Fixed8,
    length_histogram: &'a BTreeMap<u64, u64>,
    kmers_counted: u64,
    top_kmers: TopKmers<'a>,
}

impl<'a> JsonReport<'a> {
    fn new(result: &'a StatsResult) -> Result<Self, SeqQcError> {
        let freq = |b: Base| fixed8(result.base_frequency(b));
        Ok(Self {
            sequence_count: result.sequence_count,
            total_length: result.total_length,
            ungapped_length: result.ungapped_length,
            min_length: result.min_length,
            max_length: result.max_length,
            avg_length: fixed8(result.avg_length)?,
            gc_content: fixed8(result.gc_content)?,
            gc_content_ungapped: fixed8(result.gc_content_ungapped)?,
            base_frequencies: BaseFrequencies {
                a: freq(Base::A)?,
                c: freq(Base::C)?,
                g: freq(Base::G)?,
                t: freq(Base::T)?,
                n: freq(Base::N)?,
            },
            n50: result.scaffold.n50,
            n90: result.scaffold.n90,
            l50: result.scaffold.l50,
            l90: result.scaffold.l90,
            contig_count: result.contig.count,
            contig_n50: result.contig.n50,
            contig_n90: result.contig.n90,
            contig_l50: result.contig.l50,
            contig_l90: result.contig.l90,
            gap_count: result.gap_count,
            duplicate_fraction: fixed8(result.duplicate_fraction)?,
            duplicate_sequence_count: result.duplicate_sequence_count,
            ambiguous_base_count: result.ambiguous_base_count,
            ambiguous_fraction: fixed8(result.ambiguous_fraction)?,
            avg_shannon_entropy: fixed8(result.avg_shannon_entropy)?,
            length_histogram: &result.length_histogram,
            kmers_counted: result.kmers_counted,
            top_kmers: TopKmers(&result.top_kmers),
        })
    }
}

/// Structured key/value export (pretty-printed JSON). Fractions are written
/// with 8 decimals and `baseFrequencies` always lists A, C, G, T and N.
pub fn render_json(result: &StatsResult) -> Result<String, SeqQcError> {
    let report = JsonReport::new(result)?;
    Ok(serde_json::to_string_pretty(&report)?)
}
