use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use seqqc_rs::config::{DEFAULT_KMER_BUDGET, DEFAULT_SHARD_RECORDS, DEFAULT_TOP_KMERS};
use seqqc_rs::{render_json, render_summary, stats_for_path, StatsConfig};

fn build_cli() -> ArgMatches {
    cli().get_matches()
}

fn cli() -> Command {
    Command::new("seqqc-rs")
        .version(clap::crate_version!())
        .about("Streaming quality-control statistics for FASTA/FASTQ files")
        // FASTA (.fa/.fasta/.fna/.fas) or FASTQ (.fq/.fastq), optionally .gz
        .arg(
            Arg::new("input_file")
                .help("Input sequence file")
                .index(1)
                .value_parser(value_parser!(PathBuf))
                .required_unless_present("input")
                .conflicts_with("input"),
        )
        .arg(
            Arg::new("input")
                .help("Input sequence file (alternative to the positional argument)")
                .short('i')
                .long("input")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .help("Write the structured (JSON) export to this file")
                .short('o')
                .long("output")
                .value_parser(value_parser!(PathBuf)),
        )
        // Counts every sampled occurrence, not every distinct k-mer
        .arg(
            Arg::new("kmer_budget")
                .help("Total k-mer occurrences to sample")
                .short('k')
                .long("kmer-budget")
                .default_value("100000")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("top_kmers")
                .help("Number of most frequent k-mers to report")
                .long("top-kmers")
                .default_value("100")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("canonical_kmers")
                .help("Count each k-mer together with its reverse complement")
                .long("canonical-kmers")
                .action(ArgAction::SetTrue),
        )
        // 0 keeps the single global k-mer budget; >0 samples k-mers per shard
        .arg(
            Arg::new("threads")
                .help("Worker threads for sharded processing (0 = sequential)")
                .short('t')
                .long("threads")
                .default_value("0")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("shard_records")
                .help("Records per shard when running with --threads")
                .long("shard-records")
                .default_value("10000")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("json")
                .help("Print the JSON export to stdout instead of the summary")
                .long("json")
                .action(ArgAction::SetTrue),
        )
}

fn spinner(color: &str, msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let template = format!("{{spinner:.{color}}} {{msg}}");
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template(&template)
    {
        spinner.set_style(style);
    }
    spinner.set_message(msg.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn run(args: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    // all of these are required or defaulted
    let input = args
        .get_one::<PathBuf>("input_file")
        .or_else(|| args.get_one::<PathBuf>("input"))
        .ok_or("missing input file")?;
    let output = args.get_one::<PathBuf>("output");
    let kmer_budget = args.get_one::<u64>("kmer_budget").copied().unwrap_or(DEFAULT_KMER_BUDGET);
    let top_kmers = args.get_one::<usize>("top_kmers").copied().unwrap_or(DEFAULT_TOP_KMERS);
    let threads = args.get_one::<usize>("threads").copied().unwrap_or(0);
    let shard_records = args
        .get_one::<usize>("shard_records")
        .copied()
        .unwrap_or(DEFAULT_SHARD_RECORDS);

    let config = StatsConfig::new()
        .with_kmer_budget(kmer_budget)
        .with_top_kmers(top_kmers)
        .with_canonical_kmers(args.get_flag("canonical_kmers"))
        .with_shard_records(shard_records);

    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
        log::info!("Sharded mode: {} threads, {} records per shard", threads, config.shard_records);
    }

    // 1. Stream the input through the engine
    let progress = spinner("green", &format!("Computing statistics for {}...", input.display()));
    let result = stats_for_path(input, &config, threads > 0);
    progress.finish_and_clear();
    let result = result?;

    if result.is_empty() {
        println!("No sequences found in {}", input.display());
        return Ok(());
    }

    // 2. Render
    if args.get_flag("json") {
        println!("{}", render_json(&result)?);
    } else {
        print!("{}", render_summary(&result));
    }

    if let Some(path) = output {
        fs::write(path, render_json(&result)?)?;
        log::info!("Wrote JSON to {}", path.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = build_cli();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
