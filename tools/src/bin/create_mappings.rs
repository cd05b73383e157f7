use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use termmap_core::{MappingBuilder, MappingConfig};
use termmap_tools::{init_tracing, open_source};

/// Build the term -> vertices (.wic) and vertex -> terms (.iwc)
/// dictionaries for one corpus slice.
#[derive(Parser)]
struct Args {
    /// Configuration file, TOML or <tag>value</tag> directives
    #[arg(long)]
    config: PathBuf,

    /// Pair source; defaults to the pair stream named by the configuration.
    /// `.tsv` / `.txt` files are read as term<TAB>vertex lines.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Case-fold terms (overrides the configuration when set)
    #[arg(long)]
    normalize: bool,

    /// Build both dictionaries concurrently
    #[arg(long)]
    parallel: bool,

    #[arg(long)]
    term_out: Option<PathBuf>,

    #[arg(long)]
    vertex_out: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = MappingConfig::load(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    config.normalize |= args.normalize;
    config.parallel |= args.parallel;

    // Derived paths need the naming directives unless every path is given.
    if args.input.is_none() || args.term_out.is_none() || args.vertex_out.is_none() {
        config.validate().context("incomplete configuration")?;
    }
    let input = args.input.unwrap_or_else(|| config.pair_stream_path());
    let term_out = args.term_out.unwrap_or_else(|| config.term_dictionary_path());
    let vertex_out = args.vertex_out.unwrap_or_else(|| config.vertex_dictionary_path());

    info!(
        input = %input.display(),
        normalize = config.normalize,
        parallel = config.parallel,
        "building dictionaries"
    );
    let source = open_source(&input);
    let summary = MappingBuilder::from_config(&config)
        .build_to(source.as_ref(), &term_out, &vertex_out)
        .with_context(|| format!("building dictionaries from {}", input.display()))?;

    for report in [&summary.term, &summary.vertex] {
        println!(
            "{}: {} pairs, {} keys, {} recorded, {} dropped",
            report.side,
            report.pairs_discovered,
            report.distinct_keys,
            report.recorded,
            report.dropped
        );
    }
    println!("Wrote {}", summary.term_path.display());
    println!("Wrote {}", summary.vertex_path.display());
    if summary.dropped() > 0 {
        warn!(
            dropped = summary.dropped(),
            "source or normalizer changed between passes; dictionaries are incomplete"
        );
    }
    Ok(())
}
