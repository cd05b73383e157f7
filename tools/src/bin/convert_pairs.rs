use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use termmap_core::{PairFileWriter, PairSource, TsvPairs};
use termmap_tools::init_tracing;

// Turn a term<TAB>vertex listing into the binary pair stream that
// create_mappings reads by default. The stream is closed with an end
// marker, so a conversion that dies half way is detected as truncated.

#[derive(Parser)]
struct Args {
    /// term<TAB>vertex lines
    #[arg(long)]
    input: PathBuf,

    /// Pair stream to write
    #[arg(long)]
    out: PathBuf,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let source = TsvPairs::new(&args.input);
    let mut writer = PairFileWriter::create(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;
    for pair in source.pairs()? {
        let pair = pair.with_context(|| format!("reading {}", args.input.display()))?;
        writer.push(&pair.term, pair.vertex)?;
    }
    let written = writer.written();
    writer.finish()?;

    println!("Wrote {} ({} pairs)", args.out.display(), written);
    Ok(())
}
