//! Pieces shared by the termmap command-line tools.

use std::path::Path;

use anyhow::{Result, bail};
use clap::ValueEnum;
use termmap_core::{PairFile, PairSource, TsvPairs};
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` wins over the default level.
pub fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Text listings (`.tsv`, `.txt`) are read line by line, anything else as
/// a binary pair stream.
pub fn open_source(path: &Path) -> Box<dyn PairSource> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("tsv") | Some("txt") => Box::new(TsvPairs::new(path)),
        _ => Box::new(PairFile::new(path)),
    }
}

/// Which of the two dictionaries a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DictKind {
    /// term -> vertices (`.wic`)
    Term,
    /// vertex -> terms (`.iwc`)
    Vertex,
}

impl DictKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("wic") => Ok(DictKind::Term),
            Some("iwc") => Ok(DictKind::Vertex),
            _ => bail!(
                "cannot tell the dictionary kind of {}; pass --kind",
                path.display()
            ),
        }
    }
}
