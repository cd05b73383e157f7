use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use termmap_core::{Association, TermMapping, TermVertexCount, VertexMapping};
use termmap_tools::{DictKind, init_tracing};

/// Look a key up in a .wic or .iwc dictionary, or dump every association.
#[derive(Parser)]
struct Args {
    /// Dictionary file
    #[arg(long)]
    dict: PathBuf,

    /// Dictionary kind; inferred from the .wic / .iwc extension if omitted
    #[arg(long, value_enum)]
    kind: Option<DictKind>,

    /// Key to look up (a term, or a vertex id for vertex dictionaries)
    #[arg(long, conflicts_with = "dump", required_unless_present = "dump")]
    key: Option<String>,

    /// Print every (term, vertex, count) triple
    #[arg(long)]
    dump: bool,

    /// Most frequent associations first
    #[arg(long)]
    ranked: bool,

    /// Emit JSON instead of tab-separated lines
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Entry<C> {
    counterpart: C,
    count: u32,
}

#[derive(Serialize)]
struct LookupResult<K, C> {
    key: K,
    found: bool,
    entries: Vec<Entry<C>>,
}

fn to_entries<C>(list: Vec<Association<C>>) -> Vec<Entry<C>> {
    list.into_iter()
        .map(|a| Entry {
            counterpart: a.counterpart,
            count: a.count,
        })
        .collect()
}

fn print_result<K, C>(result: &LookupResult<K, C>, json: bool) -> Result<()>
where
    K: Serialize + std::fmt::Display,
    C: Serialize + std::fmt::Display,
{
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else if !result.found {
        println!("{}: not found", result.key);
    } else {
        for e in &result.entries {
            println!("{}\t{}", e.counterpart, e.count);
        }
    }
    Ok(())
}

fn print_triples(triples: impl Iterator<Item = TermVertexCount>, json: bool) -> Result<()> {
    if json {
        let all: Vec<TermVertexCount> = triples.collect();
        println!("{}", serde_json::to_string_pretty(&all)?);
    } else {
        for t in triples {
            println!("{}\t{}\t{}", t.term, t.vertex, t.count);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let kind = match args.kind {
        Some(k) => k,
        None => DictKind::from_path(&args.dict)?,
    };

    match kind {
        DictKind::Term => {
            let m = TermMapping::load(&args.dict)
                .with_context(|| format!("loading {}", args.dict.display()))?;
            match args.key {
                Some(key) => {
                    let list = if args.ranked {
                        m.ranked(key.as_str())
                    } else {
                        m.lookup(key.as_str()).map(<[_]>::to_vec)
                    };
                    let result = LookupResult {
                        found: list.is_some(),
                        entries: to_entries(list.unwrap_or_default()),
                        key,
                    };
                    print_result(&result, args.json)?;
                }
                None => print_triples(m.triples(), args.json)?,
            }
        }
        DictKind::Vertex => {
            let m = VertexMapping::load(&args.dict)
                .with_context(|| format!("loading {}", args.dict.display()))?;
            match args.key {
                Some(key) => {
                    let vertex: u32 = key
                        .trim()
                        .parse()
                        .with_context(|| format!("`{}` is not a vertex id", key))?;
                    let list = if args.ranked {
                        m.ranked(&vertex)
                    } else {
                        m.lookup(&vertex).map(<[_]>::to_vec)
                    };
                    let result = LookupResult {
                        key: vertex,
                        found: list.is_some(),
                        entries: to_entries(list.unwrap_or_default()),
                    };
                    print_result(&result, args.json)?;
                }
                None => print_triples(m.triples(), args.json)?,
            }
        }
    }
    Ok(())
}
