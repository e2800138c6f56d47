//! lru-replay - replay scripted put/get sequences against an LRU cache

mod report;
mod runner;
mod script;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::report::{render, Format};
use crate::runner::replay;
use crate::script::CANONICAL;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Script to replay ("-" or omitted reads stdin)
    script: Option<PathBuf>,

    /// Cache capacity (number of entries)
    #[arg(short, long, default_value_t = 2)]
    capacity: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Replay the built-in capacity-2 walkthrough
    #[arg(long, conflicts_with = "script")]
    canonical: bool,

    /// Abort on the first malformed line instead of skipping it
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let source = if args.canonical {
        info!("Replaying canonical trace");
        CANONICAL.to_string()
    } else {
        read_script(args.script.as_deref())?
    };

    info!("Cache capacity: {}", args.capacity);
    let replay = replay(&source, args.capacity, args.strict)?;
    info!(
        "Replayed {} command(s), {} entr(ies) cached",
        replay.records.len(),
        replay.recency.len()
    );

    let output = render(&replay, args.format)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if args.format == Format::Json {
        stdout.write_all(b"\n")?;
    }

    Ok(())
}

fn read_script(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display())),
        _ => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("Failed to read script from stdin")?;
            Ok(source)
        }
    }
}
