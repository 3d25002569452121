use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tagsieve::{Element, ElementFilter, io};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Filter expression, e.g. "nodes with entrance and !barrier"
    #[arg(short, long)]
    filter: String,

    /// Input JSON Lines file ("-" for stdin)
    #[arg(short, long, default_value = "-")]
    input: PathBuf,

    /// Output JSON Lines file ("-" for stdout)
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// Print the number of matches instead of the matching elements
    #[arg(long)]
    count: bool,

    /// Match elements in parallel
    #[arg(long)]
    parallel: bool,

    /// Number of threads (default: all cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("CLI: Failed to initialize thread pool")?;
    }

    let filter = ElementFilter::parse(&cli.filter)
        .with_context(|| format!("CLI: Invalid filter expression {:?}", cli.filter))?;
    tracing::info!("Filter: {}", filter);

    let elements = if cli.input == Path::new("-") {
        io::read_elements(BufReader::new(std::io::stdin().lock()))
            .context("CLI: Failed to read elements from stdin")?
    } else {
        io::read_elements_jsonl(&cli.input)?
    };
    let total_count = elements.len();
    tracing::info!("Read {} elements.", total_count);

    let start = std::time::Instant::now();
    let matched: Vec<&Element> = if cli.parallel {
        elements
            .par_iter()
            .filter(|element| filter.matches(element))
            .collect()
    } else {
        elements
            .iter()
            .filter(|element| filter.matches(element))
            .collect()
    };
    let match_count = matched.len();

    if cli.count {
        println!("{match_count}");
    } else if cli.output == Path::new("-") {
        io::write_elements(BufWriter::new(std::io::stdout().lock()), matched)
            .context("CLI: Failed to write elements to stdout")?;
    } else {
        let file = File::create(&cli.output)
            .with_context(|| format!("CLI: Failed to create {:?}", cli.output))?;
        io::write_elements(BufWriter::new(file), matched)
            .with_context(|| format!("CLI: Failed to write elements to {:?}", cli.output))?;
    }

    let elapsed = start.elapsed();
    tracing::info!(
        "Done! Matched {} of {} elements in {:.2}s ({} elements/s)",
        match_count,
        total_count,
        elapsed.as_secs_f64(),
        (total_count as f64 / elapsed.as_secs_f64()) as u64
    );

    Ok(())
}
