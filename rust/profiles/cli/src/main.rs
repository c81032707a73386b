//! `jsearch`: index a journalctl export and search it from a terminal.
//!
//! # Usage
//!
//! ```bash
//! journalctl --output=json > journal.json
//! jsearch search journal.json "connection refused" timeout
//!
//! # Interactive: one query per stdin line
//! jsearch search journal.json
//!
//! jsearch stats journal.json
//! jsearch show journal.json 1234
//! ```
//!
//! # Environment Variables
//!
//! - `JSEARCH_CHUNK_SIZE`: bytes per read (defaults to 65536)
//! - `JSEARCH_YIELD_EVERY`: entries per build batch (defaults to 1000)
//! - `JSEARCH_MALFORMED`: `abort` or `skip` (defaults to `abort`)
//! - `RUST_LOG`: log filter (defaults to `journal_index=info`)

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use journal_index::{
    find_all_matches, IndexConfig, IndexSession, LogEntry, LogIndex, MalformedEntryPolicy, Outcome,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Exit status after SIGINT, as a shell reports it.
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(name = "jsearch")]
#[command(about = "Substring search over journalctl exports")]
#[command(version)]
struct Cli {
    /// Bytes requested from the file per read
    #[arg(long, global = true, env = "JSEARCH_CHUNK_SIZE", default_value_t = IndexConfig::DEFAULT_READ_CHUNK_SIZE)]
    chunk_size: usize,

    /// Entries indexed between cooperative yields
    #[arg(long, global = true, env = "JSEARCH_YIELD_EVERY", default_value_t = IndexConfig::DEFAULT_YIELD_EVERY)]
    yield_every: usize,

    /// What to do with a record that cannot be parsed: abort or skip
    #[arg(long, global = true, env = "JSEARCH_MALFORMED", default_value = "abort", value_parser = parse_policy)]
    malformed: MalformedEntryPolicy,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search entry messages, case-insensitively
    Search {
        /// Journal file (`--output=json` or `--output=export`)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Queries to run; reads one per line from stdin when omitted
        #[arg(value_name = "QUERY")]
        queries: Vec<String>,

        /// Maximum matches printed per query
        #[arg(long, short = 'n', default_value_t = 20)]
        limit: usize,
    },
    /// Print index statistics
    Stats {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print one entry and its source byte range
    Show {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(value_name = "ORDINAL")]
        ordinal: u32,
    },
}

fn parse_policy(s: &str) -> Result<MalformedEntryPolicy, String> {
    MalformedEntryPolicy::parse(s).ok_or_else(|| format!("expected `abort` or `skip`, got `{s}`"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("journal_index=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = IndexConfig::builder()
        .read_chunk_size(cli.chunk_size)
        .yield_every(cli.yield_every)
        .malformed_entry_policy(cli.malformed)
        .build()
        .context("invalid index configuration")?;

    let session = Arc::new(IndexSession::new(config));
    {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            let mut interrupted = false;
            while tokio::signal::ctrl_c().await.is_ok() {
                if should_quit(&session, &mut interrupted) {
                    std::process::exit(EXIT_INTERRUPTED);
                }
            }
        });
    }

    match cli.command {
        Commands::Search {
            file,
            queries,
            limit,
        } => {
            let index = load(&session, &file).await?;
            if queries.is_empty() {
                let mut lines = BufReader::new(tokio::io::stdin()).lines();
                while let Some(query) = lines.next_line().await? {
                    run_query(&session, &index, &query, limit).await?;
                }
            } else {
                for query in &queries {
                    run_query(&session, &index, query, limit).await?;
                }
            }
        }
        Commands::Stats { file } => {
            let index = load(&session, &file).await?;
            let stats = index.stats();
            println!("entries:          {}", stats.entry_count);
            println!("skipped records:  {}", stats.skipped_records);
            println!("source bytes:     {}", stats.source_bytes);
            println!("trigrams:         {}", stats.trigram_count);
            println!("posting bytes:    {}", stats.posting_bytes);
            println!("posting reserved: {}", stats.posting_allocated_bytes);
        }
        Commands::Show { file, ordinal } => {
            let index = load(&session, &file).await?;
            let entry = index.get_entry(ordinal)?;
            let range = index.byte_range(ordinal)?;
            println!("ordinal:    {ordinal}");
            println!("bytes:      {}..{}", range.start, range.end);
            println!("time:       {}", entry.timestamp.format("%Y-%m-%d %H:%M:%S%.6f UTC"));
            println!("priority:   {}", entry.priority.map_or("-", |p| p.name()));
            println!("unit:       {}", entry.unit.as_deref().unwrap_or("-"));
            println!("identifier: {}", entry.syslog_identifier.as_deref().unwrap_or("-"));
            println!("lines:      {}", index.line_count(ordinal)?);
            println!();
            println!("{}", entry.message);
        }
    }
    Ok(())
}

/// Handle one Ctrl-C: cancel in-flight work the first time, quit when
/// idle or when pressed again.
fn should_quit(session: &IndexSession, interrupted: &mut bool) -> bool {
    if *interrupted || session.is_idle() {
        return true;
    }
    tracing::info!("interrupt: cancelling in-flight work, press Ctrl-C again to quit");
    session.cancel_all();
    *interrupted = true;
    false
}

async fn load(session: &IndexSession, file: &Path) -> anyhow::Result<Arc<LogIndex>> {
    let mut last_percent = None;
    let mut on_progress = |fraction: f64| {
        let percent = (fraction * 100.0) as u32;
        if last_percent != Some(percent) {
            last_percent = Some(percent);
            eprint!("\rindexing {}: {percent:>3}%", file.display());
            let _ = std::io::stderr().flush();
        }
    };
    let outcome = session
        .load_path(file, &mut on_progress)
        .await
        .with_context(|| format!("failed to index {}", file.display()))?;
    eprintln!();
    match outcome {
        Outcome::Complete(index) => Ok(index),
        Outcome::Cancelled => bail!("indexing {} was cancelled", file.display()),
    }
}

async fn run_query(
    session: &IndexSession,
    index: &LogIndex,
    query: &str,
    limit: usize,
) -> anyhow::Result<()> {
    let matches = match session.search(query, None).await? {
        Outcome::Complete(matches) => matches,
        Outcome::Cancelled => {
            eprintln!("search for {query:?} cancelled");
            return Ok(());
        }
    };
    println!("{query:?}: {} matching entries", matches.len());
    for &ordinal in matches.iter().take(limit) {
        print_entry(ordinal, index.get_entry(ordinal)?, query);
    }
    if matches.len() > limit {
        println!("  ... {} more", matches.len() - limit);
    }
    Ok(())
}

fn print_entry(ordinal: u32, entry: &LogEntry, query: &str) {
    let first_line = entry.message.lines().next().unwrap_or_default();
    let columns = find_all_matches(first_line, query)
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",");
    println!(
        "  #{ordinal:<8} {} {:<7} {}: {} [col {}]",
        entry.timestamp.format("%b %d %H:%M:%S"),
        entry.priority.map_or("-", |p| p.name()),
        entry
            .syslog_identifier
            .as_deref()
            .or(entry.unit.as_deref())
            .unwrap_or("-"),
        first_line,
        if columns.is_empty() { "-" } else { columns.as_str() },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctrl_c_when_idle_quits() {
        let session = IndexSession::default();
        let mut interrupted = false;
        assert!(should_quit(&session, &mut interrupted));
    }

    #[tokio::test]
    async fn test_ctrl_c_cancels_then_quits() {
        let config = IndexConfig::builder().yield_every(1).build().unwrap();
        let session = IndexSession::new(config);
        let data = "{\"__REALTIME_TIMESTAMP\":\"1\",\"MESSAGE\":\"a\"}\n".repeat(4);
        let mut ignore = |_: f64| {};
        let mut interrupted = false;
        // The build yields after its first entry, while the interrupt runs.
        let (outcome, quit) = tokio::join!(
            session.load(data.as_bytes(), None, &mut ignore),
            async { should_quit(&session, &mut interrupted) }
        );
        assert!(!quit);
        assert!(outcome.unwrap().is_cancelled());
        assert!(interrupted);
        assert!(should_quit(&session, &mut interrupted));
    }
}
