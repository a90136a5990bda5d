// SPDX-License-Identifier: MIT
//
// Seed Cracker: wordlist-driven recovery of provably-fair server seeds

//! Seed Cracker CLI
//!
//! Runs a single cracking job against a wordlist on disk, polling progress
//! once per second until the job reaches a terminal state.
//!
//! ```text
//! ┌──────────────┐   stream    ┌──────────────┐    claim    ┌──────────────┐
//! │   Wordlist   │ ───────────>│  WorkerPool  │ ───────────>│    Result    │
//! │ (.txt/gz/zip)│             │  (N workers) │             │ (seed, roll) │
//! └──────────────┘             └──────────────┘             └──────────────┘
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use cracker_core::{JobRegistry, JobSpec, JobStatus, Wordlist, DEFAULT_WORKERS};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "cracker")]
#[command(about = "Recover a server seed by scanning a wordlist", long_about = None)]
struct Args {
    /// Wordlist file (plain text, .gz, or single-entry .zip)
    wordlist: PathBuf,

    /// Published server seed hash (128 hex characters)
    #[arg(short, long)]
    target_hash: String,

    /// Client seed used in the verification formula
    #[arg(short, long)]
    client_seed: String,

    /// Nonce used in the verification formula
    #[arg(short, long)]
    nonce: u64,

    /// Scan speed limit in candidates per second (unlimited when omitted)
    #[arg(short, long)]
    speed: Option<f64>,

    /// Number of scan workers
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    info!("Seed Cracker v{}", cracker_core::VERSION);

    let wordlist = Wordlist::open(&args.wordlist)
        .with_context(|| format!("Failed to open wordlist {}", args.wordlist.display()))?;
    info!(
        "Wordlist: {} ({:?})",
        args.wordlist.display(),
        wordlist.format()
    );

    let registry = JobRegistry::new();
    let id = registry
        .submit(JobSpec {
            target_hash: args.target_hash,
            client_seed: args.client_seed,
            nonce: args.nonce,
            wordlist,
            speed_limit: args.speed,
            workers: args.workers,
        })
        .context("Job submission rejected")?;

    let snapshot = loop {
        std::thread::sleep(Duration::from_secs(1));
        let snapshot = registry.snapshot(id)?;
        if snapshot.status.is_terminal() {
            break snapshot;
        }
        match snapshot.total {
            Some(total) => info!(
                "Progress: {}/{} candidates, {:.0}/s, ETA {}",
                snapshot.processed,
                total,
                snapshot.speed,
                snapshot
                    .eta_seconds
                    .map_or_else(|| "unknown".to_string(), |eta| format!("{:.0}s", eta)),
            ),
            None => info!("Counting candidates..."),
        }
    };

    let report = registry.stats().report();
    info!(
        "Scan finished: {} candidates hashed at {:.0}/s overall",
        report.candidates_hashed, report.hash_rate
    );

    match snapshot.status {
        JobStatus::Found => {
            let m = registry
                .result(id)?
                .context("Terminal Found state without a match")?;
            println!("server seed : {}", m.candidate);
            println!("line index  : {}", m.index);
            println!("dice roll   : {:.2}", m.roll);
            Ok(())
        }
        JobStatus::Exhausted => {
            bail!(
                "No match in {} candidates",
                snapshot.total.unwrap_or(snapshot.processed)
            )
        }
        JobStatus::Cancelled => bail!("Job was cancelled"),
        JobStatus::Error => {
            let reason = snapshot
                .error
                .map_or_else(|| "unknown".to_string(), |e| e.message);
            bail!("Job failed: {}", reason)
        }
        // Terminal loop above guarantees we never land here
        other => bail!("Unexpected terminal status {:?}", other),
    }
}
