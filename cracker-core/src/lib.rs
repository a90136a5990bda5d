// SPDX-License-Identifier: MIT
//
// Seed Cracker: wordlist-driven recovery of provably-fair server seeds

//! Cracker Core Library
//!
//! This crate implements the seed-cracking engine: it scans a candidate
//! wordlist, re-derives the keyed verification hash for each candidate against
//! a known client seed and nonce, and reports the one candidate whose digest
//! equals a previously published server seed hash.
//!
//! # Architecture
//!
//! The library is organized into modules representing core concerns:
//! - `wordlist`: lazy candidate streams over plain, gzip, or zip wordlists
//! - `hasher`: the keyed-hash derivation and comparison
//! - `limiter`: token-bucket throughput limiting
//! - `pool`: the fixed-size worker pool driving a scan
//! - `job`: job lifecycle, state machine, and progress snapshots
//! - `registry`: process-wide registry of jobs
//! - `stats`: engine-wide counters
//! - `error`: unified error types
//!
//! # Data flow
//!
//! ```text
//! ┌──────────────┐   bounded    ┌──────────────┐   claim    ┌──────────────┐
//! │   Wordlist   │ ────────────>│  WorkerPool  │ ──────────>│     Job      │
//! │   (reader)   │   channel    │  (N workers) │  (match)   │ (controller) │
//! └──────────────┘              └──────────────┘            └──────────────┘
//! ```
//!
//! A single reader thread streams candidates into a bounded hand-off channel;
//! workers pull through the rate limiter, hash, and compare. The first worker
//! to find equality installs the match through a single-winner claim and stops
//! the pool.

pub mod error;
pub mod hasher;
pub mod job;
pub mod limiter;
pub mod pool;
pub mod registry;
pub mod stats;
pub mod wordlist;

pub use error::{Error, ErrorKind, Result};
pub use job::{Job, JobSpec, JobStatus, ProgressSnapshot};
pub use pool::Match;
pub use registry::JobRegistry;
pub use wordlist::{Candidate, Wordlist, WordlistFormat};

/// Library version for display
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default number of scan workers per job
pub const DEFAULT_WORKERS: usize = 4;
