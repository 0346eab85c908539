// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! hotsplit CLI
//!
//! Drives split candidate tracking outside the engine: replay a recorded access trace
//! or generate a synthetic skewed workload, fold the worker sets and print the ranked
//! candidates.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use hotsplit_core::{CandidateReport, CandidateSet, EpochAggregator, Key, KeyParts, OperationKind, SourceRetention, SplitConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "hotsplit")]
#[command(about = "hotsplit - hot key split candidate analysis")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(flatten)]
    tuning: TuningArgs,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TuningArgs {
    /// JSON configuration file; flags below override its fields
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Score above which a key is considered for split mode
    #[arg(long = "wr", global = true)]
    score_threshold: Option<f64>,

    /// Weight given to conflicts over writes
    #[arg(long = "cw", global = true)]
    conflict_weight: Option<f64>,

    /// Weight given to reads over stashes
    #[arg(long = "rw", global = true)]
    read_weight: Option<f64>,

    /// Maximum number of candidates to print
    #[arg(long, global = true)]
    limit: Option<usize>,

    /// Zero worker statistics after each merge instead of keeping cumulative counts
    #[arg(long, global = true)]
    reset_merged: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines access trace
    Replay {
        /// Trace file, one event object per line
        trace: PathBuf,
        /// Highest number of worker sets a trace may address
        #[arg(long, default_value_t = DEFAULT_MAX_WORKERS)]
        max_workers: usize,
    },
    /// Generate and analyse a synthetic skewed workload
    Simulate {
        /// Number of worker candidate sets
        #[arg(long, default_value_t = 4)]
        workers: usize,
        /// Size of the key space
        #[arg(long, default_value_t = 100_000)]
        keys: u64,
        /// Keys receiving most of the traffic
        #[arg(long, default_value_t = 16)]
        hot_keys: u64,
        /// Leading hot keys treated as already split
        #[arg(long, default_value_t = 2)]
        split_keys: u64,
        /// Share of accesses that go to hot keys
        #[arg(long, default_value_t = 0.3)]
        hot_fraction: f64,
        /// Accesses per worker per epoch
        #[arg(long, default_value_t = 50_000)]
        accesses: usize,
        #[arg(long, default_value_t = 3)]
        epochs: u64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

const DEFAULT_MAX_WORKERS: usize = 256;

/// One line of a replay trace
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum TraceEvent {
    Read {
        #[serde(default)]
        worker: usize,
        key: KeyParts,
        #[serde(default)]
        split: bool,
    },
    Write {
        #[serde(default)]
        worker: usize,
        key: KeyParts,
        #[serde(default)]
        split: bool,
        op: OperationKind,
    },
    Conflict {
        #[serde(default)]
        worker: usize,
        key: KeyParts,
        #[serde(default)]
        split: bool,
        op: OperationKind,
    },
    Stash {
        #[serde(default)]
        worker: usize,
        key: KeyParts,
    },
    ReadWrite {
        #[serde(default)]
        worker: usize,
        key: KeyParts,
        #[serde(default)]
        split: bool,
    },
    Epoch,
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = match load_config(&cli.tuning) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Replay { trace, max_workers } => handle_replay(config, &trace, max_workers),
        Commands::Simulate {
            workers,
            keys,
            hot_keys,
            split_keys,
            hot_fraction,
            accesses,
            epochs,
            seed,
        } => {
            let workload = Workload {
                keys,
                hot_keys,
                split_keys,
                hot_fraction,
                accesses,
            };
            handle_simulate(config, workers, epochs, seed, &workload)
        }
    };

    match result {
        Ok(report) => {
            if let Err(e) = emit_report(&report, cli.json) {
                error!("Failed to write report: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            process::exit(1);
        }
    }
}

fn load_config(args: &TuningArgs) -> anyhow::Result<SplitConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            SplitConfig::from_json(&json)?
        }
        None => SplitConfig::default(),
    };

    if let Some(threshold) = args.score_threshold {
        config = config.with_score_threshold(threshold);
    }
    if let Some(weight) = args.conflict_weight {
        config = config.with_conflict_weight(weight);
    }
    if let Some(weight) = args.read_weight {
        config = config.with_read_weight(weight);
    }
    if let Some(limit) = args.limit {
        config = config.with_report_limit(limit);
    }
    if args.reset_merged {
        config = config.with_source_retention(SourceRetention::Reset);
    }
    config.validate()?;
    Ok(config)
}

fn emit_report(report: &CandidateReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else if report.is_empty() {
        println!("No split candidates");
    } else {
        print!("{report}");
    }
    Ok(())
}

fn handle_replay(config: Arc<SplitConfig>, trace: &Path, max_workers: usize) -> anyhow::Result<CandidateReport> {
    let file = File::open(trace).with_context(|| format!("opening trace {}", trace.display()))?;
    let mut workers: Vec<CandidateSet> = Vec::new();
    let mut aggregator = EpochAggregator::new(config.clone());
    let mut events = 0usize;

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: TraceEvent = serde_json::from_str(&line).with_context(|| format!("{}:{}", trace.display(), line_no + 1))?;
        if let TraceEvent::Epoch = event {
            aggregator.fold(&mut workers)?;
            continue;
        }
        record(&mut workers, &config, max_workers, event).with_context(|| format!("{}:{}", trace.display(), line_no + 1))?;
        events += 1;
    }

    aggregator.fold(&mut workers)?;
    info!(events, workers = workers.len(), epochs = aggregator.epoch(), "replay finished");
    aggregator.aggregate().print();
    Ok(aggregator.aggregate().report())
}

/// Worker set for a trace-supplied index, growing the pool up to `max_workers`.
fn worker_set<'a>(workers: &'a mut Vec<CandidateSet>, config: &Arc<SplitConfig>, max_workers: usize, worker: usize) -> anyhow::Result<&'a mut CandidateSet> {
    anyhow::ensure!(worker < max_workers, "worker {worker} out of range, at most {max_workers} workers allowed");
    if worker >= workers.len() {
        workers.resize_with(worker + 1, || CandidateSet::new(config.clone()));
    }
    Ok(&mut workers[worker])
}

fn record(workers: &mut Vec<CandidateSet>, config: &Arc<SplitConfig>, max_workers: usize, event: TraceEvent) -> anyhow::Result<()> {
    match event {
        TraceEvent::Read { worker, key, split } => worker_set(workers, config, max_workers, worker)?.read(key.into(), split),
        TraceEvent::Write { worker, key, split, op } => worker_set(workers, config, max_workers, worker)?.write(key.into(), split, op)?,
        TraceEvent::Conflict { worker, key, split, op } => worker_set(workers, config, max_workers, worker)?.conflict(key.into(), split, op)?,
        TraceEvent::Stash { worker, key } => worker_set(workers, config, max_workers, worker)?.stash(key.into()),
        TraceEvent::ReadWrite { worker, key, split } => worker_set(workers, config, max_workers, worker)?.read_write(key.into(), split),
        TraceEvent::Epoch => {}
    }
    Ok(())
}

struct Workload {
    keys: u64,
    hot_keys: u64,
    split_keys: u64,
    hot_fraction: f64,
    accesses: usize,
}

impl Workload {
    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.keys > 0, "key space must not be empty");
        anyhow::ensure!(self.hot_keys > 0 && self.hot_keys <= self.keys, "hot keys must be between 1 and the key space size");
        anyhow::ensure!(self.split_keys <= self.hot_keys, "split keys must be a subset of the hot keys");
        anyhow::ensure!((0.0..=1.0).contains(&self.hot_fraction), "hot fraction must be within [0, 1]");
        Ok(())
    }

    /// Feeds one epoch of accesses into a worker set.
    fn drive(&self, set: &mut CandidateSet, rng: &mut StdRng) -> anyhow::Result<()> {
        for _ in 0..self.accesses {
            let id = if rng.gen_bool(self.hot_fraction) { rng.gen_range(0..self.hot_keys) } else { rng.gen_range(0..self.keys) };
            let key = Key::composite(id, 0);
            let roll: f64 = rng.r#gen();

            if id < self.split_keys {
                if roll < 0.7 {
                    set.stash(key);
                } else if roll < 0.9 {
                    set.read(key, true);
                } else {
                    set.read_write(key, true);
                }
            } else if id < self.hot_keys {
                if roll < 0.4 {
                    set.conflict(key, false, OperationKind::Sum)?;
                } else if roll < 0.7 {
                    set.write(key, false, OperationKind::Sum)?;
                } else {
                    set.read(key, false);
                }
            } else if roll < 0.8 {
                set.read(key, false);
            } else {
                set.write(key, false, OperationKind::Sum)?;
            }
        }
        Ok(())
    }
}

fn handle_simulate(config: Arc<SplitConfig>, workers: usize, epochs: u64, seed: u64, workload: &Workload) -> anyhow::Result<CandidateReport> {
    workload.validate()?;
    if workers == 0 {
        warn!("No workers requested, nothing to simulate");
    }

    let presize = workload.accesses.min(workload.keys as usize);
    let mut sets: Vec<_> = (0..workers).map(|_| CandidateSet::with_capacity(config.clone(), presize)).collect();
    let mut rngs: Vec<_> = (0..workers as u64).map(|w| StdRng::seed_from_u64(seed.wrapping_add(w))).collect();
    let mut aggregator = EpochAggregator::new(config);

    for _ in 0..epochs {
        sets.par_iter_mut().zip(rngs.par_iter_mut()).try_for_each(|(set, rng)| workload.drive(set, rng))?;
        let summary = aggregator.fold(&mut sets)?;
        info!(epoch = summary.epoch, candidates = aggregator.aggregate().candidates().len(), "epoch complete");
    }

    let aggregate = aggregator.into_aggregate();
    aggregate.print();
    Ok(aggregate.report())
}
