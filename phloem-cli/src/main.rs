use anyhow::Result;
use clap::{Parser, Subcommand};
use phloem_cli::config::ProfileConfig;
use phloem_cli::tally::OutcomeTally;
use phloem_core::seed::{self, components};
use phloem_core::{DeadlineExecutor, HttpTransport, RequestOutcome, Runtime, Shutdown, SocialWorkload};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Phloem: synthetic-load generator for graph-shaped backends
///
/// Phloem drives a weighted mix of read, update, and insert operations
/// against a GraphQL endpoint, with keys drawn from configurable
/// distributions. Profiles are TOML files; see profiles/ for examples.
///
/// Example usage:
///   phloem load -P profiles/neo4j-social.toml
///   phloem run -P profiles/neo4j-social.toml
#[derive(Parser)]
#[command(name = "phloem")]
#[command(version, about = "Graph-backend load generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Populate the backend with the configured record count
    Load {
        /// Path to TOML profile configuration file
        #[arg(short = 'P', long, required = true)]
        profile: PathBuf,
    },

    /// Execute the transaction mix
    Run {
        /// Path to TOML profile configuration file
        #[arg(short = 'P', long, required = true)]
        profile: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Load,
    Run,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Load { profile } => execute(&profile, Phase::Load),
        Commands::Run { profile } => execute(&profile, Phase::Run),
    }
}

fn execute(profile: &PathBuf, phase: Phase) -> Result<()> {
    let config = Arc::new(ProfileConfig::load(profile)?);

    tracing::info!("phloem graph-backend load generator");
    tracing::info!(profile = %profile.display(), ?phase, "loading profile");
    tracing::info!(
        backend = %config.target.backend,
        address = %config.target.http.address,
        path = %config.target.http.path,
        threads = config.run.threads,
        "target"
    );
    if let Some(seed) = config.run.seed {
        tracing::info!(seed, "reproducible mode");
    }

    let shutdown = Shutdown::new();
    let master = Arc::new(SocialWorkload::new(
        &config.workload,
        config.run.seed,
        shutdown.clone(),
    )?);

    if let Some(duration) = config.run.duration {
        let timer_shutdown = shutdown.clone();
        thread::spawn(move || {
            if timer_shutdown.sleep(duration) {
                tracing::info!(?duration, "run duration elapsed, stopping workers");
                timer_shutdown.trigger();
            }
        });
    }

    let runtime = Runtime::new(config.run.threads);
    let start = Instant::now();

    let worker_config = Arc::clone(&config);
    let worker_shutdown = shutdown.clone();
    let tallies = runtime.run_workers(move |thread_id| {
        run_worker(&worker_config, &master, &worker_shutdown, phase, thread_id)
    })?;

    let elapsed = start.elapsed();
    shutdown.trigger();

    let mut tally = OutcomeTally::new();
    for worker_tally in tallies {
        tally.merge(worker_tally);
    }

    tally.report();
    let total = tally.total();
    let elapsed_secs = elapsed.as_secs_f64();
    tracing::info!(
        total,
        elapsed_secs,
        throughput = total as f64 / elapsed_secs.max(f64::EPSILON),
        "finished"
    );
    Ok(())
}

fn run_worker(
    config: &ProfileConfig,
    master: &SocialWorkload,
    shutdown: &Shutdown,
    phase: Phase,
    thread_id: usize,
) -> phloem_core::Result<OutcomeTally> {
    let worker_seed = config
        .run
        .seed
        .map(|s| seed::derive_seed(s, &format!("{}_{}", components::WORKER, thread_id)));

    let mut workload = master.for_worker(worker_seed)?;
    let mut backend = phloem_backends::create_backend(
        &config.target.backend,
        seed::derive_opt(worker_seed, components::VALUE_TEXT),
    )?;
    let executor = DeadlineExecutor::new(
        HttpTransport::new(&config.target.http),
        config.target.http.exec_timeout,
        backend.error_marker().to_string(),
    );

    let mut tally = OutcomeTally::new();
    match phase {
        Phase::Load => {
            let share = worker_share(config.run.insert_count, config.run.threads, thread_id);
            let operation = format!("load.{}", workload.default_table());
            for _ in 0..share {
                if shutdown.is_triggered() {
                    break;
                }
                let ok = workload.do_insert(backend.as_mut(), &executor)?;
                tally.record(&operation, if ok { RequestOutcome::Ok } else { RequestOutcome::Error });
            }
        }
        Phase::Run => {
            let share = worker_share(config.run.operation_count, config.run.threads, thread_id);
            for _ in 0..share {
                if shutdown.is_triggered() {
                    break;
                }
                match workload.do_transaction(backend.as_mut(), &executor)? {
                    Some((operation, outcome)) => tally.record(&operation, outcome),
                    None => {
                        tracing::warn!("operation mix is empty, stopping worker");
                        break;
                    }
                }
            }
        }
    }
    Ok(tally)
}

/// Split `total` across `threads` workers, remainder to the lowest ids.
fn worker_share(total: u64, threads: usize, thread_id: usize) -> u64 {
    let threads = threads.max(1) as u64;
    total / threads + u64::from((thread_id as u64) < total % threads)
}
