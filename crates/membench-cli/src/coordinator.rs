//! Run coordinator: validates configuration, wires up the store, worker
//! pool and sampler, and emits the final result row.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use membench_core::{Environment, ObjectFactory, OverheadMode, RealClock};
use membench_store::{StoreConfig, StoreHandle};
use membench_workers::{run_bursty_worker, run_strict_worker, BurstyWorkerConfig, StrictWorkerConfig};

use crate::config::Cli;
use crate::result_row::ResultRow;
use crate::sampler::Sampler;

/// Maximum members per store group, matching the admission queue's
/// capacity. Not exposed as a CLI flag.
const MAX_ITEMS_PER_GROUP: usize = 512;

/// Ceiling the coordinator waits for worker threads to finish past their
/// own `-d` deadline before giving up and returning anyway (the threads
/// are daemon-equivalent: the process exits regardless of their state).
const SHUTDOWN_JOIN_BUDGET: Duration = Duration::from_mins(1);

pub fn run(cli: Cli) -> anyhow::Result<()> {
    cli.validate().context("invalid configuration")?;

    let overhead = if cli.use_compressed {
        OverheadMode::Compressed
    } else {
        OverheadMode::NonCompressed
    };
    let env = Environment::new(overhead);
    let factory = Arc::new(ObjectFactory::new(Arc::clone(&env), cli.object_variant.into()));

    let avg_object_footprint =
        overhead.bytes() + round_up_8(cli.min_object_size.midpoint(cli.max_object_size));

    let store_config = StoreConfig {
        size_limit: cli.long_lived_target_mb * 1_048_576,
        max_items_per_group: MAX_ITEMS_PER_GROUP,
        prune_ratio_per_minute: cli.prune_ratio_per_minute,
        reshuffle_ratio: cli.reshuffle_ratio,
        max_producers: cli.num_threads,
    };
    let store = StoreHandle::new(store_config);

    tracing::info!(
        rate_mbps = cli.target_alloc_rate_mbps,
        duration_secs = cli.duration_secs,
        threads = cli.num_threads,
        "starting store consumer"
    );
    let consumer_store = Arc::clone(&store);
    let consumer_handle = thread::spawn(move || consumer_store.run_consumer());

    let sampler = match &cli.rate_log_path {
        Some(path) => Some(Sampler::start(Arc::clone(&env), path).context("failed to start rate sampler")?),
        None => None,
    };

    let ring_len_total =
        ((cli.mid_aged_target_mb * 1_048_576) as usize / avg_object_footprint).max(1);
    let ring_len_per_worker = (ring_len_total / cli.num_threads).max(1);
    let rate_per_worker = (cli.target_alloc_rate_mbps * 1_048_576) / cli.num_threads as u64;

    tracing::info!(threads = cli.num_threads, rate_per_worker, "spawning workers");

    let (done_tx, done_rx) = mpsc::channel();
    let mut worker_handles = Vec::with_capacity(cli.num_threads);
    for _ in 0..cli.num_threads {
        let producer = store.register_producer().context("failed to register worker producer")?;
        let factory = Arc::clone(&factory);
        let smoothness_factor = cli.smoothness_factor;
        let duration_secs = cli.duration_secs;
        let min_object_size = cli.min_object_size;
        let max_object_size = cli.max_object_size;
        let ramp_up_secs = cli.ramp_up_secs;
        let done_tx = done_tx.clone();

        let handle = thread::spawn(move || {
            let clock = Arc::new(RealClock::new());
            if let Some(smoothness_factor) = smoothness_factor {
                let config = BurstyWorkerConfig {
                    rate_bytes_per_sec: rate_per_worker,
                    duration_secs,
                    min_size: min_object_size,
                    max_size: max_object_size,
                    ring_len: ring_len_per_worker,
                    smoothness_factor,
                };
                run_bursty_worker(clock, &producer, &factory, &config);
            } else {
                let config = StrictWorkerConfig {
                    rate_bytes_per_sec: rate_per_worker,
                    duration_secs,
                    min_size: min_object_size,
                    max_size: max_object_size,
                    ring_len: ring_len_per_worker,
                    ramp_up_secs,
                };
                run_strict_worker(clock, &producer, &factory, &config);
            }
            let _ = done_tx.send(());
        });
        worker_handles.push(handle);
    }
    drop(done_tx);

    for i in 0..cli.num_threads {
        if done_rx.recv_timeout(SHUTDOWN_JOIN_BUDGET).is_err() {
            tracing::warn!(
                "worker threads did not all finish within the {}s shutdown budget ({} of {} reported)",
                SHUTDOWN_JOIN_BUDGET.as_secs(),
                i,
                cli.num_threads
            );
            break;
        }
    }
    for handle in worker_handles {
        if let Err(panic) = handle.join() {
            let msg = panic_message(&panic);
            tracing::error!(panic = %msg, "worker thread panicked");
            anyhow::bail!("worker thread panicked: {msg}");
        }
    }

    if let Some(sampler) = sampler {
        sampler.stop();
    }

    let final_size = store.stop_and_return_size();
    if let Err(panic) = consumer_handle.join() {
        let msg = panic_message(&panic);
        tracing::error!(panic = %msg, "store consumer thread panicked");
        anyhow::bail!("store consumer thread panicked: {msg}");
    }
    tracing::info!(final_size, "store stopped");

    let achieved_alloc_rate_mbps =
        env.bytes_allocated() as f64 / 1_048_576.0 / cli.duration_secs;

    let row = ResultRow {
        achieved_alloc_rate_mbps,
    };
    row.append_to(&cli.result_csv_path, &cli)
        .with_context(|| format!("failed to append result row to {}", cli.result_csv_path.display()))?;

    Ok(())
}

fn round_up_8(n: usize) -> usize {
    (n + 7) & !7
}

/// Best-effort extraction of a human-readable message from a thread panic
/// payload; `std::thread::Builder::spawn` panics are almost always `&str`
/// or `String` (from `panic!`/`assert!`), never anything else in practice.
fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
