//! mmapbench entry point
//!
//! Orchestration only: parse and validate, establish the mapping, probe the
//! kernel counters (fatal if unreadable), spawn the CPU loader and the
//! workers, hand stdout to the sampler, then tear everything down in order
//! and report the totals. All benchmark logic lives in the library modules.

use anyhow::Context;
use mmapbench::config::{cli::Cli, Config};
use mmapbench::cpuload::CpuLoader;
use mmapbench::kernel::KernelCounters;
use mmapbench::output::RunSummary;
use mmapbench::region::Region;
use mmapbench::sampler::Sampler;
use mmapbench::stats::CounterSet;
use mmapbench::util::cancel::CancelToken;
use mmapbench::util::time::{format_bytes, format_rate, ops_per_sec};
use mmapbench::worker::WorkerPool;
use mmapbench::Result;
use std::io;
use std::sync::Arc;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse_args();
    let config = Config::from_cli(cli);
    config.validate().context("Invalid configuration")?;

    log::info!(
        "mmapbench v{} on {} CPUs",
        env!("CARGO_PKG_VERSION"),
        num_cpus::get()
    );
    for line in config.to_string().lines() {
        log::info!("{}", line);
    }

    let region = Arc::new(
        Region::map(&config.target, config.mapping_bytes(), config.preallocate)
            .context("Failed to establish the mapped region")?,
    );
    log::info!(
        "mapped {} of {} ({})",
        format_bytes(region.len() as u64),
        config.target.display(),
        region.target_kind()
    );

    // Probe before anything spawns: an unreadable counter source is a setup
    // failure, not a zero reading.
    let kernel = KernelCounters::from_device(&config.device, config.sysfs_device.as_deref());
    kernel
        .snapshot()
        .context("Failed to read kernel counter sources")?;

    let counters = CounterSet::new(config.threads);
    let cancel = CancelToken::new();

    let cpu_loader = CpuLoader::spawn()?;
    let pool = WorkerPool::spawn(config.mode, &region, &counters, &cancel)?;
    log::info!("{} workers running", pool.len());

    let sampler = Sampler::new(
        config.mode,
        config.threads,
        config.interval(),
        config.run_duration(),
    );
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let totals = sampler.run(&mut out, &counters, Some(&kernel), &cancel)?;
    drop(out);

    pool.join().context("Worker thread failed")?;
    let remainder_ops = counters.drain_ops();
    let cpu_loader_rounds = cpu_loader.stop()?;

    let total_ops = totals.ops + remainder_ops;
    log::info!(
        "{} operations in {:.3}s ({} ops/s), {} samples",
        total_ops,
        totals.elapsed.as_secs_f64(),
        format_rate(ops_per_sec(total_ops, totals.elapsed)),
        totals.samples
    );

    if let Some(path) = &config.json_output {
        let summary = RunSummary::new(&config, &totals, remainder_ops, cpu_loader_rounds);
        summary.write_to(path)?;
        log::info!("JSON summary written to {}", path.display());
    }

    Ok(())
}
