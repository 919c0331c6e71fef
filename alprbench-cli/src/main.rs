//! Speed benchmark for ALPR engines across concurrent video streams.
//!
//! Runs one worker per logical CPU over a growing number of simulated camera
//! streams and reports throughput and CPU utilisation per resolution.

use alprbench_cli::cli::Cli;
use alprbench_cli::config::ConfigManager;
use alprbench_cli::output::{SpinnerDownloader, TableBuilder};
use alprbench_cli::{EXIT_CANCELLED, exit_code};
use alprbench_core::assets::{AssetCache, HttpDownloader};
use alprbench_core::engine::prepare_gpu_config;
use alprbench_core::host::{self, OperatingSystem};
use alprbench_core::{
    AdaptiveSearch, CancellationFlag, EngineBackend, ExperimentRunner, SyntheticBackend,
    SystemCpuSampler,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

enum Completion {
    Finished,
    Cancelled,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_directive())),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(Completion::Finished) => ExitCode::SUCCESS,
        Ok(Completion::Cancelled) => ExitCode::from(EXIT_CANCELLED),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(cli: &Cli) -> Result<Completion> {
    let os = OperatingSystem::detect()?;
    let manager = ConfigManager::load(cli.settings.as_deref())?;
    let settings = manager.settings();
    info!(path = %manager.path().display(), "loaded settings");

    let mut config = cli.benchmark_config(os, settings)?;
    let cache = AssetCache::new(settings.assets.cache_dir(), settings.assets.endpoint.as_str());
    if config.gpu {
        config.config_path = prepare_gpu_config(&config.config_path, cache.dir())
            .with_context(|| {
                format!(
                    "failed to prepare GPU configuration from {}",
                    config.config_path.display()
                )
            })?;
    }

    let cancel = CancellationFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("Ctrl-C received, stopping workers");
        handler_flag.cancel();
    })
    .context("failed to install Ctrl-C handler")?;

    let backend = SyntheticBackend::new(settings.synthetic.clone());
    let version = backend.version(&config.engine_settings())?;
    info!(%version, workers = config.workers, gpu = config.gpu, "recognizer loaded");

    let downloader = SpinnerDownloader::new(
        HttpDownloader::new(settings.harness.download_timeout())?,
        !config.quiet,
    );
    let videos = cache.fetch(&config.resolutions, &downloader)?;

    let sampler = SystemCpuSampler::new();
    let mut runner = ExperimentRunner::new(&backend, &config, videos, &sampler, cancel.clone());
    let outcome = AdaptiveSearch::from(&config).run(&mut runner)?;

    let mut results = runner.into_results();
    results.set_title(format!(
        "OpenALPR Speed: {} stream(s) on {} threads",
        outcome.final_streams,
        host::logical_cpus()
    ));
    let mut stdout = io::stdout().lock();
    TableBuilder::from_results(&results)
        .render(&mut stdout)
        .context("failed to print results")?;
    stdout.flush()?;

    if let Some(output) = &cli.output {
        results.add_column("CPU Model", host::cpu_model());
        results.add_column(
            "AWS Instance",
            host::instance_type(settings.harness.metadata_timeout()),
        );
        results.add_column("Streams", outcome.final_streams);
        let path = std::path::absolute(output)
            .with_context(|| format!("invalid output path {}", output.display()))?;
        writeln!(stdout, "Saving results to {}", path.display())?;
        results
            .save_csv(&path)
            .with_context(|| format!("failed to save results to {}", path.display()))?;
    }

    if outcome.cancelled {
        warn!(passes = outcome.passes, "benchmark cancelled, results are partial");
        return Ok(Completion::Cancelled);
    }
    Ok(Completion::Finished)
}
