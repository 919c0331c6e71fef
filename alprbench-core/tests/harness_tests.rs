//! End-to-end tests of the search, runner and pool over test collaborators.

#![allow(clippy::unwrap_used)]

use alprbench_core::assets::{AssetCache, Downloader};
use alprbench_core::testing::{FixedCpuSampler, Script, ScriptedBackend};
use alprbench_core::{
    AdaptiveSearch, BenchError, BenchResult, BenchmarkConfig, CancellationFlag, ExperimentRunner,
    Resolution, SyntheticBackend, SyntheticSettings,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

fn fast_config(resolutions: &[Resolution]) -> BenchmarkConfig {
    BenchmarkConfig {
        resolutions: resolutions.to_vec(),
        workers: 3,
        poll_interval: Duration::from_millis(5),
        ..BenchmarkConfig::default()
    }
}

fn scripted_videos(resolutions: &[Resolution]) -> Vec<(Resolution, PathBuf)> {
    resolutions
        .iter()
        .map(|res| (*res, PathBuf::from(res.file_name())))
        .collect()
}

/// Writes an empty placeholder for every video it is asked for.
struct TouchDownloader;

impl Downloader for TouchDownloader {
    fn download(&self, _url: &str, dest: &Path) -> BenchResult<u64> {
        fs::write(dest, b"")?;
        Ok(0)
    }
}

#[test]
fn non_adaptive_run_produces_one_row_per_resolution() {
    let resolutions = [Resolution::Vga, Resolution::Hd720, Resolution::Hd1080];
    let config = fast_config(&resolutions);
    let backend = ScriptedBackend::new(Script::Frames(30));
    let sampler = FixedCpuSampler::new(70.0);
    let mut runner = ExperimentRunner::new(
        &backend,
        &config,
        scripted_videos(&resolutions),
        &sampler,
        CancellationFlag::new(),
    );

    let outcome = AdaptiveSearch::from(&config).run(&mut runner).unwrap();

    assert_eq!(outcome.passes, 1);
    assert_eq!(outcome.final_streams, 1);
    let table = runner.into_results();
    let names: Vec<&str> = table.rows().iter().map(|row| row[0].as_str()).collect();
    assert_eq!(names, vec!["vga", "720p", "1080p"]);
    assert!(table.rows().iter().all(|row| row[4] == "30"));
}

#[test]
fn adaptive_run_grows_until_cpu_crosses_threshold() {
    let resolutions = [Resolution::Vga];
    let config = BenchmarkConfig {
        start_streams: 2,
        step: 2,
        cpu_threshold: 60.0,
        ..fast_config(&resolutions)
    };
    let backend = ScriptedBackend::new(Script::Frames(10));
    let stats = backend.stats();
    let sampler = FixedCpuSampler::new(50.0);
    let mut runner = ExperimentRunner::new(
        &backend,
        &config,
        scripted_videos(&resolutions),
        &sampler,
        CancellationFlag::new(),
    );

    // CPU stays at 50% so growth only stops at the ceiling
    let search = AdaptiveSearch {
        ceiling: 6,
        ..AdaptiveSearch::from(&config)
    };
    let outcome = search.run(&mut runner).unwrap();

    assert_eq!(outcome.passes, 3);
    assert_eq!(outcome.final_streams, 6);
    assert!(outcome.hit_ceiling);
    assert_eq!(stats.streams_created.load(Ordering::Relaxed), 2 + 4 + 6);
    // Only the last experiment's rows survive
    assert_eq!(runner.results().len(), 1);
    assert_eq!(runner.results().rows()[0][4], "10");
}

#[test]
fn cancellation_from_another_thread_stops_search_promptly() {
    let resolutions = [Resolution::Vga, Resolution::Hd720];
    let config = BenchmarkConfig {
        cpu_threshold: 95.0,
        poll_interval: Duration::from_millis(50),
        ..fast_config(&resolutions)
    };
    let backend = ScriptedBackend::new(Script::Endless).with_recognize_delay(Duration::from_millis(1));
    let sampler = FixedCpuSampler::new(10.0);
    let cancel = CancellationFlag::new();
    let mut runner = ExperimentRunner::new(
        &backend,
        &config,
        scripted_videos(&resolutions),
        &sampler,
        cancel.clone(),
    );

    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        cancel.cancel();
        Instant::now()
    });
    let outcome = AdaptiveSearch::from(&config).run(&mut runner).unwrap();
    let finished = Instant::now();
    let cancelled_at = trigger.join().unwrap();

    assert!(outcome.cancelled);
    assert_eq!(outcome.passes, 1);
    assert_eq!(runner.results().len(), 1);
    assert!(finished.duration_since(cancelled_at) <= Duration::from_millis(100));
}

#[test]
fn gpu_without_batch_support_is_fatal_with_distinct_exit_code() {
    let resolutions = [Resolution::Vga];
    let config = BenchmarkConfig {
        gpu: true,
        ..fast_config(&resolutions)
    };
    let backend = ScriptedBackend::new(Script::Frames(10));
    let sampler = FixedCpuSampler::new(10.0);
    let mut runner = ExperimentRunner::new(
        &backend,
        &config,
        scripted_videos(&resolutions),
        &sampler,
        CancellationFlag::new(),
    );

    let err = AdaptiveSearch::from(&config).run(&mut runner).unwrap_err();

    assert!(matches!(err, BenchError::BatchUnsupported { .. }));
    assert!(err.is_configuration());
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn synthetic_engine_runs_from_asset_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = AssetCache::new(dir.path(), "https://example.test/v1");
    let resolutions = [Resolution::Vga, Resolution::Hd720];
    let videos = cache.fetch(&resolutions, &TouchDownloader).unwrap();

    let config = BenchmarkConfig {
        workers: 2,
        poll_interval: Duration::from_millis(1),
        ..fast_config(&resolutions)
    };
    let backend = SyntheticBackend::new(SyntheticSettings {
        frames_per_video: 40,
        work_per_megapixel: 1_000,
        ..SyntheticSettings::default()
    });
    let sampler = FixedCpuSampler::new(25.0);
    let mut runner =
        ExperimentRunner::new(&backend, &config, videos, &sampler, CancellationFlag::new());

    let outcome = AdaptiveSearch::from(&config).run(&mut runner).unwrap();

    assert_eq!(outcome.final_streams, 1);
    let table = runner.results();
    assert_eq!(table.len(), 2);
    assert!(table.rows().iter().all(|row| row[4] == "40"));
    assert!((outcome.min_cpu - 25.0).abs() < 1e-6);
}
