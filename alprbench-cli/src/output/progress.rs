//! Spinners for long-running steps

use alprbench_core::BenchResult;
use alprbench_core::assets::Downloader;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

#[must_use]
pub fn spinner(operation: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(operation.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Shows a spinner while the wrapped downloader fetches each file.
pub struct SpinnerDownloader<D> {
    inner: D,
    visible: bool,
}

impl<D: Downloader> SpinnerDownloader<D> {
    #[must_use]
    pub const fn new(inner: D, visible: bool) -> Self {
        Self { inner, visible }
    }
}

impl<D: Downloader> Downloader for SpinnerDownloader<D> {
    fn download(&self, url: &str, dest: &Path) -> BenchResult<u64> {
        if !self.visible {
            return self.inner.download(url, dest);
        }
        let name = dest
            .file_name()
            .map_or_else(|| url.to_string(), |n| n.to_string_lossy().into_owned());
        let bar = spinner(&format!("Downloading {name}"));
        let result = self.inner.download(url, dest);
        bar.finish_and_clear();
        result
    }
}
