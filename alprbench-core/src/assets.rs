//! Local cache of the benchmark videos.

use crate::config::Resolution;
use crate::error::{BenchError, BenchResult};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Release holding one video per resolution, named `{resolution}.mp4`.
pub const DEFAULT_ENDPOINT: &str = "https://github.com/openalpr/speed_benchmark/releases/download/v1";

/// Fetches a remote file to a local path.
pub trait Downloader {
    /// Download `url` to `dest`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Any failure is fatal for the asset; `dest` must not be left behind
    /// looking complete.
    fn download(&self, url: &str, dest: &Path) -> BenchResult<u64>;
}

/// Blocking HTTP downloader.
pub struct HttpDownloader {
    client: reqwest::blocking::Client,
}

impl HttpDownloader {
    /// # Errors
    ///
    /// Returns an HTTP error if the client cannot be built.
    pub fn new(timeout: Duration) -> BenchResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> BenchResult<u64> {
        let failed = |reason: String| BenchError::Download {
            url: url.to_string(),
            path: dest.to_path_buf(),
            reason,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| failed(e.to_string()))?;

        // Write beside the destination and rename once complete
        let partial = dest.with_extension("part");
        let written = File::create(&partial)
            .map_err(|e| failed(e.to_string()))
            .and_then(|mut file| {
                let n = response.copy_to(&mut file).map_err(|e| failed(e.to_string()))?;
                file.flush().map_err(|e| failed(e.to_string()))?;
                Ok(n)
            });
        let written = match written {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&partial);
                return Err(e);
            }
        };
        fs::rename(&partial, dest).map_err(|e| failed(e.to_string()))?;
        Ok(written)
    }
}

/// Directory of benchmark videos keyed by file name.
#[derive(Debug, Clone)]
pub struct AssetCache {
    dir: PathBuf,
    endpoint: String,
}

/// `alprbench` under the system temporary directory.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("alprbench")
}

impl AssetCache {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, endpoint: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, resolution: Resolution) -> PathBuf {
        self.dir.join(resolution.file_name())
    }

    #[must_use]
    pub fn url_for(&self, resolution: Resolution) -> String {
        format!("{}/{}", self.endpoint, resolution.file_name())
    }

    /// Make sure every requested video is present locally, downloading the
    /// missing ones. Files already in the cache are never fetched again.
    ///
    /// # Errors
    ///
    /// Fails if the cache directory cannot be created or any download fails.
    pub fn fetch(
        &self,
        resolutions: &[Resolution],
        downloader: &dyn Downloader,
    ) -> BenchResult<Vec<(Resolution, PathBuf)>> {
        fs::create_dir_all(&self.dir)?;
        info!(dir = %self.dir.display(), "downloading benchmark videos");

        let mut videos = Vec::with_capacity(resolutions.len());
        for &resolution in resolutions {
            let path = self.path_for(resolution);
            if path.is_file() {
                info!(%resolution, "found local");
            } else {
                let bytes = downloader.download(&self.url_for(resolution), &path)?;
                info!(%resolution, bytes, "downloaded");
            }
            videos.push((resolution, path));
        }
        Ok(videos)
    }
}
