//! Facts about the machine the benchmark runs on.

use crate::error::{BenchError, BenchResult};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use sysinfo::{CpuRefreshKind, RefreshKind, System};

/// AWS instance metadata endpoint for the instance type.
pub const INSTANCE_TYPE_URL: &str = "http://169.254.169.254/latest/meta-data/instance-type";

/// Placeholder for any value that could not be determined.
pub const UNKNOWN: &str = "-";

static TRADEMARKS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\([RTM]+\)").ok());

/// Operating systems with a known recognizer install layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingSystem {
    Linux,
    Windows,
}

impl OperatingSystem {
    /// # Errors
    ///
    /// Returns `BenchError::UnsupportedOs` on anything but Linux or Windows.
    pub fn detect() -> BenchResult<Self> {
        Self::from_name(std::env::consts::OS)
    }

    /// # Errors
    ///
    /// Returns `BenchError::UnsupportedOs` for unknown names.
    pub fn from_name(name: &str) -> BenchResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            other => Err(BenchError::UnsupportedOs(other.to_string())),
        }
    }

    fn install_prefix(self) -> &'static str {
        match self {
            Self::Linux => "",
            Self::Windows => "C:/OpenALPR/Agent",
        }
    }

    #[must_use]
    pub fn default_config_path(self) -> PathBuf {
        PathBuf::from(format!(
            "{}/usr/share/openalpr/config/openalpr.defaults.conf",
            self.install_prefix()
        ))
    }

    #[must_use]
    pub fn default_runtime_path(self) -> PathBuf {
        PathBuf::from(format!(
            "{}/usr/share/openalpr/runtime_data",
            self.install_prefix()
        ))
    }
}

/// Logical CPU parallelism.
#[must_use]
pub fn logical_cpus() -> usize {
    num_cpus::get()
}

/// Remove `(R)`, `(TM)` and similar marks from a CPU brand string.
#[must_use]
pub fn strip_trademarks(brand: &str) -> String {
    let stripped = TRADEMARKS
        .as_ref()
        .map_or_else(|| brand.to_string(), |re| re.replace_all(brand, "").into_owned());
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Brand string of the first CPU, or `-` when unavailable.
#[must_use]
pub fn cpu_model() -> String {
    let system =
        System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::everything()));
    system
        .cpus()
        .first()
        .map(|cpu| strip_trademarks(cpu.brand()))
        .filter(|brand| !brand.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// AWS instance type from the metadata service, or `-` off AWS.
#[must_use]
pub fn instance_type(timeout: Duration) -> String {
    instance_type_from(INSTANCE_TYPE_URL, timeout)
}

/// Instance type served at `url`; `-` on any connection or HTTP failure.
#[must_use]
pub fn instance_type_from(url: &str, timeout: Duration) -> String {
    let fetched = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .and_then(|client| client.get(url).send())
        .and_then(reqwest::blocking::Response::error_for_status)
        .and_then(reqwest::blocking::Response::text);

    match fetched {
        Ok(body) if !body.trim().is_empty() => body.trim().to_string(),
        Ok(_) => UNKNOWN.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "unable to determine AWS instance type");
            UNKNOWN.to_string()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn known_operating_systems() {
        assert_eq!(
            OperatingSystem::from_name("linux").unwrap(),
            OperatingSystem::Linux
        );
        assert_eq!(
            OperatingSystem::from_name("Windows").unwrap(),
            OperatingSystem::Windows
        );
        assert!(matches!(
            OperatingSystem::from_name("macos"),
            Err(BenchError::UnsupportedOs(ref os)) if os == "macos"
        ));
    }

    #[test]
    fn windows_paths_are_prefixed() {
        assert_eq!(
            OperatingSystem::Linux.default_runtime_path(),
            PathBuf::from("/usr/share/openalpr/runtime_data")
        );
        assert_eq!(
            OperatingSystem::Windows.default_config_path(),
            PathBuf::from("C:/OpenALPR/Agent/usr/share/openalpr/config/openalpr.defaults.conf")
        );
    }

    #[test]
    fn trademarks_are_stripped() {
        assert_eq!(
            strip_trademarks("Intel(R) Xeon(R) Platinum 8124M CPU @ 3.00GHz"),
            "Intel Xeon Platinum 8124M CPU @ 3.00GHz"
        );
        assert_eq!(
            strip_trademarks(" Intel(R) Core(TM) i7-8700 "),
            "Intel Core i7-8700"
        );
        assert_eq!(strip_trademarks("AMD EPYC 7571"), "AMD EPYC 7571");
    }

    #[test]
    fn cpu_model_is_never_empty() {
        assert!(!cpu_model().is_empty());
        assert!(logical_cpus() >= 1);
    }

    #[test]
    fn unreachable_metadata_reports_unknown() {
        let instance = instance_type_from(
            "http://127.0.0.1:9/latest/meta-data/instance-type",
            Duration::from_millis(500),
        );
        assert_eq!(instance, UNKNOWN);
    }
}
