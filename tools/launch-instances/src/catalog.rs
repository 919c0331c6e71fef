//! Instance types the benchmark is run on

use crate::error::{LaunchError, LaunchResult};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceSpec {
    pub name: &'static str,
    /// Physical cores available to the benchmark
    pub cores: u32,
    pub cpu: &'static str,
}

pub const CATALOG: [InstanceSpec; 9] = [
    InstanceSpec {
        name: "c5.9xlarge",
        cores: 18,
        cpu: "Intel Xeon Platinum 8124M @ 3.0 GHz",
    },
    InstanceSpec {
        name: "c4.large",
        cores: 1,
        cpu: "Intel Xeon E5-2666 v3 @ 2.9 GHz",
    },
    InstanceSpec {
        name: "m5.2xlarge",
        cores: 4,
        cpu: "Intel Xeon Platinum 8175M @ 2.5 GHz",
    },
    InstanceSpec {
        name: "m5.4xlarge",
        cores: 4,
        cpu: "Intel Xeon Platinum 8175M @ 2.5 GHz",
    },
    InstanceSpec {
        name: "t2.large",
        cores: 1,
        cpu: "Intel Xeon E5-2686 v4 @ 2.3 GHz",
    },
    InstanceSpec {
        name: "t3a.large",
        cores: 2,
        cpu: "AMD EPYC 7571 @ 2.2 GHz",
    },
    InstanceSpec {
        name: "t3.large",
        cores: 1,
        cpu: "Intel Xeon Platinum 8175M @ 2.5 GHz",
    },
    InstanceSpec {
        name: "x1e.xlarge",
        cores: 2,
        cpu: "Intel Xeon E7-8880 v3 @ 2.3 GHz",
    },
    InstanceSpec {
        name: "z1d.large",
        cores: 1,
        cpu: "Intel Xeon Platinum 8151 @ 3.4 GHz",
    },
];

/// Catalog entry for `name`.
pub fn lookup(name: &str) -> LaunchResult<&'static InstanceSpec> {
    CATALOG
        .iter()
        .find(|spec| spec.name == name.trim())
        .ok_or_else(|| LaunchError::UnknownInstanceType(name.to_string()))
}

/// Resolve requested names, or the whole catalog when none are given.
pub fn select(names: &[String]) -> LaunchResult<Vec<&'static InstanceSpec>> {
    if names.is_empty() {
        return Ok(CATALOG.iter().collect());
    }
    names.iter().map(|name| lookup(name)).collect()
}

/// Which OpenALPR release the boot script installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupVersion {
    Ga,
    Latest,
}

impl SetupVersion {
    /// User data passed to the instance at launch.
    pub const fn user_data(self) -> &'static str {
        match self {
            Self::Ga => "file://aws_setup_ga.sh",
            Self::Latest => "file://aws_setup_latest.sh",
        }
    }
}

impl FromStr for SetupVersion {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GA" => Ok(Self::Ga),
            "latest" => Ok(Self::Latest),
            other => Err(LaunchError::UnknownVersion(other.to_string())),
        }
    }
}

impl fmt::Display for SetupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ga => "GA",
            Self::Latest => "latest",
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup() {
        let spec = lookup("c5.9xlarge").unwrap();
        assert_eq!(spec.cores, 18);
        assert!(spec.cpu.contains("8124M"));
        assert!(matches!(
            lookup("p3.2xlarge"),
            Err(LaunchError::UnknownInstanceType(_))
        ));
    }

    #[test]
    fn empty_selection_is_whole_catalog() {
        assert_eq!(select(&[]).unwrap().len(), CATALOG.len());
        let picked = select(&["t3.large".to_string(), "z1d.large".to_string()]).unwrap();
        assert_eq!(picked[1].name, "z1d.large");
        assert!(select(&["t3.large".to_string(), "bogus".to_string()]).is_err());
    }

    #[test]
    fn versions_select_setup_script() {
        assert_eq!(
            "GA".parse::<SetupVersion>().unwrap().user_data(),
            "file://aws_setup_ga.sh"
        );
        assert_eq!(
            "latest".parse::<SetupVersion>().unwrap().user_data(),
            "file://aws_setup_latest.sh"
        );
        let err = "beta".parse::<SetupVersion>().unwrap_err();
        assert!(err.is_configuration());
    }
}
