//! `aws ec2 run-instances` invocation and response parsing

use crate::catalog::{InstanceSpec, SetupVersion};
use crate::error::{LaunchError, LaunchResult};
use serde::Deserialize;
use std::process::Command;
use tracing::{info, warn};

/// Parameters shared by every launch in one invocation.
#[derive(Debug, Clone)]
pub struct LaunchTemplate {
    pub ami: String,
    pub key: String,
    pub version: SetupVersion,
    pub security_group: String,
}

impl LaunchTemplate {
    /// Arguments after `aws` for launching one instance of `spec`.
    pub fn args(&self, spec: &InstanceSpec) -> Vec<String> {
        [
            "ec2",
            "run-instances",
            "--image-id",
            self.ami.as_str(),
            "--instance-type",
            spec.name,
            "--key-name",
            self.key.as_str(),
            "--user-data",
            self.version.user_data(),
            "--security-group-ids",
            self.security_group.as_str(),
            "--instance-initiated-shutdown-behavior",
            "terminate",
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    }
}

/// Something that can start one instance and report its id.
pub trait Ec2Launcher {
    fn run_instance(&self, args: &[String]) -> LaunchResult<String>;
}

/// Shells out to the AWS CLI.
pub struct AwsCli {
    program: String,
}

impl AwsCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Ec2Launcher for AwsCli {
    fn run_instance(&self, args: &[String]) -> LaunchResult<String> {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| LaunchError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(LaunchError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        parse_instance_id(&output.stdout)
    }
}

#[derive(Deserialize)]
struct RunInstancesResponse {
    #[serde(rename = "Instances")]
    instances: Vec<LaunchedInstance>,
}

#[derive(Deserialize)]
struct LaunchedInstance {
    #[serde(rename = "InstanceId")]
    instance_id: String,
}

/// `Instances[0].InstanceId` from a run-instances JSON response.
pub fn parse_instance_id(stdout: &[u8]) -> LaunchResult<String> {
    let response: RunInstancesResponse = serde_json::from_slice(stdout)?;
    response
        .instances
        .into_iter()
        .next()
        .map(|instance| instance.instance_id)
        .ok_or_else(|| LaunchError::MalformedResponse("no instances in response".to_string()))
}

#[derive(Debug, Default)]
pub struct LaunchSummary {
    /// (instance type, instance id)
    pub launched: Vec<(String, String)>,
    /// (instance type, failure)
    pub failed: Vec<(String, String)>,
}

/// Launch one instance per spec, carrying on past individual failures.
pub fn launch_all(
    launcher: &dyn Ec2Launcher,
    template: &LaunchTemplate,
    specs: &[&InstanceSpec],
) -> LaunchSummary {
    let mut summary = LaunchSummary::default();
    for spec in specs {
        match launcher.run_instance(&template.args(spec)) {
            Ok(id) => {
                info!(instance_type = spec.name, cores = spec.cores, cpu = spec.cpu, %id, "launched");
                summary.launched.push((spec.name.to_string(), id));
            }
            Err(e) => {
                warn!(instance_type = spec.name, error = %e, "launch failed, continuing");
                summary.failed.push((spec.name.to_string(), e.to_string()));
            }
        }
    }
    summary
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::lookup;
    use std::cell::RefCell;

    fn template() -> LaunchTemplate {
        LaunchTemplate {
            ami: "ami-024a64a6685d05041".to_string(),
            key: "bench".to_string(),
            version: SetupVersion::Ga,
            security_group: "sg-01463e7f4849905ee".to_string(),
        }
    }

    struct FakeLauncher {
        calls: RefCell<Vec<Vec<String>>>,
        fail_type: &'static str,
    }

    impl Ec2Launcher for FakeLauncher {
        fn run_instance(&self, args: &[String]) -> LaunchResult<String> {
            self.calls.borrow_mut().push(args.to_vec());
            if args.iter().any(|a| a == self.fail_type) {
                return Err(LaunchError::CommandFailed {
                    status: "exit status: 255".to_string(),
                    stderr: "InsufficientInstanceCapacity".to_string(),
                });
            }
            Ok(format!("i-{:04}", self.calls.borrow().len()))
        }
    }

    #[test]
    fn args_request_terminate_on_shutdown() {
        let args = template().args(lookup("t3.large").unwrap());
        let joined = args.join(" ");
        assert!(joined.starts_with("ec2 run-instances --image-id ami-024a64a6685d05041"));
        assert!(joined.contains("--instance-type t3.large"));
        assert!(joined.contains("--user-data file://aws_setup_ga.sh"));
        assert!(joined.ends_with("--instance-initiated-shutdown-behavior terminate"));
    }

    #[test]
    fn instance_id_is_parsed_from_response() {
        let body = br#"{"Groups": [], "Instances": [{"InstanceId": "i-0abc123", "InstanceType": "t3.large"}]}"#;
        assert_eq!(parse_instance_id(body).unwrap(), "i-0abc123");
        assert!(matches!(
            parse_instance_id(br#"{"Instances": []}"#),
            Err(LaunchError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_instance_id(b"not json"),
            Err(LaunchError::Json(_))
        ));
    }

    #[test]
    fn failures_do_not_stop_remaining_launches() {
        let launcher = FakeLauncher {
            calls: RefCell::new(Vec::new()),
            fail_type: "c4.large",
        };
        let specs = [
            lookup("c5.9xlarge").unwrap(),
            lookup("c4.large").unwrap(),
            lookup("z1d.large").unwrap(),
        ];

        let summary = launch_all(&launcher, &template(), &specs);

        assert_eq!(launcher.calls.borrow().len(), 3);
        assert_eq!(summary.launched.len(), 2);
        assert_eq!(summary.launched[1].0, "z1d.large");
        assert_eq!(summary.failed[0].0, "c4.large");
    }

    #[test]
    fn missing_cli_is_a_spawn_failure() {
        let cli = AwsCli::new("definitely-not-the-aws-cli");
        let err = cli.run_instance(&[]).unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
    }
}
