//! Launch EC2 instances that run the speed benchmark from their boot script.
//!
//! Each instance installs OpenALPR, runs the benchmark and shuts itself down;
//! instances are created with terminate-on-shutdown so nothing is left running.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod aws;
mod catalog;
mod error;

use aws::{AwsCli, LaunchTemplate, launch_all};
use catalog::SetupVersion;
use error::LaunchError;

#[derive(Parser, Debug)]
#[command(name = "launch-instances")]
#[command(about = "Benchmark OpenALPR speed on AWS instances", long_about = None)]
struct Args {
    /// Image for instances
    #[arg(short, long, default_value = "ami-024a64a6685d05041")]
    ami: String,

    /// Name of key pair for SSH access
    #[arg(short, long, default_value = "aklinke")]
    key: String,

    /// Either GA or latest OpenALPR
    #[arg(short, long)]
    version: String,

    /// Security group for the instances
    #[arg(long, default_value = "sg-01463e7f4849905ee")]
    security_group: String,

    /// Instance type to launch (repeatable; defaults to the whole catalog)
    #[arg(short = 't', long = "instance-type")]
    instance_types: Vec<String>,

    /// AWS CLI executable
    #[arg(long, default_value = "aws")]
    aws_cli: String,

    /// Print the commands without running them
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    match run(&Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            if e
                .downcast_ref::<LaunchError>()
                .is_some_and(LaunchError::is_configuration)
            {
                let names: Vec<&str> = catalog::CATALOG.iter().map(|spec| spec.name).collect();
                eprintln!("known instance types: {}", names.join(", "));
            }
            ExitCode::FAILURE
        }
    }
}

/// Returns whether at least one launch succeeded.
fn run(args: &Args) -> Result<bool> {
    // Reject bad arguments before anything is launched
    let version: SetupVersion = args.version.parse()?;
    let specs = catalog::select(&args.instance_types)?;
    let template = LaunchTemplate {
        ami: args.ami.clone(),
        key: args.key.clone(),
        version,
        security_group: args.security_group.clone(),
    };

    if args.dry_run {
        for spec in &specs {
            println!("{} {}", args.aws_cli, template.args(spec).join(" "));
        }
        return Ok(true);
    }

    tracing::info!(count = specs.len(), %version, "launching instances");
    let summary = launch_all(&AwsCli::new(args.aws_cli.as_str()), &template, &specs);
    for (instance_type, id) in &summary.launched {
        println!("{instance_type}\t{id}");
    }
    if !summary.failed.is_empty() {
        tracing::warn!(
            failed = summary.failed.len(),
            launched = summary.launched.len(),
            "some instances failed to launch"
        );
    }
    Ok(!summary.launched.is_empty())
}
