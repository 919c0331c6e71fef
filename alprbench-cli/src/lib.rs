//! Settings, argument handling and terminal output for the `alprbench` binary.

pub mod cli;
pub mod config;
pub mod output;

use alprbench_core::BenchError;

/// Exit status when the run was interrupted with Ctrl-C.
pub const EXIT_CANCELLED: u8 = 130;

/// Process exit status for a failed run: the benchmark error's own code when
/// there is one, 1 otherwise.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<BenchError>())
        .map_or(1, BenchError::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn batch_unsupported_maps_to_three_through_context() {
        let err: anyhow::Result<()> = Err(BenchError::BatchUnsupported {
            version: "2.8.1".to_string(),
        })
        .context("benchmark failed");
        assert_eq!(err.map_err(|e| exit_code(&e)), Err(3));
    }

    #[test]
    fn other_errors_map_to_one() {
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), 1);
        assert_eq!(
            exit_code(&BenchError::InvalidResolution("8k".to_string()).into()),
            1
        );
    }
}
