//! AWS MFA session profile writer
//!
//! Obtains a one-time password, either from the command line or from a
//! 1Password item, exchanges it with AWS STS for temporary MFA-authenticated
//! credentials and writes them to the `[<profile>-mfa]` profile of the AWS
//! credentials file.
//!
//! Exit codes: 0 on success, 1 for invalid input or an unknown MFA device,
//! 2 when the askpass helper is missing, 3 when 1Password or STS rejects the
//! credentials.

use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

mod cli;
mod config;
mod credentials;
mod credentials_file;
mod error;
mod mfa;
mod otp;
mod process;
#[cfg(test)]
mod testing;
mod updater;

use cli::Args;
use config::Config;
use credentials::AwsClient;
use error::{AppError, exit_code_of};
use process::SystemRunner;
use updater::AwsMfaUpdater;

/// Main entry point for the MFA session profile writer.
///
/// This function drives a single run:
/// 1. Initializes logging at INFO level (`RUST_LOG` overrides it)
/// 2. Parses command-line arguments, falling back to environment variables
/// 3. Validates the configuration before any helper program or AWS call
/// 4. Runs the [`AwsMfaUpdater`] pipeline against the real AWS account
///
/// # Returns
/// * `ExitCode::SUCCESS` - The `[<profile>-mfa]` profile was written
/// * `ExitCode` 1 - Invalid arguments, no or unknown MFA device, or any other failure
/// * `ExitCode` 2 - The askpass helper (or the `op` CLI) is not installed
/// * `ExitCode` 3 - 1Password sign-in or AWS STS rejected the credentials
///
/// Errors are logged with `error!`; a remediation hint, when there is one,
/// follows at INFO level.
#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_failure_code(&e));
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            if let Some(hint) = err.downcast_ref::<AppError>().and_then(AppError::hint) {
                info!("{hint}");
            }
            ExitCode::from(exit_code_of(&err))
        }
    }
}

/// Exit code after clap refused the command line.
///
/// `--help` and `--version` succeed; every usage error is a validation error
/// (1) rather than clap's own 2, which is reserved for a missing helper.
fn parse_failure_code(err: &clap::Error) -> u8 {
    if err.use_stderr() { 1 } else { 0 }
}

/// Validates `args` and refreshes the MFA profile.
///
/// # Errors
/// Returns the first failure of the pipeline; see [`AwsMfaUpdater::update_credentials`].
async fn run(args: Args) -> anyhow::Result<()> {
    // validation happens before any helper runs or AWS is contacted
    let config = Config::from_args(args)?;
    let client = AwsClient::for_profile(&config.base_profile).await;

    AwsMfaUpdater::new(config, SystemRunner, client)
        .update_credentials()
        .await?;
    Ok(())
}
