//! MFA session profile updater.
//!
//! Runs the whole exchange in order, each step feeding the next:
//!
//! 1. get a one-time password, either the one given or one read from 1Password
//! 2. resolve the serial number of the MFA device it belongs to
//! 3. trade both for temporary credentials with STS `GetSessionToken`
//! 4. write them to the `[<profile>-mfa]` profile of the credentials file
//!
//! The credentials file is only touched once STS has answered, so a failure
//! at any earlier step leaves it unchanged.
//!
//! ## File Format
//!
//! ```ini
//! [work]
//! aws_access_key_id=AKIA...                  # long-term key, left untouched
//! aws_secret_access_key=...
//!
//! [work-mfa]
//! aws_access_key_id=ASIA...                  # temporary access key
//! aws_secret_access_key=...
//! aws_session_token=...
//! aws_session_expiration=2026-10-18T12:00:00Z
//! ```

use anyhow::Result;
use log::info;

use crate::{
    config::Config,
    credentials::AwsApi,
    credentials_file::CredentialsFile,
    mfa,
    otp::OtpResolver,
    process::ProcessRunner,
};

/// Runs one MFA session refresh for a validated [`Config`].
///
/// `R` runs the askpass helper and the 1Password CLI, `C` talks to IAM and
/// STS. Both are traits so a run can be driven without real processes or an
/// AWS account.
pub struct AwsMfaUpdater<R, C> {
    /// Validated run configuration
    config: Config,
    /// Runner for `ssh-askpass` and `op`
    runner: R,
    /// IAM and STS access as the base profile
    client: C,
}

impl<R: ProcessRunner, C: AwsApi> AwsMfaUpdater<R, C> {
    /// Creates an updater; nothing is run or contacted until
    /// [`update_credentials`](Self::update_credentials).
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration from [`Config::from_args`]
    /// * `runner` - Process runner used for the askpass helper and `op`
    /// * `client` - AWS access authenticated as the base profile
    pub fn new(config: Config, runner: R, client: C) -> Self {
        Self { config, runner, client }
    }

    /// Refreshes the `[<profile>-mfa]` profile and returns its name.
    ///
    /// Steps run strictly in order and stop at the first failure:
    /// 1. Obtains the one-time password, verbatim or from 1Password
    /// 2. Resolves the MFA serial number by listing devices or from the caller ARN
    /// 3. Requests a session of `duration_seconds` from STS `GetSessionToken`
    /// 4. Writes the four session keys into the credentials file
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Name of the profile that was written, e.g. `work-mfa`
    /// * `Err(anyhow::Error)` - The run failed; an [`AppError`](crate::error::AppError)
    ///   inside carries the exit code
    ///
    /// # Errors
    ///
    /// * `MissingDependency` - The askpass helper or `op` is not installed
    /// * `Authentication` - 1Password sign-in or STS rejected the credentials
    /// * `NoMfaDevice` / `UnknownMfaDevice` - No device matched the selection
    /// * I/O errors while rewriting the credentials file
    ///
    /// The credentials file is only touched after STS has answered, so every
    /// failure before step 4 leaves it unchanged.
    pub async fn update_credentials(&self) -> Result<String> {
        let otp = OtpResolver::new(&self.runner, &self.config.askpass, self.config.otp_format)
            .resolve(&self.config.otp_source)?;
        info!("Acquired OTP");

        let serial = mfa::resolve_serial(&self.client, &self.config.mfa).await?;
        info!("Using MFA device: {serial}");

        info!("Fetching credentials - Duration: {}s", self.config.duration_seconds);
        let session = self
            .client
            .get_session_token(&serial, &otp, self.config.duration_seconds)
            .await?;
        info!("Acquired MFA session from AWS STS");

        let profile = self.config.mfa_profile();
        CredentialsFile::new(&self.config.credentials_path)
            .upsert_section(&profile, &session.to_string())?;
        info!(
            "Successfully updated {} with a new MFA profile: {profile} (expires at {})",
            self.config.credentials_path.display(),
            session.expiration
        );

        Ok(profile)
    }
}
