//! Validated run configuration.

use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
};

use log::warn;

use crate::{
    cli::Args,
    error::AppError,
    mfa::{MfaSelection, MfaStrategy},
    otp::{OtpFormat, OtpSource},
};

/// STS rejects shorter sessions than this.
const MIN_DURATION_SECONDS: i32 = 900;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_profile: String,
    pub credentials_path: PathBuf,
    pub duration_seconds: i32,
    pub otp_source: OtpSource,
    pub otp_format: OtpFormat,
    pub askpass: String,
    pub mfa: MfaSelection,
}

impl Config {
    /// Checks everything that can be checked without running a helper or
    /// calling AWS.
    pub fn from_args(args: Args) -> Result<Self, AppError> {
        let Args {
            base_profile,
            credentials_file,
            duration,
            op_item,
            op_account,
            op_format,
            askpass,
            otp,
            mfa_device,
            mfa_strategy,
        } = args;

        if base_profile.trim().is_empty() {
            return Err(AppError::Validation("The base profile name must not be empty.".into()));
        }

        let otp_source = match (otp, op_item) {
            (Some(otp), None) => OtpSource::Literal(otp),
            (None, Some(item)) => OtpSource::OnePassword { item, account: op_account },
            (Some(_), Some(_)) => {
                return Err(AppError::Validation(
                    "Only one of --otp, --op-item, or --op-uuid may be provided.".into(),
                ));
            }
            (None, None) => {
                return Err(AppError::Validation(
                    "One of --otp, --op-item, or --op-uuid must be provided.".into(),
                ));
            }
        };

        if mfa_strategy == MfaStrategy::Derive && mfa_device.is_some() {
            return Err(AppError::Validation(
                "--mfa-device can only be used with --mfa-strategy list.".into(),
            ));
        }

        let credentials_path = match credentials_file {
            Some(path) => path,
            None => default_credentials_path()?,
        };
        check_read_write(&credentials_path)?;

        let duration_seconds = (duration * 3600.0) as i32;
        if duration_seconds < MIN_DURATION_SECONDS {
            warn!("A session of {duration_seconds}s is shorter than AWS STS allows ({MIN_DURATION_SECONDS}s)");
        }

        Ok(Self {
            base_profile,
            credentials_path,
            duration_seconds,
            otp_source,
            otp_format: op_format,
            askpass,
            mfa: MfaSelection { strategy: mfa_strategy, device_name: mfa_device },
        })
    }

    /// Name of the profile the session credentials are written to.
    pub fn mfa_profile(&self) -> String {
        format!("{}-mfa", self.base_profile)
    }
}

fn default_credentials_path() -> Result<PathBuf, AppError> {
    dirs::home_dir()
        .map(|d| d.join(".aws").join("credentials"))
        .ok_or_else(|| AppError::Validation("Could not determine home directory".into()))
}

fn check_read_write(path: &Path) -> Result<(), AppError> {
    if !path.is_file() {
        return Err(AppError::Validation(format!(
            "Credentials file '{}' does not exist.",
            path.display()
        )));
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map(drop)
        .map_err(|e| {
            AppError::Validation(format!(
                "Credentials file '{}' is not readable and writable: {e}",
                path.display()
            ))
        })
}
