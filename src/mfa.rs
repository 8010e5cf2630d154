//! MFA device resolution.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::ValueEnum;

use crate::{credentials::AwsApi, error::AppError};

/// An MFA device registered to the calling IAM user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfaDevice {
    serial_number: String,
}

impl MfaDevice {
    pub fn new(serial_number: impl Into<String>) -> Self {
        Self { serial_number: serial_number.into() }
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// Trailing path segment of the serial, e.g. `phone` for
    /// `arn:aws:iam::123456789012:mfa/phone`.
    pub fn name(&self) -> &str {
        self.serial_number
            .rsplit('/')
            .next()
            .unwrap_or(&self.serial_number)
    }
}

/// How the serial number passed to STS is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MfaStrategy {
    /// Ask IAM for the user's MFA devices.
    List,
    /// Rewrite the caller's `user/<name>` ARN into `mfa/<name>`.
    Derive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfaSelection {
    pub strategy: MfaStrategy,
    /// Device to pick by name; only meaningful for [`MfaStrategy::List`].
    pub device_name: Option<String>,
}

/// Picks a device by name, or the first listed one when no name is given.
///
/// IAM does not promise any ordering, so "first" is whatever the provider
/// returned first.
pub fn select_device<'a>(devices: &'a [MfaDevice], name: Option<&str>) -> Result<&'a MfaDevice, AppError> {
    let first = devices.first().ok_or(AppError::NoMfaDevice)?;
    let Some(name) = name else {
        return Ok(first);
    };

    let by_name: BTreeMap<&str, &MfaDevice> = devices.iter().map(|d| (d.name(), d)).collect();
    by_name.get(name).copied().ok_or_else(|| AppError::UnknownMfaDevice {
        name: name.to_string(),
        known: devices.iter().map(|d| d.name().to_string()).collect(),
    })
}

/// `arn:aws:iam::123456789012:user/path/alice` -> `arn:aws:iam::123456789012:mfa/path/alice`
pub fn serial_from_identity_arn(arn: &str) -> Result<String, AppError> {
    let (prefix, resource) = arn
        .rsplit_once(':')
        .ok_or_else(|| AppError::Validation(format!("'{arn}' is not an ARN")))?;
    let user = resource.strip_prefix("user/").ok_or_else(|| {
        AppError::Validation(format!(
            "Cannot derive an MFA serial from '{arn}': it is not an IAM user. Use --mfa-strategy list."
        ))
    })?;
    Ok(format!("{prefix}:mfa/{user}"))
}

/// Resolves exactly one MFA serial number for the calling account.
pub async fn resolve_serial<C: AwsApi + ?Sized>(client: &C, selection: &MfaSelection) -> Result<String> {
    match selection.strategy {
        MfaStrategy::List => {
            let devices = client.list_mfa_devices().await?;
            let device = select_device(&devices, selection.device_name.as_deref())?;
            Ok(device.serial_number().to_string())
        }
        MfaStrategy::Derive => {
            let arn = client.caller_arn().await?;
            Ok(serial_from_identity_arn(&arn)?)
        }
    }
}
