use std::fmt;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{
    environment::EnvironmentVariableRegionProvider, meta::region::RegionProviderChain,
    profile::ProfileFileRegionProvider,
};
use aws_sdk_sts::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_smithy_types::date_time::Format;

use crate::{error::AppError, mfa::MfaDevice};

/// Temporary credentials returned by STS `GetSessionToken`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    /// ISO-8601 timestamp, e.g. `2026-10-18T12:00:00Z`.
    pub expiration: String,
}

impl fmt::Display for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "aws_access_key_id={}\naws_secret_access_key={}\naws_session_token={}\naws_session_expiration={}",
            self.access_key_id, self.secret_access_key, self.session_token, self.expiration
        )
    }
}

/// The AWS calls a run needs, so the pipeline can be driven by a fake.
#[async_trait]
pub trait AwsApi: Send + Sync {
    /// MFA devices of the calling IAM user, in provider order.
    async fn list_mfa_devices(&self) -> Result<Vec<MfaDevice>>;

    /// ARN of the calling identity.
    async fn caller_arn(&self) -> Result<String>;

    async fn get_session_token(
        &self,
        serial_number: &str,
        token: &str,
        duration_seconds: i32,
    ) -> Result<SessionCredentials>;
}

/// STS and IAM clients authenticated as the base profile.
#[derive(Clone)]
pub struct AwsClient {
    sts: aws_sdk_sts::Client,
    iam: aws_sdk_iam::Client,
}

impl AwsClient {
    pub async fn for_profile(profile: &str) -> Self {
        let config = aws_config::from_env()
            .profile_name(profile)
            .region(region_provider(profile))
            .load()
            .await;

        Self {
            sts: aws_sdk_sts::Client::new(&config),
            iam: aws_sdk_iam::Client::new(&config),
        }
    }
}

/// `AWS_REGION`, then the profile's region, then `us-east-1`.
///
/// IAM and STS are global, so instance metadata is never asked.
fn region_provider(profile: &str) -> RegionProviderChain {
    RegionProviderChain::first_try(EnvironmentVariableRegionProvider::new())
        .or_else(ProfileFileRegionProvider::builder().profile_name(profile).build())
        .or_else("us-east-1")
}

#[async_trait]
impl AwsApi for AwsClient {
    async fn list_mfa_devices(&self) -> Result<Vec<MfaDevice>> {
        let output = self
            .iam
            .list_mfa_devices()
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{}", aws_sdk_iam::error::DisplayErrorContext(&e)))
            .context("Failed to list MFA devices")?;

        Ok(output
            .mfa_devices()
            .iter()
            .map(|device| MfaDevice::new(device.serial_number()))
            .collect())
    }

    async fn caller_arn(&self) -> Result<String> {
        self.sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{}", DisplayErrorContext(&e)))
            .context("Failed to get caller identity")?
            .arn()
            .map(str::to_string)
            .context("No ARN returned for the caller identity")
    }

    async fn get_session_token(
        &self,
        serial_number: &str,
        token: &str,
        duration_seconds: i32,
    ) -> Result<SessionCredentials> {
        let output = match self
            .sts
            .get_session_token()
            .duration_seconds(duration_seconds)
            .serial_number(serial_number)
            .token_code(token)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some() => {
                let service = e.as_service_error();
                return Err(sts_rejection(
                    service.and_then(|s| s.code()),
                    service.and_then(|s| s.message()),
                )
                .into());
            }
            Err(e) => {
                return Err(anyhow::anyhow!("{}", DisplayErrorContext(&e)))
                    .context("Failed to call AWS STS");
            }
        };

        let credentials = output.credentials().context("No credentials returned")?;
        Ok(SessionCredentials {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
            expiration: credentials.expiration().fmt(Format::DateTime)?,
        })
    }
}

/// Maps a `GetSessionToken` service error to an authentication failure.
///
/// `ValidationError` is what STS answers for an out-of-range duration, every
/// other code is treated as a bad or stale MFA code.
fn sts_rejection(code: Option<&str>, message: Option<&str>) -> AppError {
    let code = code.unwrap_or("Unknown");
    let hint = if code == "ValidationError" {
        "Check --duration: STS issues sessions between 0.25 and 36 hours."
    } else {
        "Check the code and your device clock, then try again with a fresh code."
    };
    AppError::Authentication {
        message: format!(
            "AWS STS refused the session request ({code}): {}",
            message.unwrap_or("no message")
        ),
        hint: hint.into(),
    }
}
