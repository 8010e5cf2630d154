//! Command-line interface definitions.

use std::path::PathBuf;

use clap::Parser;

use crate::{mfa::MfaStrategy, otp::OtpFormat};

/// Longest session STS will issue for an IAM user, in hours.
pub const MAX_DURATION_HOURS: f64 = 36.0;

/// AWS MFA session profile writer.
///
/// Exchanges a one-time password for temporary credentials of BASE_PROFILE and
/// writes them to the `[BASE_PROFILE-mfa]` profile of the credentials file.
/// The one-time password is given with --otp or read from 1Password with
/// --op-item.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// The AWS CLI profile to authenticate
    #[arg(env = "AWS_PROFILE")]
    pub base_profile: String,

    /// The AWS CLI credentials file to update [default: ~/.aws/credentials]
    #[arg(
        long,
        visible_alias = "aws-credentials-file",
        env = "AWS_SHARED_CREDENTIALS_FILE"
    )]
    pub credentials_file: Option<PathBuf>,

    /// Number of hours the MFA session should be valid for (0-36)
    #[arg(short, long, default_value = "12", value_parser = parse_duration_hours)]
    pub duration: f64,

    /// Name or UUID of the 1Password item to get a one-time password from
    #[arg(long, visible_alias = "op-uuid", conflicts_with = "otp")]
    pub op_item: Option<String>,

    /// 1Password account to sign in to
    #[arg(long, env = "AWS_MFA_OP_ACCOUNT")]
    pub op_account: Option<String>,

    /// How the one-time password is read from the 1Password CLI
    #[arg(long, value_enum, env = "AWS_MFA_OP_FORMAT", default_value_t = OtpFormat::Json)]
    pub op_format: OtpFormat,

    /// Helper program that prompts for the 1Password master password
    #[arg(long, env = "AWS_MFA_ASKPASS", default_value = "ssh-askpass")]
    pub askpass: String,

    /// A one-time password from your MFA device
    #[arg(short = 'p', long)]
    pub otp: Option<String>,

    /// Name of the MFA device to use [default: first device listed]
    #[arg(short, long)]
    pub mfa_device: Option<String>,

    /// How the MFA device serial number is found
    #[arg(long, value_enum, env = "AWS_MFA_STRATEGY", default_value_t = MfaStrategy::List)]
    pub mfa_strategy: MfaStrategy,
}

fn parse_duration_hours(s: &str) -> Result<f64, String> {
    let hours: f64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if !(0.0..=MAX_DURATION_HOURS).contains(&hours) {
        return Err(format!("{hours} is not in the range 0-{MAX_DURATION_HOURS}"));
    }
    Ok(hours)
}
