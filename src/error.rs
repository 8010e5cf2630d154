//! Terminal failure conditions and their process exit codes.

use thiserror::Error;

/// Failures that end a run with a specific exit code.
///
/// Anything that is not an `AppError` is treated as a generic failure and
/// exits with code 1.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad or missing command-line input.
    #[error("{0}")]
    Validation(String),
    /// A helper program we shell out to is not installed.
    #[error("Please install '{program}' and try again.")]
    MissingDependency { program: String },
    /// 1Password sign-in or AWS STS rejected the supplied secret.
    #[error("{message}")]
    Authentication { message: String, hint: String },
    #[error("No MFA devices configured for this account found")]
    NoMfaDevice,
    #[error(
        "No MFA device named '{name}' found. List of mfa devices configured: {}",
        .known.join(", ")
    )]
    UnknownMfaDevice { name: String, known: Vec<String> },
    /// The 1Password CLI ran but did not produce a usable one-time password.
    #[error("1Password did not return a one-time password: {0}")]
    PasswordManager(String),
}

impl AppError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::MissingDependency { .. } => 2,
            Self::Authentication { .. } => 3,
            Self::Validation(_)
            | Self::NoMfaDevice
            | Self::UnknownMfaDevice { .. }
            | Self::PasswordManager(_) => 1,
        }
    }

    /// Remediation advice printed after the error itself.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Authentication { hint, .. } => Some(hint),
            _ => None,
        }
    }
}

/// Exit code for an arbitrary error raised during a run.
pub fn exit_code_of(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<AppError>()
        .map(AppError::exit_code)
        .unwrap_or(1)
}
