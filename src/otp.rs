//! One-time password acquisition.
//!
//! The OTP is either given directly on the command line or read from a
//! 1Password item. The 1Password path asks for the master password through an
//! askpass helper, signs in with `op signin --raw` to get a session token and
//! then reads the item's TOTP field with that token.

use std::io;

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{debug, warn};
use serde::Deserialize;

use crate::{
    error::AppError,
    process::{ProcessOutput, ProcessRunner},
};

const OP: &str = "op";

/// Where the one-time password comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpSource {
    /// Code typed by the user, used verbatim.
    Literal(String),
    /// TOTP field of a 1Password item.
    OnePassword {
        item: String,
        account: Option<String>,
    },
}

/// Output shape requested from `op item get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OtpFormat {
    /// `--field type=otp --format json`, reading the `totp` member.
    Json,
    /// `--otp`, which prints the bare code.
    Plain,
}

#[derive(Deserialize)]
struct OtpField {
    totp: String,
}

pub struct OtpResolver<'a, R> {
    runner: &'a R,
    askpass: &'a str,
    format: OtpFormat,
}

impl<'a, R: ProcessRunner> OtpResolver<'a, R> {
    pub fn new(runner: &'a R, askpass: &'a str, format: OtpFormat) -> Self {
        Self { runner, askpass, format }
    }

    pub fn resolve(&self, source: &OtpSource) -> Result<String> {
        match source {
            OtpSource::Literal(otp) => Ok(otp.clone()),
            OtpSource::OnePassword { item, account } => {
                let password = self.master_password()?;
                let session = self.signin(account.as_deref(), &password)?;
                let otp = self.item_otp(item, account.as_deref(), &session)?;
                if otp.len() != 6 || !otp.chars().all(|c| c.is_ascii_digit()) {
                    warn!("1Password returned an OTP that is not 6 digits");
                }
                Ok(otp)
            }
        }
    }

    fn master_password(&self) -> Result<String> {
        if !self.runner.is_installed(self.askpass) {
            return Err(AppError::MissingDependency { program: self.askpass.to_string() }.into());
        }
        let output = self
            .runner
            .run(self.askpass, &[""], None)
            .with_context(|| format!("Failed to run {}", self.askpass))?;
        if !output.success() {
            return Err(AppError::Authentication {
                message: format!("{} did not return a password", self.askpass),
                hint: "Run it manually to check that it can prompt, then try again.".into(),
            }
            .into());
        }
        Ok(output.stdout)
    }

    fn signin(&self, account: Option<&str>, password: &str) -> Result<String> {
        let mut args = vec!["signin", "--raw"];
        if let Some(account) = account {
            args.extend(["--account", account]);
        }
        let output = self.op(&args, Some(password))?;
        if !output.success() || output.stdout.trim().is_empty() {
            debug!("op signin failed: {}", output.stderr);
            let manual = match account {
                Some(account) => format!("op signin --account {account}"),
                None => "op signin".to_string(),
            };
            return Err(AppError::Authentication {
                message: "Failed to login to 1Password (incorrect password?)".into(),
                hint: format!("Please run '{manual}' to verify that you can login, then try again."),
            }
            .into());
        }
        Ok(output.stdout.trim().to_string())
    }

    fn item_otp(&self, item: &str, account: Option<&str>, session: &str) -> Result<String> {
        let mut args = vec!["item", "get", item];
        match self.format {
            OtpFormat::Json => args.extend(["--field", "type=otp", "--format", "json"]),
            OtpFormat::Plain => args.push("--otp"),
        }
        if let Some(account) = account {
            args.extend(["--account", account]);
        }
        args.extend(["--session", session]);

        let output = self.op(&args, None)?;
        if !output.success() {
            return Err(AppError::PasswordManager(format!(
                "'op item get {item}' failed: {}",
                output.stderr
            ))
            .into());
        }

        let otp = match self.format {
            OtpFormat::Json => parse_json_otp(&output.stdout)?,
            OtpFormat::Plain => output.stdout.trim().to_string(),
        };
        if otp.is_empty() {
            return Err(AppError::PasswordManager(format!("item '{item}' has no OTP field")).into());
        }
        Ok(otp)
    }

    fn op(&self, args: &[&str], input: Option<&str>) -> Result<ProcessOutput> {
        match self.runner.run(OP, args, input) {
            Ok(output) => Ok(output),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(AppError::MissingDependency { program: OP.into() }.into())
            }
            Err(e) => Err(e).context("Failed to run the 1Password CLI"),
        }
    }
}

fn parse_json_otp(stdout: &str) -> Result<String> {
    let field: OtpField = serde_json::from_str(stdout)
        .map_err(|e| AppError::PasswordManager(format!("unexpected JSON from op: {e}")))?;
    Ok(field.totp.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::exit_code_of, testing::FakeRunner};

    fn one_password(item: &str) -> OtpSource {
        OtpSource::OnePassword { item: item.into(), account: None }
    }

    #[test]
    fn literal_otp_makes_no_calls() {
        let runner = FakeRunner::default();
        let otp = OtpResolver::new(&runner, "ssh-askpass", OtpFormat::Json)
            .resolve(&OtpSource::Literal("123456".into()))
            .unwrap();
        assert_eq!(otp, "123456");
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn missing_askpass_exits_2_without_calling_op() {
        let runner = FakeRunner::default().respond("which", 1, "");
        let err = OtpResolver::new(&runner, "ssh-askpass", OtpFormat::Json)
            .resolve(&one_password("aws"))
            .unwrap_err();

        assert_eq!(exit_code_of(&err), 2);
        assert!(runner.calls().iter().all(|call| call.program != "op"));
    }

    #[test]
    fn json_mode_reads_totp_field() {
        let runner = FakeRunner::default()
            .respond("which", 0, "/usr/bin/ssh-askpass")
            .respond("ssh-askpass", 0, "hunter2")
            .respond("op", 0, "session-token")
            .respond("op", 0, r#"{"id":"x","type":"OTP","label":"one-time password","value":"otpauth://totp/aws?secret=ABC","totp":"654321"}"#);

        let otp = OtpResolver::new(&runner, "ssh-askpass", OtpFormat::Json)
            .resolve(&one_password("aws"))
            .unwrap();
        assert_eq!(otp, "654321");

        let calls = runner.calls();
        let signin = &calls[2];
        assert_eq!(signin.args, ["signin", "--raw"]);
        assert_eq!(signin.input.as_deref(), Some("hunter2"));
        let get = &calls[3];
        assert_eq!(
            get.args,
            ["item", "get", "aws", "--field", "type=otp", "--format", "json", "--session", "session-token"]
        );
    }

    #[test]
    fn plain_mode_passes_account_and_trims() {
        let runner = FakeRunner::default()
            .respond("which", 0, "")
            .respond("ssh-askpass", 0, "pw")
            .respond("op", 0, "tok\n")
            .respond("op", 0, "  112233 \n");

        let source = OtpSource::OnePassword { item: "aws".into(), account: Some("work".into()) };
        let otp = OtpResolver::new(&runner, "ssh-askpass", OtpFormat::Plain)
            .resolve(&source)
            .unwrap();
        assert_eq!(otp, "112233");

        let calls = runner.calls();
        assert_eq!(calls[2].args, ["signin", "--raw", "--account", "work"]);
        assert_eq!(
            calls[3].args,
            ["item", "get", "aws", "--otp", "--account", "work", "--session", "tok"]
        );
    }

    #[test]
    fn rejected_signin_exits_3_with_hint() {
        let runner = FakeRunner::default()
            .respond("which", 0, "")
            .respond("ssh-askpass", 0, "wrong")
            .respond("op", 1, "");

        let err = OtpResolver::new(&runner, "ssh-askpass", OtpFormat::Json)
            .resolve(&one_password("aws"))
            .unwrap_err();

        assert_eq!(exit_code_of(&err), 3);
        let app = err.downcast_ref::<AppError>().unwrap();
        assert!(app.hint().unwrap().contains("op signin"));
        // no item lookup after a failed sign-in
        assert_eq!(runner.calls().len(), 3);
    }

    #[test]
    fn malformed_json_is_a_password_manager_error() {
        let runner = FakeRunner::default()
            .respond("which", 0, "")
            .respond("ssh-askpass", 0, "pw")
            .respond("op", 0, "tok")
            .respond("op", 0, "not json");

        let err = OtpResolver::new(&runner, "ssh-askpass", OtpFormat::Json)
            .resolve(&one_password("aws"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::PasswordManager(_))
        ));
    }

    #[test]
    fn missing_op_binary_is_a_missing_dependency() {
        let runner = FakeRunner::default()
            .respond("which", 0, "")
            .respond("ssh-askpass", 0, "pw")
            .not_found("op");

        let err = OtpResolver::new(&runner, "ssh-askpass", OtpFormat::Json)
            .resolve(&one_password("aws"))
            .unwrap_err();
        assert_eq!(exit_code_of(&err), 2);
    }
}
