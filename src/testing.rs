//! Fakes for the process and AWS seams.

use std::{
    collections::{HashMap, VecDeque},
    io,
    sync::Mutex,
};

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    credentials::{AwsApi, SessionCredentials},
    error::AppError,
    mfa::MfaDevice,
    process::{ProcessOutput, ProcessRunner},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub input: Option<String>,
}

/// Replays queued responses per program and records every call.
///
/// A program with no queued response behaves as if it were not installed.
#[derive(Default)]
pub struct FakeRunner {
    responses: Mutex<HashMap<String, VecDeque<io::Result<ProcessOutput>>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeRunner {
    pub fn respond(self, program: &str, code: i32, stdout: &str) -> Self {
        self.push(
            program,
            Ok(ProcessOutput { code: Some(code), stdout: stdout.into(), stderr: String::new() }),
        )
    }

    pub fn not_found(self, program: &str) -> Self {
        self.push(program, Err(io::ErrorKind::NotFound.into()))
    }

    fn push(self, program: &str, response: io::Result<ProcessOutput>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(program.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProcessRunner for FakeRunner {
    fn run(&self, program: &str, args: &[&str], input: Option<&str>) -> io::Result<ProcessOutput> {
        self.calls.lock().unwrap().push(Call {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            input: input.map(str::to_string),
        });
        self.responses
            .lock()
            .unwrap()
            .get_mut(program)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(io::ErrorKind::NotFound.into()))
    }
}

/// In-memory AWS account for the user `alice` in account 123456789012.
pub struct FakeAws {
    devices: Vec<MfaDevice>,
    accepted_token: Option<String>,
    session: SessionCredentials,
    session_requests: Mutex<Vec<(String, String, i32)>>,
}

impl FakeAws {
    pub fn with_devices(names: &[&str]) -> Self {
        Self {
            devices: names
                .iter()
                .map(|name| MfaDevice::new(format!("arn:aws:iam::123456789012:mfa/{name}")))
                .collect(),
            accepted_token: None,
            session: session("ASIA1"),
            session_requests: Mutex::new(Vec::new()),
        }
    }

    /// Rejects every token other than `token`.
    pub fn accepting(mut self, token: &str) -> Self {
        self.accepted_token = Some(token.to_string());
        self
    }

    pub fn issuing(mut self, session: SessionCredentials) -> Self {
        self.session = session;
        self
    }

    /// `(serial_number, token, duration_seconds)` of every session request.
    pub fn session_requests(&self) -> Vec<(String, String, i32)> {
        self.session_requests.lock().unwrap().clone()
    }
}

pub fn session(access_key_id: &str) -> SessionCredentials {
    SessionCredentials {
        access_key_id: access_key_id.to_string(),
        secret_access_key: format!("secret-{access_key_id}"),
        session_token: format!("token-{access_key_id}=="),
        expiration: "2026-10-18T12:00:00Z".to_string(),
    }
}

#[async_trait]
impl AwsApi for FakeAws {
    async fn list_mfa_devices(&self) -> Result<Vec<MfaDevice>> {
        Ok(self.devices.clone())
    }

    async fn caller_arn(&self) -> Result<String> {
        Ok("arn:aws:iam::123456789012:user/alice".to_string())
    }

    async fn get_session_token(
        &self,
        serial_number: &str,
        token: &str,
        duration_seconds: i32,
    ) -> Result<SessionCredentials> {
        self.session_requests.lock().unwrap().push((
            serial_number.to_string(),
            token.to_string(),
            duration_seconds,
        ));
        if self.accepted_token.as_deref().is_some_and(|t| t != token) {
            return Err(AppError::Authentication {
                message: "AWS STS rejected the MFA code".into(),
                hint: "try again".into(),
            }
            .into());
        }
        Ok(self.session.clone())
    }
}
