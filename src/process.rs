//! Running external helper programs.

use std::{
    io::{self, Write},
    process::{Command, Stdio},
};

/// Captured result of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs a program to completion, optionally feeding `input` on stdin.
///
/// `Err` means the program could not be started at all; a non-zero exit is
/// reported through [`ProcessOutput::code`].
pub trait ProcessRunner {
    fn run(&self, program: &str, args: &[&str], input: Option<&str>) -> io::Result<ProcessOutput>;

    /// Whether `program` can be found on `PATH`.
    fn is_installed(&self, program: &str) -> bool {
        self.run("which", &[program], None)
            .map(|output| output.success())
            .unwrap_or(false)
    }
}

/// [`ProcessRunner`] backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], input: Option<&str>) -> io::Result<ProcessOutput> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            // a child that exits without reading still has an exit status to report
            match stdin.write_all(input.as_bytes()) {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e),
                _ => {}
            }
            // stdin is dropped here so the child sees EOF
        }

        let output = child.wait_with_output()?;
        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        })
    }
}
