//! In-place update of one section of an AWS credentials file.
//!
//! The file is parsed with `configparser` only to reject content that is not
//! INI. The update itself splices the new section into the raw text, so every
//! other section keeps its exact bytes, comments and spacing included.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use configparser::ini::Ini;
use log::info;
use tempfile::NamedTempFile;

pub struct CredentialsFile {
    path: PathBuf,
}

impl CredentialsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates or fully replaces `[section]` with `body` (`key=value` lines).
    pub fn upsert_section(&self, section: &str, body: &str) -> Result<()> {
        let content = if self.path.exists() {
            fs::read_to_string(&self.path)
                .with_context(|| format!("Failed to read {}", self.path.display()))?
        } else {
            String::new()
        };

        let mut ini = Ini::new_cs();
        ini.read(content.clone())
            .map_err(|e| anyhow!("Failed to load credentials: {e}"))?;
        if ini.sections().iter().any(|s| s == section) {
            info!("Replacing profile [{section}]");
        } else {
            info!("Adding profile [{section}]");
        }

        self.write(&splice_section(&content, section, body))
    }

    /// Writes through a temporary file in the target's directory, then renames
    /// it over the target.
    fn write(&self, content: &str) -> Result<()> {
        // rename would replace a symlink instead of the file it points to
        let target = fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone());
        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        if let Ok(metadata) = fs::metadata(&target) {
            tmp.as_file().set_permissions(metadata.permissions())?;
        }
        tmp.persist(&target)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        Ok(())
    }
}

/// Returns `content` with `[section]` set to exactly `body`.
///
/// Key lines of an existing section are dropped, its blank and comment lines
/// stay where they are. Repeated headers for the same section collapse into
/// the first one. A missing section is appended after a blank line.
pub fn splice_section(content: &str, section: &str, body: &str) -> String {
    let block = format!("[{section}]\n{}\n", body.trim_end_matches('\n'));
    let mut out = String::with_capacity(content.len() + block.len() + 1);
    let mut written = false;
    let mut in_target = false;

    for line in content.split_inclusive('\n') {
        if let Some(name) = section_name(line) {
            in_target = name == section;
            if in_target {
                if !written {
                    out.push_str(&block);
                    written = true;
                }
                continue;
            }
        } else if in_target && !is_blank_or_comment(line) {
            continue;
        }
        out.push_str(line);
    }

    if !written {
        if !out.is_empty() {
            if !out.ends_with('\n') {
                out.push('\n');
            }
            if !out.ends_with("\n\n") {
                out.push('\n');
            }
        }
        out.push_str(&block);
    }
    out
}

/// Name inside a `[header]` line; text after the closing bracket is ignored.
fn section_name(line: &str) -> Option<&str> {
    line.trim_start()
        .strip_prefix('[')?
        .split_once(']')
        .map(|(name, _)| name.trim())
}

fn is_blank_or_comment(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#') || line.starts_with(';')
}
