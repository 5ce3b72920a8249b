//! Version-control provenance for the running checkout.
//!
//! Shells out to `git` so the bot sees exactly what an operator would see in
//! the same directory. The [`VersionControl`] trait is the seam the registry
//! depends on; [`GitCli`] is the production implementation.

use crate::models::RepositoryCommit;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::process::Command;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from version-control queries.
#[derive(Error, Debug)]
pub enum RepositoryQueryError {
    /// Failed to execute the `git` command.
    #[error("Failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("Git error:\n{output}")]
    Command {
        /// The git invocation that failed (e.g., "git rev-list -1 ...").
        command: String,
        /// Combined stdout and stderr of the failed invocation.
        output: String,
    },

    /// `git` succeeded but printed something we could not parse.
    #[error("Unexpected output from {command}: {output:?}")]
    Malformed { command: String, output: String },
}

pub type RepositoryResult<T> = Result<T, RepositoryQueryError>;

/// Queries the registry needs from version control.
#[cfg_attr(test, mockall::automock)]
pub trait VersionControl: Send + Sync {
    /// Id, author and subject of `HEAD`.
    fn current_commit(&self) -> RepositoryResult<RepositoryCommit>;

    /// Short name of the checked-out branch; empty when `HEAD` is detached.
    fn current_branch(&self) -> RepositoryResult<String>;

    /// URL of the `origin` remote.
    fn remote_origin_url(&self) -> RepositoryResult<String>;
}

/// [`VersionControl`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: Utf8PathBuf,
}

const COMMIT_QUERY: [&str; 4] = ["rev-list", "-1", "--pretty=%H%n%an%n%s", "HEAD"];

impl GitCli {
    /// Run every query inside `workdir`.
    pub fn new<P: AsRef<Utf8Path>>(workdir: P) -> Self {
        Self {
            workdir: workdir.as_ref().to_path_buf(),
        }
    }

    pub fn workdir(&self) -> &Utf8Path {
        &self.workdir
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new("git");
        command.args(args).current_dir(&self.workdir);
        command
    }

    /// Run a query that must succeed, returning its stdout.
    fn run(&self, args: &[&str]) -> RepositoryResult<String> {
        let output = self.command(args).output()?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(RepositoryQueryError::Command {
                command: format!("git {}", args.join(" ")),
                output: combined.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VersionControl for GitCli {
    #[instrument(skip(self), fields(workdir = %self.workdir))]
    fn current_commit(&self) -> RepositoryResult<RepositoryCommit> {
        let output = self.run(&COMMIT_QUERY)?;
        let commit = parse_commit(&output).ok_or_else(|| RepositoryQueryError::Malformed {
            command: format!("git {}", COMMIT_QUERY.join(" ")),
            output: output.clone(),
        })?;
        debug!(commit = %commit.short_id, "current commit");
        Ok(commit)
    }

    #[instrument(skip(self), fields(workdir = %self.workdir))]
    fn current_branch(&self) -> RepositoryResult<String> {
        // Exit status is ignored: -q makes a detached HEAD fail silently
        let output = self
            .command(&["symbolic-ref", "--short", "-q", "HEAD"])
            .output()?;
        let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if branch.is_empty() {
            debug!("detached HEAD");
        } else {
            debug!(%branch, "current branch");
        }
        Ok(branch)
    }

    #[instrument(skip(self), fields(workdir = %self.workdir))]
    fn remote_origin_url(&self) -> RepositoryResult<String> {
        let url = self
            .run(&["config", "--get", "remote.origin.url"])?
            .trim()
            .to_string();
        debug!(%url, "origin remote");
        Ok(url)
    }
}

/// Parse `git rev-list -1 --pretty=%H%n%an%n%s` output.
///
/// The first line is the `commit <id>` header rev-list always prints; the
/// remaining three are id, author and subject. Anything other than exactly
/// four lines is rejected.
pub fn parse_commit(output: &str) -> Option<RepositoryCommit> {
    let lines: Vec<&str> = output.trim().split('\n').collect();
    match lines.as_slice() {
        [_header, full_id, author, message] if !full_id.trim().is_empty() => Some(
            RepositoryCommit::new(full_id.trim(), author.trim_end(), message.trim_end()),
        ),
        _ => None,
    }
}

static GITHUB_HTTPS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/([^/]+)/([^/]+?)(?:\.git)?/?$")
        .expect("GitHub remote pattern is valid")
});

/// Derive `owner/repo` from a `https://github.com/owner/repo(.git)` remote.
///
/// Any other URL shape yields `None`.
pub fn repo_slug_from_url(url: &str) -> Option<String> {
    let captures = GITHUB_HTTPS_URL.captures(url.trim())?;
    Some(format!("{}/{}", &captures[1], &captures[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commit() {
        let output = "commit 0123456789abcdef0123456789abcdef01234567\n\
                      0123456789abcdef0123456789abcdef01234567\n\
                      Jane Doe\n\
                      Blacklist example.com\n";
        let commit = parse_commit(output).unwrap();

        assert_eq!(commit.full_id, "0123456789abcdef0123456789abcdef01234567");
        assert_eq!(commit.short_id, "0123456");
        assert_eq!(commit.author, "Jane Doe");
        assert_eq!(commit.message, "Blacklist example.com");
    }

    #[test]
    fn test_parse_commit_rejects_wrong_line_count() {
        assert!(parse_commit("").is_none());
        assert!(parse_commit("commit abc\nabc\nJane").is_none());
        assert!(parse_commit("commit abc\nabc\nJane\nmsg\nextra").is_none());
    }

    #[test]
    fn test_parse_commit_with_crlf() {
        let output = "commit abcdef0123\r\nabcdef0123\r\nJane\r\nmsg\r\n";
        let commit = parse_commit(output).unwrap();
        assert_eq!(commit.full_id, "abcdef0123");
        assert_eq!(commit.author, "Jane");
        assert_eq!(commit.message, "msg");
    }

    #[test]
    fn test_repo_slug_from_url() {
        assert_eq!(
            repo_slug_from_url("https://github.com/Charcoal-SE/SmokeDetector.git"),
            Some("Charcoal-SE/SmokeDetector".to_string())
        );
        assert_eq!(
            repo_slug_from_url("https://github.com/someone/SmokeDetector\n"),
            Some("someone/SmokeDetector".to_string())
        );
        assert_eq!(repo_slug_from_url("git@github.com:someone/SmokeDetector.git"), None);
        assert_eq!(repo_slug_from_url("https://gitlab.com/someone/SmokeDetector.git"), None);
    }

    #[test]
    fn test_command_error_message_keeps_output() {
        let err = RepositoryQueryError::Command {
            command: "git rev-list".to_string(),
            output: "fatal: not a git repository".to_string(),
        };
        assert_eq!(err.to_string(), "Git error:\nfatal: not a git repository");
    }
}
