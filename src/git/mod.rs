pub mod types;

pub use types::{CommitInfo, RepositorySnapshot};

use chrono::DateTime;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

const RECORD_SEPARATOR: char = '\u{1e}';
const FIELD_SEPARATOR: char = '\u{1f}';
const SHORT_HASH_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("No git repository found at {0}")]
    RepositoryNotFound(PathBuf),

    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },
}

/// Thin wrapper around the `git` binary for one working tree.
#[derive(Debug, Clone)]
pub struct GitClient {
    repo_path: PathBuf,
}

impl GitClient {
    /// Open the repository at `path`.
    ///
    /// Fails with `GitError::RepositoryNotFound` when the path does not exist,
    /// is not inside a work tree, or git itself cannot be run.
    #[instrument(fields(path = %path.display()))]
    pub async fn open(path: &Path) -> Result<GitClient, GitError> {
        if !path.is_dir() {
            return Err(GitError::RepositoryNotFound(path.to_path_buf()));
        }
        let client = GitClient {
            repo_path: path.to_path_buf(),
        };
        match client.run(&["rev-parse", "--is-inside-work-tree"]).await {
            Ok(out) if out.trim() == "true" => Ok(client),
            Ok(_) => Err(GitError::RepositoryNotFound(path.to_path_buf())),
            Err(e) => {
                debug!(error = %e, "git rev-parse failed");
                Err(GitError::RepositoryNotFound(path.to_path_buf()))
            }
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Current branch, HEAD and the `n` most recent commits.
    ///
    /// A detached HEAD or a repository without commits yields "unknown"
    /// rather than an error.
    #[instrument(skip(self), fields(repo = %self.repo_path.display()))]
    pub async fn snapshot(&self, n: usize) -> Result<RepositorySnapshot, GitError> {
        let mut snapshot = RepositorySnapshot::unknown(&self.repo_path.display().to_string());

        if let Ok(branch) = self.run(&["branch", "--show-current"]).await {
            let branch = branch.trim();
            if !branch.is_empty() {
                snapshot.current_branch = branch.to_string();
            }
        }

        match self.run(&["rev-parse", "HEAD"]).await {
            Ok(head) => snapshot.last_commit = short_hash(head.trim()),
            Err(e) => {
                debug!(error = %e, "no HEAD commit");
                return Ok(snapshot);
            }
        }

        snapshot.recent_commits = self.recent_commits(n).await?;
        debug!(branch = %snapshot.current_branch, head = %snapshot.last_commit, commits = snapshot.recent_commits.len(), "repository snapshot");
        Ok(snapshot)
    }

    /// The `n` most recent commits with the files each one touched.
    #[instrument(skip(self), fields(repo = %self.repo_path.display()))]
    pub async fn recent_commits(&self, n: usize) -> Result<Vec<CommitInfo>, GitError> {
        let count = format!("-n{n}");
        let format = format!("--pretty=format:{RECORD_SEPARATOR}%H{FIELD_SEPARATOR}%an{FIELD_SEPARATOR}%aI{FIELD_SEPARATOR}%s");
        let output = self.run(&["log", &count, &format, "--name-only"]).await?;
        Ok(parse_log(&output))
    }

    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_path)
            .args(args)
            .output()
            .await?;

        if !output.status.success() {
            return Err(GitError::Command {
                command: args.first().copied().unwrap_or_default().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parse the output of `git log --name-only` produced with the
/// record/field separated pretty format used by `recent_commits`.
pub fn parse_log(output: &str) -> Vec<CommitInfo> {
    output
        .split(RECORD_SEPARATOR)
        .filter(|record| !record.trim().is_empty())
        .filter_map(|record| {
            let mut lines = record.lines();
            let header = lines.next()?;
            let fields: Vec<&str> = header.splitn(4, FIELD_SEPARATOR).collect();
            if fields.len() != 4 {
                warn!(header, "skipping malformed git log record");
                return None;
            }

            Some(CommitInfo {
                hash: short_hash(fields[0]),
                author: fields[1].to_string(),
                date: DateTime::parse_from_rfc3339(fields[2].trim()).ok(),
                message: fields[3].to_string(),
                changed_files: lines
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect(),
            })
        })
        .collect()
}

fn short_hash(hash: &str) -> String {
    hash.chars().take(SHORT_HASH_LEN).collect()
}
