use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::BTreeSet;

/// One entry of `git log`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    /// Abbreviated (8 character) commit hash
    pub hash: String,
    pub author: String,
    /// Author date; None when git printed something unparseable
    pub date: Option<DateTime<FixedOffset>>,
    /// Subject line
    pub message: String,
    pub changed_files: BTreeSet<String>,
}

/// Static summary of version-control state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositorySnapshot {
    pub repo_path: String,
    pub current_branch: String,
    /// Abbreviated HEAD hash, or "unknown" for a repository without commits
    pub last_commit: String,
    pub recent_commits: Vec<CommitInfo>,
}

impl RepositorySnapshot {
    /// Placeholder used where no repository information is available.
    pub fn unknown(repo_path: &str) -> RepositorySnapshot {
        RepositorySnapshot {
            repo_path: repo_path.to_string(),
            current_branch: "unknown".to_string(),
            last_commit: "unknown".to_string(),
            recent_commits: Vec::new(),
        }
    }
}
