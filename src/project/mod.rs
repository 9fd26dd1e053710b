pub mod types;

pub use types::{ProjectSnapshot, SourceFile};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use walkdir::{DirEntry, WalkDir};

/// Directories never descended into while scanning.
const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".venv",
    "venv",
    "env",
    "__pycache__",
    "target",
    "node_modules",
];

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Project root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Compile include patterns into a matcher. `*` does not cross `/`.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet, ProjectError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| ProjectError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ProjectError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}

/// Walk `root` and return every file matching one of `include_patterns`,
/// with its line count. Results are sorted by path.
#[instrument(skip(include_patterns), fields(root = %root.display()))]
pub fn collect_files(root: &Path, include_patterns: &[String]) -> Result<Vec<SourceFile>, ProjectError> {
    let matcher = build_globset(include_patterns)?;
    let mut files = Vec::new();

    for (relative, path) in matching_paths(root, &matcher)? {
        match fs::read_to_string(&path) {
            Ok(content) => files.push(SourceFile {
                path: relative,
                lines: content.lines().count(),
            }),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
        }
    }

    debug!(files = files.len(), "collected project files");
    Ok(files)
}

/// Read the content of every file matching `patterns`, keyed by relative path.
/// Each file is cut to at most `max_bytes` (on a char boundary).
#[instrument(skip(patterns), fields(root = %root.display()))]
pub fn read_key_files(
    root: &Path,
    patterns: &[String],
    max_bytes: usize,
) -> Result<BTreeMap<String, String>, ProjectError> {
    let matcher = build_globset(patterns)?;
    let mut contents = BTreeMap::new();

    for (relative, path) in matching_paths(root, &matcher)? {
        match fs::read_to_string(&path) {
            Ok(content) => {
                contents.insert(relative, truncate_to(content, max_bytes));
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable key file"),
        }
    }

    debug!(key_files = contents.len(), "read key files");
    Ok(contents)
}

/// Read one source file, cut to at most `max_bytes`.
pub fn read_source(path: &Path, max_bytes: usize) -> Result<String, ProjectError> {
    let content = fs::read_to_string(path).map_err(|source| ProjectError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(truncate_to(content, max_bytes))
}

/// Resolve a single glob against the project tree.
pub fn find_files(root: &Path, pattern: &str) -> Result<Vec<(String, PathBuf)>, ProjectError> {
    let matcher = build_globset(&[pattern.to_string()])?;
    matching_paths(root, &matcher)
}

/// Find a file by relative path or by file stem (first match in path order).
pub fn find_by_name(root: &Path, include_patterns: &[String], name: &str) -> Result<Option<(String, PathBuf)>, ProjectError> {
    let direct = root.join(name);
    if direct.is_file() {
        return Ok(Some((name.to_string(), direct)));
    }

    let matcher = build_globset(include_patterns)?;
    Ok(matching_paths(root, &matcher)?
        .into_iter()
        .find(|(_, path)| path.file_stem().and_then(|s| s.to_str()) == Some(name)))
}

fn matching_paths(root: &Path, matcher: &GlobSet) -> Result<Vec<(String, PathBuf)>, ProjectError> {
    if !root.is_dir() {
        return Err(ProjectError::RootNotFound(root.to_path_buf()));
    }

    let mut paths = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_excluded(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = to_slash_path(relative);
        if matcher.is_match(&relative) {
            paths.push((relative, entry.path().to_path_buf()));
        }
    }

    Ok(paths)
}

fn is_excluded(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn truncate_to(mut content: String, max_bytes: usize) -> String {
    if content.len() <= max_bytes {
        return content;
    }
    let mut cut = max_bytes;
    while !content.is_char_boundary(cut) {
        cut -= 1;
    }
    content.truncate(cut);
    content
}
