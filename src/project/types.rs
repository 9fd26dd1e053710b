use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

/// One entry of the file listing a snapshot is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the project root, `/`-separated
    pub path: String,
    /// Number of lines in the file
    pub lines: usize,
}

/// Static summary of a source tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectSnapshot {
    pub root_path: String,
    pub total_files: usize,
    pub total_lines: usize,
    /// Top-level directories that contain at least one included file
    pub modules: BTreeSet<String>,
}

impl ProjectSnapshot {
    /// Aggregate a file listing. Pure: no filesystem access.
    pub fn from_files(root: &Path, files: &[SourceFile]) -> ProjectSnapshot {
        let modules = files
            .iter()
            .filter_map(|file| {
                let mut parts = file.path.split('/').filter(|p| !p.is_empty());
                let first = parts.next()?;
                parts.next().map(|_| first.to_string())
            })
            .collect();

        ProjectSnapshot {
            root_path: root.display().to_string(),
            total_files: files.len(),
            total_lines: files.iter().map(|f| f.lines).sum(),
            modules,
        }
    }

    pub fn modules_joined(&self) -> String {
        self.modules.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}
