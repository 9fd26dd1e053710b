//! Report rendering.
//!
//! Supported formats:
//! - `json` - machine-readable report
//! - `markdown` - versionable text report
//! - `html` - standalone styled page
//! - `console` - colored terminal text, never written to disk

mod console;
mod html;
mod json;
mod markdown;
pub mod types;

pub use types::{AnalysisResult, Report};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Unsupported report format '{0}'. Valid formats: json, markdown, html, console")]
    UnsupportedFormat(String),

    #[error("Failed to write report file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Output formats a report can be rendered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportFormat {
    Json,
    Markdown,
    Html,
    Console,
}

impl ReportFormat {
    /// File extension for file-based formats; None for console.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            ReportFormat::Json => Some("json"),
            ReportFormat::Markdown => Some("md"),
            ReportFormat::Html => Some("html"),
            ReportFormat::Console => None,
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" | "structured-data" => Ok(ReportFormat::Json),
            "markdown" | "md" | "lightweight-markup" => Ok(ReportFormat::Markdown),
            "html" | "styled-document" => Ok(ReportFormat::Html),
            "console" | "text" | "terminal" => Ok(ReportFormat::Console),
            _ => Err(ReportError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Markdown => write!(f, "markdown"),
            ReportFormat::Html => write!(f, "html"),
            ReportFormat::Console => write!(f, "console"),
        }
    }
}

/// Parse every requested format identifier, dropping repeats.
/// Fails on the first unknown identifier, before anything is rendered.
pub fn parse_formats<S: AsRef<str>>(identifiers: &[S]) -> Result<Vec<ReportFormat>, ReportError> {
    let mut formats = Vec::new();
    for identifier in identifiers {
        let format = identifier.as_ref().parse::<ReportFormat>()?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}

/// One rendered representation of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub content: String,
    /// Suggested file name (`validation_<YYYYMMDD>_<HHMMSS>.<ext>`); None for console
    pub filename: Option<String>,
}

/// What a successfully handled format produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportArtifact {
    File(PathBuf),
    Console(String),
}

/// Per-format result of `write_reports`.
pub type ReportOutcomes = BTreeMap<ReportFormat, Result<ReportArtifact, ReportError>>;

/// Suggested file name for a file-based format.
pub fn filename(report: &Report, format: ReportFormat) -> Option<String> {
    format
        .extension()
        .map(|ext| format!("validation_{}.{}", report.file_stamp(), ext))
}

/// Render `report` as `format`. Pure: same report, same bytes.
pub fn render(report: &Report, format: ReportFormat) -> Result<Rendered, ReportError> {
    let content = match format {
        ReportFormat::Json => json::render(report)?,
        ReportFormat::Markdown => markdown::render(report),
        ReportFormat::Html => html::render(report),
        ReportFormat::Console => console::render(report),
    };
    Ok(Rendered {
        content,
        filename: filename(report, format),
    })
}

/// Render each format and write file-based ones into `dir`.
///
/// Formats are handled independently: a failure in one is recorded in the
/// returned map and does not stop the others. `dir` is created on the first
/// file write and reused afterwards. Console output is returned, not printed.
#[instrument(skip(report, formats), fields(report_id = %report.metadata.report_id, dir = %dir.display()))]
pub fn write_reports(report: &Report, formats: &[ReportFormat], dir: &Path) -> ReportOutcomes {
    let mut outcomes = BTreeMap::new();
    for &format in formats {
        let outcome = render(report, format).and_then(|rendered| persist(rendered, dir));
        match &outcome {
            Ok(ReportArtifact::File(path)) => debug!(%format, path = %path.display(), "report written"),
            Ok(ReportArtifact::Console(_)) => debug!(%format, "report rendered for console"),
            Err(e) => warn!(%format, error = %e, "report format failed"),
        }
        outcomes.insert(format, outcome);
    }
    outcomes
}

fn persist(rendered: Rendered, dir: &Path) -> Result<ReportArtifact, ReportError> {
    let Some(name) = rendered.filename else {
        return Ok(ReportArtifact::Console(rendered.content));
    };

    fs::create_dir_all(dir).map_err(|source| ReportError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(name);
    fs::write(&path, rendered.content).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(ReportArtifact::File(path))
}

/// `1234567` -> `1,234,567`
pub(crate) fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::git::{CommitInfo, RepositorySnapshot};
    use crate::report::types::{Finding, Severity};
    use crate::project::ProjectSnapshot;
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use std::collections::BTreeSet;

    pub fn sample_timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap()
    }

    pub fn sample_report() -> Report {
        let project = ProjectSnapshot {
            root_path: "/work/app".to_string(),
            total_files: 42,
            total_lines: 12_345,
            modules: BTreeSet::from(["core".to_string(), "scripts".to_string()]),
        };
        let repository = RepositorySnapshot {
            repo_path: "/work/app".to_string(),
            current_branch: "main".to_string(),
            last_commit: "0123abcd".to_string(),
            recent_commits: vec![CommitInfo {
                hash: "0123abcd".to_string(),
                author: "alice".to_string(),
                date: DateTime::parse_from_rfc3339("2024-02-29T09:30:00+01:00").ok(),
                message: "Handle empty OCR pages".to_string(),
                changed_files: BTreeSet::from(["ace/extraction/ocr.py".to_string()]),
            }],
        };
        let analysis = AnalysisResult {
            summary: "Pipeline is solid; error handling needs work.".to_string(),
            score: 85.5,
            findings: vec![Finding {
                title: "Error Handling".to_string(),
                severity: Severity::Medium,
                description: "Missing try-catch in OCR pipeline".to_string(),
                file: Some("ace/extraction/ocr.py".to_string()),
            }],
            recommendations: vec!["Wrap OCR calls and record failures".to_string()],
        };
        Report::new(sample_timestamp(), project, repository, analysis, "claude-test")
    }

    #[test]
    fn test_parse_format_aliases() {
        assert_eq!("structured-data".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("MD".parse::<ReportFormat>().unwrap(), ReportFormat::Markdown);
        assert_eq!("lightweight-markup".parse::<ReportFormat>().unwrap(), ReportFormat::Markdown);
        assert_eq!("styled-document".parse::<ReportFormat>().unwrap(), ReportFormat::Html);
        assert_eq!("terminal".parse::<ReportFormat>().unwrap(), ReportFormat::Console);
    }

    #[test]
    fn test_parse_formats_rejects_unknown() {
        let err = parse_formats(&["json", "pdf"]).unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat(ref f) if f == "pdf"));
    }

    #[test]
    fn test_parse_formats_dedups_in_order() {
        let formats = parse_formats(&["html", "json", "structured-data", "html"]).unwrap();
        assert_eq!(formats, vec![ReportFormat::Html, ReportFormat::Json]);
    }

    #[test]
    fn test_filename_format() {
        let report = sample_report();
        assert_eq!(
            filename(&report, ReportFormat::Json).as_deref(),
            Some("validation_20240301_140509.json")
        );
        assert_eq!(
            filename(&report, ReportFormat::Markdown).as_deref(),
            Some("validation_20240301_140509.md")
        );
        assert_eq!(
            filename(&report, ReportFormat::Html).as_deref(),
            Some("validation_20240301_140509.html")
        );
        assert_eq!(filename(&report, ReportFormat::Console), None);
    }

    #[test]
    fn test_render_is_deterministic() {
        let report = sample_report();
        for format in [ReportFormat::Json, ReportFormat::Markdown, ReportFormat::Html] {
            let first = render(&report, format).unwrap();
            let second = render(&report, format).unwrap();
            assert_eq!(first, second, "{format} output differs between renders");
        }
    }

    #[test]
    fn test_console_only_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("reports");
        let report = sample_report();

        let outcomes = write_reports(&report, &[ReportFormat::Console], &out_dir);
        assert_eq!(outcomes.len(), 1);
        match &outcomes[&ReportFormat::Console] {
            Ok(ReportArtifact::Console(text)) => assert!(text.contains("Error Handling")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!out_dir.exists());
    }

    #[test]
    fn test_creates_and_reuses_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("nested").join("reports");
        let report = sample_report();
        let formats = [ReportFormat::Json, ReportFormat::Markdown];

        let first = write_reports(&report, &formats, &out_dir);
        assert!(first.values().all(|o| o.is_ok()));
        assert!(out_dir.join("validation_20240301_140509.json").exists());
        assert!(out_dir.join("validation_20240301_140509.md").exists());

        let second = write_reports(&report, &formats, &out_dir);
        assert!(second.values().all(|o| o.is_ok()));
    }

    #[test]
    fn test_written_file_matches_render() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample_report();
        let outcomes = write_reports(&report, &[ReportFormat::Json], dir.path());
        let Ok(ReportArtifact::File(path)) = &outcomes[&ReportFormat::Json] else {
            panic!("json was not written");
        };
        let on_disk = fs::read_to_string(path).unwrap();
        assert_eq!(on_disk, render(&report, ReportFormat::Json).unwrap().content);
    }

    #[test]
    fn test_write_failure_is_isolated_per_format() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample_report();
        // A directory squatting on the markdown file name makes only that write fail.
        fs::create_dir(dir.path().join("validation_20240301_140509.md")).unwrap();

        let formats = [ReportFormat::Json, ReportFormat::Markdown, ReportFormat::Console];
        let outcomes = write_reports(&report, &formats, dir.path());

        assert!(matches!(outcomes[&ReportFormat::Json], Ok(ReportArtifact::File(_))));
        assert!(matches!(outcomes[&ReportFormat::Markdown], Err(ReportError::Write { .. })));
        assert!(matches!(outcomes[&ReportFormat::Console], Ok(ReportArtifact::Console(_))));
    }

    #[test]
    fn test_unusable_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("reports");
        fs::write(&blocker, "not a directory").unwrap();
        let report = sample_report();

        let outcomes = write_reports(&report, &[ReportFormat::Html, ReportFormat::Console], &blocker);
        assert!(matches!(outcomes[&ReportFormat::Html], Err(ReportError::Write { .. })));
        assert!(outcomes[&ReportFormat::Console].is_ok());
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
