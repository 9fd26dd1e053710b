use chrono::NaiveDateTime;
use serde::Serialize;

use crate::git::RepositorySnapshot;
use crate::project::ProjectSnapshot;

/// Severity of a single finding reported by the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Lenient parse used at the normalization boundary.
    /// Anything that is not low/medium/high (case-insensitive) becomes Medium.
    pub fn parse_lenient(raw: &str) -> Severity {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Severity::Low,
            "high" => Severity::High,
            _ => Severity::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
        }
    }
}

/// A single finding from the analysis service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    /// Short name of the area the finding is about
    pub title: String,
    pub severity: Severity,
    /// Human-readable explanation
    pub description: String,
    /// File the finding refers to, if the model named one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Number of findings per severity bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl SeverityCounts {
    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }
}

/// Normalized output of one analysis call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub summary: String,
    /// Overall score in [0, 100], passed through from the analysis service
    pub score: f64,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<String>,
}

impl AnalysisResult {
    /// Bucket findings by severity. The score is never recomputed from these.
    pub fn severity_counts(&self) -> SeverityCounts {
        self.findings
            .iter()
            .fold(SeverityCounts::default(), |mut counts, finding| {
                match finding.severity {
                    Severity::Low => counts.low += 1,
                    Severity::Medium => counts.medium += 1,
                    Severity::High => counts.high += 1,
                }
                counts
            })
    }
}

/// Descriptive fields attached to every report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    pub validator_version: String,
    pub model: String,
    pub report_id: String,
}

/// Read-only view combining both snapshots with one analysis result.
#[derive(Debug, Clone)]
pub struct Report {
    pub generated_at: NaiveDateTime,
    pub project: ProjectSnapshot,
    pub repository: RepositorySnapshot,
    pub analysis: AnalysisResult,
    pub metadata: ReportMetadata,
}

impl Report {
    pub fn new(
        generated_at: NaiveDateTime,
        project: ProjectSnapshot,
        repository: RepositorySnapshot,
        analysis: AnalysisResult,
        model: &str,
    ) -> Report {
        let metadata = ReportMetadata {
            validator_version: env!("CARGO_PKG_VERSION").to_string(),
            model: model.to_string(),
            report_id: format!("VAL_{}", generated_at.format("%Y%m%d_%H%M%S")),
        };
        Report {
            generated_at,
            project,
            repository,
            analysis,
            metadata,
        }
    }

    /// Human-readable generation time used in report headers.
    pub fn timestamp(&self) -> String {
        self.generated_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Timestamp fragment used in report file names.
    pub fn file_stamp(&self) -> String {
        self.generated_at.format("%Y%m%d_%H%M%S").to_string()
    }
}

/// Qualitative band for an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Excellent,
    Good,
    NeedsImprovement,
}

impl ScoreBand {
    pub fn for_score(score: f64) -> ScoreBand {
        if score >= 80.0 {
            ScoreBand::Excellent
        } else if score >= 60.0 {
            ScoreBand::Good
        } else {
            ScoreBand::NeedsImprovement
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent",
            ScoreBand::Good => "Good",
            ScoreBand::NeedsImprovement => "Needs Improvement",
        }
    }
}
