use serde::Serialize;

use super::types::{Finding, Report, ReportMetadata, SeverityCounts};
use crate::git::RepositorySnapshot;
use crate::project::ProjectSnapshot;

#[derive(Serialize)]
struct JsonReport<'a> {
    timestamp: String,
    report_id: &'a str,
    project_info: &'a ProjectSnapshot,
    git_info: &'a RepositorySnapshot,
    analysis_summary: AnalysisSummary<'a>,
    findings: &'a [Finding],
    recommendations: &'a [String],
    score: f64,
    metadata: &'a ReportMetadata,
}

#[derive(Serialize)]
struct AnalysisSummary<'a> {
    summary: &'a str,
    score: f64,
    findings_count: usize,
    recommendations_count: usize,
    severity_counts: SeverityCounts,
}

pub(super) fn render(report: &Report) -> Result<String, serde_json::Error> {
    let analysis = &report.analysis;
    let view = JsonReport {
        timestamp: report.timestamp(),
        report_id: &report.metadata.report_id,
        project_info: &report.project,
        git_info: &report.repository,
        analysis_summary: AnalysisSummary {
            summary: &analysis.summary,
            score: analysis.score,
            findings_count: analysis.findings.len(),
            recommendations_count: analysis.recommendations.len(),
            severity_counts: analysis.severity_counts(),
        },
        findings: &analysis.findings,
        recommendations: &analysis.recommendations,
        score: analysis.score,
        metadata: &report.metadata,
    };

    let mut json = serde_json::to_string_pretty(&view)?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_report;
    use serde_json::Value;

    #[test]
    fn test_score_and_findings() {
        let json = render(&sample_report()).unwrap();
        assert!(json.contains("\"score\": 85.5"));

        let value: Value = serde_json::from_str(&json).unwrap();
        let findings = value["findings"].as_array().unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0]["title"], "Error Handling");
        assert_eq!(findings[0]["severity"], "medium");
        assert_eq!(findings[0]["description"], "Missing try-catch in OCR pipeline");
        assert_eq!(findings[0]["file"], "ace/extraction/ocr.py");
    }

    #[test]
    fn test_sections() {
        let value: Value = serde_json::from_str(&render(&sample_report()).unwrap()).unwrap();
        assert_eq!(value["timestamp"], "2024-03-01 14:05:09");
        assert_eq!(value["report_id"], "VAL_20240301_140509");
        assert_eq!(value["project_info"]["total_lines"], 12_345);
        assert_eq!(value["project_info"]["modules"], serde_json::json!(["core", "scripts"]));
        assert_eq!(value["git_info"]["current_branch"], "main");
        assert_eq!(value["git_info"]["recent_commits"][0]["date"], "2024-02-29T09:30:00+01:00");
        assert_eq!(value["analysis_summary"]["findings_count"], 1);
        assert_eq!(value["analysis_summary"]["severity_counts"]["medium"], 1);
        assert_eq!(value["metadata"]["model"], "claude-test");
    }

    #[test]
    fn test_absent_file_is_omitted() {
        let mut report = sample_report();
        report.analysis.findings[0].file = None;
        let value: Value = serde_json::from_str(&render(&report).unwrap()).unwrap();
        assert!(value["findings"][0].get("file").is_none());
    }
}
