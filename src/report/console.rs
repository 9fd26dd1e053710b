use colored::Colorize;

use super::group_thousands;
use super::types::{Report, ScoreBand, Severity};

/// Findings and recommendations shown before truncating.
const CONSOLE_LIMIT: usize = 5;
const BAR_WIDTH: usize = 20;

/// Format the report for the terminal:
///
/// ═══ Validation Report ═══
/// Generated: 2024-03-01 14:05:09 | Report ID: VAL_20240301_140509
///
/// Project: 42 files | 12,345 lines | Modules: core, scripts
/// Git: main @ 0123abcd
///
/// Overall Score: 85.5/100 (Excellent)
/// [█████████████████░░░]
/// ...
pub(super) fn render(report: &Report) -> String {
    let project = &report.project;
    let repository = &report.repository;
    let analysis = &report.analysis;
    let counts = analysis.severity_counts();
    let band = ScoreBand::for_score(analysis.score);

    let mut out = String::new();
    out.push('\n');
    out.push_str(&format!("{}\n", "═══ Validation Report ═══".bold()));
    out.push_str(&format!(
        "Generated: {} | Report ID: {}\n\n",
        report.timestamp(),
        report.metadata.report_id
    ));
    out.push_str(&format!(
        "Project: {} files | {} lines | Modules: {}\n",
        project.total_files,
        group_thousands(project.total_lines),
        project.modules_joined()
    ));
    out.push_str(&format!(
        "Git: {} @ {}\n\n",
        repository.current_branch, repository.last_commit
    ));

    let score_text = format!("{:.1}/100 ({})", analysis.score, band.label());
    out.push_str(&format!("Overall Score: {}\n", colorize_band(band, &score_text)));
    out.push_str(&format!("  {}\n", score_bar(analysis.score)));
    out.push_str(&format!(
        "  Findings: {} | {} {} | {} {} | {} {}\n\n",
        counts.total(),
        colorize_severity(Severity::High),
        counts.high,
        colorize_severity(Severity::Medium),
        counts.medium,
        colorize_severity(Severity::Low),
        counts.low
    ));

    out.push_str(&format!("{}\n", "═══ Summary ═══".bold()));
    out.push_str(&format!("  {}\n\n", analysis.summary));

    let findings_heading = format!("═══ Findings ({}) ═══", analysis.findings.len());
    out.push_str(&format!("{}\n", findings_heading.bold()));
    if analysis.findings.is_empty() {
        out.push_str("  No findings.\n");
    }
    for (idx, finding) in analysis.findings.iter().take(CONSOLE_LIMIT).enumerate() {
        out.push_str(&format!(
            "  {}. [{}] {}\n",
            idx + 1,
            colorize_severity(finding.severity),
            finding.title
        ));
        if !finding.description.is_empty() {
            out.push_str(&format!("     {}\n", finding.description));
        }
        if let Some(file) = &finding.file {
            out.push_str(&format!("     ({})\n", file.dimmed()));
        }
    }
    if analysis.findings.len() > CONSOLE_LIMIT {
        out.push_str(&format!("  ... and {} more\n", analysis.findings.len() - CONSOLE_LIMIT));
    }
    out.push('\n');

    if !analysis.recommendations.is_empty() {
        let heading = format!("═══ Recommendations ({}) ═══", analysis.recommendations.len());
        out.push_str(&format!("{}\n", heading.bold()));
        for (idx, rec) in analysis.recommendations.iter().take(CONSOLE_LIMIT).enumerate() {
            out.push_str(&format!("  {}. {}\n", idx + 1, rec));
        }
        if analysis.recommendations.len() > CONSOLE_LIMIT {
            out.push_str(&format!(
                "  ... and {} more\n",
                analysis.recommendations.len() - CONSOLE_LIMIT
            ));
        }
        out.push('\n');
    }

    out
}

/// `[████░░░░...]`, one block per 5 points.
fn score_bar(score: f64) -> String {
    let filled = ((score / 5.0) as usize).min(BAR_WIDTH);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn colorize_severity(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::High => "HIGH".red().bold(),
        Severity::Medium => "MEDIUM".yellow().bold(),
        Severity::Low => "LOW".green().bold(),
    }
}

fn colorize_band(band: ScoreBand, text: &str) -> colored::ColoredString {
    match band {
        ScoreBand::Excellent => text.green().bold(),
        ScoreBand::Good => text.yellow().bold(),
        ScoreBand::NeedsImprovement => text.red().bold(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_report;
    use crate::report::types::Finding;

    #[test]
    fn test_console_contents() {
        let text = render(&sample_report());
        assert!(text.contains("Report ID: VAL_20240301_140509"));
        assert!(text.contains("42 files | 12,345 lines | Modules: core, scripts"));
        assert!(text.contains("Git: main @ 0123abcd"));
        assert!(text.contains("85.5/100 (Excellent)"));
        assert!(text.contains("Findings: 1 |"));
        assert!(text.contains("Error Handling"));
        assert!(text.contains("Missing try-catch in OCR pipeline"));
        assert!(text.contains("Wrap OCR calls and record failures"));
    }

    #[test]
    fn test_console_truncates_long_lists() {
        let mut report = sample_report();
        report.analysis.findings = (0..8)
            .map(|i| Finding {
                title: format!("Finding {i}"),
                severity: Severity::Low,
                description: String::new(),
                file: None,
            })
            .collect();
        let text = render(&report);
        assert!(text.contains("Finding 4"));
        assert!(!text.contains("Finding 5"));
        assert!(text.contains("... and 3 more"));
    }

    #[test]
    fn test_score_bar() {
        assert_eq!(score_bar(0.0), format!("[{}]", "░".repeat(20)));
        assert_eq!(score_bar(100.0), format!("[{}]", "█".repeat(20)));
        assert_eq!(score_bar(52.0), format!("[{}{}]", "█".repeat(10), "░".repeat(10)));
    }
}
