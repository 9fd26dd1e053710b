use super::group_thousands;
use super::types::{Report, ScoreBand, Severity};

pub(super) fn render(report: &Report) -> String {
    let project = &report.project;
    let repository = &report.repository;
    let analysis = &report.analysis;
    let counts = analysis.severity_counts();

    let mut md = String::new();
    md.push_str("# Validation Report\n\n");
    md.push_str(&format!("**Generated:** {}  \n", report.timestamp()));
    md.push_str(&format!("**Report ID:** {}\n\n", report.metadata.report_id));
    md.push_str("---\n\n");

    md.push_str("## Project Information\n\n");
    md.push_str(&format!("- **Root Path:** `{}`\n", project.root_path));
    md.push_str(&format!("- **Total Files:** {}\n", project.total_files));
    md.push_str(&format!("- **Total Lines:** {}\n", group_thousands(project.total_lines)));
    md.push_str(&format!("- **Modules:** {}\n\n", project.modules_joined()));

    md.push_str("## Git Information\n\n");
    md.push_str(&format!("- **Branch:** `{}`\n", repository.current_branch));
    md.push_str(&format!("- **Last Commit:** `{}`\n", repository.last_commit));
    md.push_str(&format!("- **Repository:** `{}`\n\n", repository.repo_path));

    if !repository.recent_commits.is_empty() {
        md.push_str("### Recent Commits\n\n");
        md.push_str("| Commit | Author | Date | Message | Files |\n");
        md.push_str("|---|---|---|---|---|\n");
        for commit in &repository.recent_commits {
            let date = commit
                .date
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            md.push_str(&format!(
                "| `{}` | {} | {} | {} | {} |\n",
                commit.hash,
                table_cell(&commit.author),
                date,
                table_cell(&commit.message),
                commit.changed_files.len()
            ));
        }
        md.push('\n');
    }

    md.push_str("---\n\n");
    md.push_str("## Analysis Results\n\n");
    md.push_str(&format!("### Overall Score: {:.1}/100\n\n", analysis.score));
    md.push_str(&format!("{}\n\n", score_badge(analysis.score)));
    md.push_str("| Severity | Findings |\n|---|---|\n");
    md.push_str(&format!("| High | {} |\n", counts.high));
    md.push_str(&format!("| Medium | {} |\n", counts.medium));
    md.push_str(&format!("| Low | {} |\n\n", counts.low));

    md.push_str("### Summary\n\n");
    md.push_str(&format!("{}\n\n", analysis.summary));

    if !analysis.findings.is_empty() {
        md.push_str(&format!("## Findings ({})\n\n", analysis.findings.len()));
        for (idx, finding) in analysis.findings.iter().enumerate() {
            md.push_str(&format!(
                "### {}. {} {}\n\n",
                idx + 1,
                finding.title,
                severity_badge(finding.severity)
            ));
            md.push_str(&format!("**Description:** {}\n\n", finding.description));
            if let Some(file) = &finding.file {
                md.push_str(&format!("**File:** `{}`\n\n", file));
            }
        }
    }

    if !analysis.recommendations.is_empty() {
        md.push_str(&format!("## Recommendations ({})\n\n", analysis.recommendations.len()));
        for (idx, rec) in analysis.recommendations.iter().enumerate() {
            md.push_str(&format!("{}. {}\n", idx + 1, rec));
        }
        md.push('\n');
    }

    md.push_str("---\n\n");
    md.push_str("## Metadata\n\n");
    md.push_str(&format!("- **Validator Version:** {}\n", report.metadata.validator_version));
    md.push_str(&format!("- **Model:** {}\n\n", report.metadata.model));
    md.push_str("*Report generated by repo-validator*\n");
    md
}

fn score_badge(score: f64) -> String {
    let color = match ScoreBand::for_score(score) {
        ScoreBand::Excellent => "brightgreen",
        ScoreBand::Good => "yellow",
        ScoreBand::NeedsImprovement => "red",
    };
    format!("![Score](https://img.shields.io/badge/score-{:.0}%25-{})", score, color)
}

fn severity_badge(severity: Severity) -> String {
    let color = match severity {
        Severity::High => "red",
        Severity::Medium => "yellow",
        Severity::Low => "green",
    };
    format!(
        "![{0}](https://img.shields.io/badge/severity-{0}-{1})",
        severity.as_str(),
        color
    )
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
