use super::group_thousands;
use super::types::{Report, ScoreBand};

pub(super) fn render(report: &Report) -> String {
    let project = &report.project;
    let repository = &report.repository;
    let analysis = &report.analysis;
    let counts = analysis.severity_counts();
    let color = score_color(analysis.score);
    let report_id = html_escape(&report.metadata.report_id);

    let mut findings = String::new();
    for finding in &analysis.findings {
        let file = finding
            .file
            .as_deref()
            .map(|f| format!("\n        <div class=\"finding-file\">{}</div>", html_escape(f)))
            .unwrap_or_default();
        findings.push_str(&format!(
            r#"
      <div class="finding severity-{}">
        <div class="finding-header">
          <span class="finding-title">{}</span>
          <span class="severity-badge">{}</span>
        </div>
        <div class="finding-description">{}</div>{}
      </div>"#,
            finding.severity.as_str(),
            html_escape(&finding.title),
            finding.severity,
            html_escape(&finding.description),
            file
        ));
    }
    if findings.is_empty() {
        findings.push_str("\n      <p>No findings reported.</p>");
    }

    let recommendations = if analysis.recommendations.is_empty() {
        "<p>No recommendations provided.</p>".to_string()
    } else {
        let items: String = analysis
            .recommendations
            .iter()
            .map(|rec| format!("\n        <li>{}</li>", html_escape(rec)))
            .collect();
        format!("<ol>{items}\n      </ol>")
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Validation Report - {report_id}</title>
  <style>{CSS}</style>
</head>
<body>
  <div class="container">
    <header>
      <h1>Validation Report</h1>
      <div class="meta">
        <div>Report ID: {report_id}</div>
        <div>Generated: {timestamp}</div>
      </div>
    </header>
    <div class="content">
      <div class="section">
        <h2>Project Information</h2>
        <div class="info-grid">
          <div class="info-card"><h3>Total Files</h3><div class="value">{total_files}</div></div>
          <div class="info-card"><h3>Total Lines</h3><div class="value">{total_lines}</div></div>
          <div class="info-card"><h3>Modules</h3><div class="value">{modules}</div></div>
          <div class="info-card"><h3>Git Branch</h3><div class="value">{branch}</div></div>
          <div class="info-card"><h3>Last Commit</h3><div class="value">{last_commit}</div></div>
        </div>
      </div>
      <div class="section">
        <h2>Overall Score</h2>
        <div class="score-container">
          <div class="score-value" style="color: {color}">{score:.1}</div>
          <div class="score-label">out of 100 &middot; {band}</div>
          <div class="score-bar"><div class="score-fill" style="width: {score:.1}%; background: {color}"></div></div>
          <div class="severity-counts">High: {high} &middot; Medium: {medium} &middot; Low: {low}</div>
        </div>
      </div>
      <div class="section">
        <h2>Summary</h2>
        <div class="summary-box">{summary}</div>
      </div>
      <div class="section">
        <h2>Findings ({findings_count})</h2>{findings}
      </div>
      <div class="section">
        <h2>Recommendations ({recommendations_count})</h2>
      {recommendations}
      </div>
    </div>
    <footer>
      <div>repo-validator v{version}</div>
      <div>Model: {model}</div>
    </footer>
  </div>
</body>
</html>
"#,
        timestamp = report.timestamp(),
        total_files = project.total_files,
        total_lines = group_thousands(project.total_lines),
        modules = html_escape(&project.modules_joined()),
        branch = html_escape(&repository.current_branch),
        last_commit = html_escape(&repository.last_commit),
        score = analysis.score,
        band = ScoreBand::for_score(analysis.score).label(),
        high = counts.high,
        medium = counts.medium,
        low = counts.low,
        summary = html_escape(&analysis.summary),
        findings_count = analysis.findings.len(),
        recommendations_count = analysis.recommendations.len(),
        version = html_escape(&report.metadata.validator_version),
        model = html_escape(&report.metadata.model),
    )
}

fn score_color(score: f64) -> &'static str {
    match ScoreBand::for_score(score) {
        ScoreBand::Excellent => "#10b981",
        ScoreBand::Good => "#f59e0b",
        ScoreBand::NeedsImprovement => "#ef4444",
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const CSS: &str = r#"
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; background: #f5f5f5; padding: 20px; }
    .container { max-width: 1200px; margin: 0 auto; background: white; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); overflow: hidden; }
    header { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 30px; }
    header h1 { font-size: 2em; margin-bottom: 10px; }
    .meta { opacity: 0.9; font-size: 0.9em; }
    .content { padding: 30px; }
    .section { margin-bottom: 40px; }
    .section h2 { color: #667eea; margin-bottom: 20px; padding-bottom: 10px; border-bottom: 2px solid #e0e0e0; }
    .info-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); gap: 20px; }
    .info-card { background: #f9f9f9; padding: 15px; border-radius: 6px; border-left: 4px solid #667eea; }
    .info-card h3 { font-size: 0.9em; color: #666; margin-bottom: 5px; text-transform: uppercase; letter-spacing: 0.5px; }
    .info-card .value { font-size: 1.3em; font-weight: bold; }
    .score-container { text-align: center; padding: 30px; background: #f9f9f9; border-radius: 8px; }
    .score-value { font-size: 4em; font-weight: bold; }
    .score-label { font-size: 1.2em; color: #666; margin-top: 10px; }
    .score-bar { width: 100%; height: 20px; background: #e0e0e0; border-radius: 10px; overflow: hidden; margin-top: 20px; }
    .score-fill { height: 100%; }
    .severity-counts { margin-top: 15px; color: #666; }
    .summary-box { background: #f0f4ff; padding: 20px; border-radius: 6px; border-left: 4px solid #667eea; font-size: 1.1em; line-height: 1.8; }
    .finding { border: 1px solid #e0e0e0; border-radius: 6px; padding: 20px; margin-bottom: 15px; }
    .finding-header { display: flex; justify-content: space-between; align-items: center; margin-bottom: 10px; }
    .finding-title { font-weight: bold; font-size: 1.1em; }
    .severity-badge { padding: 4px 12px; border-radius: 12px; font-size: 0.8em; font-weight: bold; }
    .severity-high { border-left: 4px solid #ef4444; }
    .severity-high .severity-badge { background: #fee2e2; color: #991b1b; }
    .severity-medium { border-left: 4px solid #f59e0b; }
    .severity-medium .severity-badge { background: #fef3c7; color: #92400e; }
    .severity-low { border-left: 4px solid #10b981; }
    .severity-low .severity-badge { background: #d1fae5; color: #065f46; }
    .finding-description { color: #666; }
    .finding-file { margin-top: 10px; padding: 8px 12px; background: #f9f9f9; border-radius: 4px; font-family: 'Courier New', monospace; font-size: 0.9em; }
    ol { padding-left: 20px; }
    ol li { margin-bottom: 10px; padding-left: 5px; }
    footer { background: #f9f9f9; padding: 20px 30px; text-align: center; color: #666; font-size: 0.9em; border-top: 1px solid #e0e0e0; }
  "#;
