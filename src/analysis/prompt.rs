use std::collections::BTreeMap;

use crate::git::RepositorySnapshot;
use crate::project::ProjectSnapshot;

pub const DEFAULT_QUESTION: &str = "Assess the quality and robustness of this codebase.";

pub const DEFAULT_FOCUS_AREAS: &[&str] = &[
    "Error handling",
    "Performance and scalability",
    "Correctness of parsing logic",
    "Code architecture",
];

/// Background section shared by every prompt.
pub fn project_context(
    description: Option<&str>,
    project: Option<&ProjectSnapshot>,
    repository: Option<&RepositorySnapshot>,
) -> String {
    let mut context = String::new();
    if let Some(description) = description {
        context.push_str(description.trim());
        context.push_str("\n\n");
    }

    if let Some(project) = project {
        context.push_str("Project statistics:\n");
        context.push_str(&format!("- {} source files\n", project.total_files));
        context.push_str(&format!("- {} lines of code\n", project.total_lines));
        context.push_str(&format!("- Modules: {}\n", project.modules_joined()));
    }

    if let Some(repository) = repository {
        context.push_str(&format!(
            "Repository: branch {} at {}\n",
            repository.current_branch, repository.last_commit
        ));
        if !repository.recent_commits.is_empty() {
            context.push_str("Recent commits:\n");
            for commit in &repository.recent_commits {
                context.push_str(&format!(
                    "- {} {} ({} files)\n",
                    commit.hash,
                    commit.message,
                    commit.changed_files.len()
                ));
            }
        }
    }

    context
}

/// Prompt for the full project analysis. The reply is normalized by
/// `normalize::normalize`.
pub fn analysis_prompt(
    context: &str,
    code_files: &BTreeMap<String, String>,
    question: &str,
    focus_areas: &[&str],
) -> String {
    let files = code_files
        .iter()
        .map(|(path, content)| format!("### {path}\n```{}\n{content}\n```", fence_language(path)))
        .collect::<Vec<_>>()
        .join("\n\n");
    let focus = focus_areas
        .iter()
        .map(|area| format!("- {area}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"PROJECT CONTEXT:
{context}

FILES FOR ANALYSIS:
{files}

FOCUS AREAS:
{focus}

QUESTION:
{question}

Return a JSON object with:
{{
  "summary": "2-3 sentence summary of the analysis",
  "findings": [
    {{"title": "area name", "severity": "high|medium|low", "description": "...", "file": "..."}}
  ],
  "recommendations": ["rec1", "rec2"],
  "score": 0-100
}}
"#
    )
}

/// Prompt asking the model to review a single parser against test cases.
pub fn parser_validation_prompt(path: &str, code: &str, test_cases: &serde_json::Value) -> String {
    let cases = serde_json::to_string_pretty(test_cases).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"Review this parser and validate its implementation.

PARSER ({path}):
```{lang}
{code}
```

TEST CASES:
{cases}

Return a JSON object with:
{{
  "is_valid": boolean,
  "issues": [list of problems found],
  "suggestions": [list of improvements],
  "test_coverage": score from 0-100
}}
"#,
        lang = fence_language(path)
    )
}

/// Prompt asking for a bullet list of improvements to one file.
/// The reply is parsed with `normalize::parse_suggestions`.
pub fn improvement_prompt(path: &str, code: &str, context: &str) -> String {
    format!(
        r#"File: {path}

Context: {context}

Current code:
```{lang}
{code}
```

List 5-10 practical improvements that can be implemented right away.
Focus on clarity, performance, maintainability and error handling.

Reply with a Markdown list only, one "- item" per line.
"#,
        lang = fence_language(path)
    )
}

fn fence_language(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("py") => "python",
        Some("rs") => "rust",
        Some("js") => "javascript",
        Some("ts") => "typescript",
        Some("toml") => "toml",
        _ => "",
    }
}
