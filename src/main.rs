mod analysis;
mod config;
mod git;
mod project;
mod report;

use analysis::{AnalysisClient, AnthropicClient, MockClient};
use clap::{Parser, Subcommand};
use colored::Colorize;
use report::ReportArtifact;
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span, warn};
use tracing_subscriber::EnvFilter;

/// repo-validator — sends project sources and git metadata to an LLM and
/// renders its findings as JSON, Markdown, HTML and console reports.
#[derive(Parser, Debug)]
#[command(name = "repo-validator", version, about)]
struct Cli {
    /// Repository to validate
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    /// API key for the analysis service (overrides ANTHROPIC_API_KEY and the config file)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Config file (defaults to .repo-validator.toml in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze the whole project and write a validation report
    Full {
        /// Report formats: json, markdown, html, console (comma separated)
        #[arg(long, value_delimiter = ',')]
        formats: Vec<String>,

        /// Directory for report files (defaults to [report].output_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Use the bundled sample analysis instead of calling the API
        #[arg(long)]
        r#mock: bool,
    },

    /// Validate a single parser file
    Parser {
        /// Relative path or file stem of the parser
        name: String,

        /// JSON file with test cases passed to the model
        #[arg(long)]
        cases: Option<PathBuf>,
    },

    /// List recent commits
    Commits {
        /// Number of commits
        #[arg(short = 'n', default_value_t = 5)]
        n: usize,
    },

    /// Suggest improvements for files matching a glob
    Improve {
        /// Glob relative to the repository (e.g. "src/**/*.rs")
        pattern: String,

        /// Maximum number of files sent to the model
        #[arg(long, default_value_t = 3)]
        max_files: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;
    debug!(
        model = config.model(),
        tesseract = ?config.tools.tesseract_path,
        poppler = ?config.tools.poppler_path,
        "configuration loaded"
    );

    match cli.command {
        Command::Full {
            formats,
            output_dir,
            r#mock,
        } => {
            let _span = info_span!("full", repo = %cli.repo.display()).entered();
            let client = analysis_client(&config, cli.api_key.as_deref(), r#mock)?;
            let output_dir = output_dir.unwrap_or_else(|| config.report.output_dir.clone());
            run_full(&config, &cli.repo, client.as_ref(), &formats, &output_dir).await
        }
        Command::Parser { name, cases } => {
            let _span = info_span!("parser", name = %name).entered();
            let client = analysis_client(&config, cli.api_key.as_deref(), false)?;
            run_parser(&config, &cli.repo, client.as_ref(), &name, cases.as_deref()).await
        }
        Command::Commits { n } => {
            let _span = info_span!("commits", n).entered();
            run_commits(&cli.repo, n).await
        }
        Command::Improve { pattern, max_files } => {
            let _span = info_span!("improve", pattern = %pattern).entered();
            let client = analysis_client(&config, cli.api_key.as_deref(), false)?;
            run_improve(&config, &cli.repo, client.as_ref(), &pattern, max_files).await
        }
    }
}

/// Pick the analysis client. Without `mock` a credential must resolve, so a
/// missing key aborts before any repository or network work.
fn analysis_client(
    config: &config::Config,
    api_key: Option<&str>,
    mock: bool,
) -> Result<Box<dyn AnalysisClient>, Box<dyn std::error::Error>> {
    if mock {
        info!("using mock analysis client");
        return Ok(Box::new(MockClient::sample()));
    }
    let api_key = config.api_key(api_key)?;
    Ok(Box::new(AnthropicClient::new(config, api_key)?))
}

/// Snapshot the repository, ask the model for an analysis and render the report.
async fn run_full(
    config: &config::Config,
    repo: &Path,
    client: &dyn AnalysisClient,
    requested_formats: &[String],
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let formats = if requested_formats.is_empty() {
        report::parse_formats(&config.report.formats)?
    } else {
        report::parse_formats(requested_formats)?
    };

    info!("reading repository state");
    let git_client = git::GitClient::open(repo).await?;
    let repository = git_client.snapshot(config.project.recent_commits).await?;
    info!(branch = %repository.current_branch, head = %repository.last_commit, "repository snapshot");

    info!("scanning project files");
    let files = project::collect_files(repo, &config.project.include_patterns)?;
    let project = project::ProjectSnapshot::from_files(repo, &files);
    info!(files = project.total_files, lines = project.total_lines, modules = project.modules.len(), "project snapshot");

    let key_files = project::read_key_files(repo, &config.project.key_files, config.project.max_file_bytes)?;
    if key_files.is_empty() {
        return Err(format!(
            "no key files matched {:?}; set [project].key_files in the config",
            config.project.key_files
        )
        .into());
    }

    let context = analysis::prompt::project_context(
        config.project.description.as_deref(),
        Some(&project),
        Some(&repository),
    );
    let prompt = analysis::prompt::analysis_prompt(
        &context,
        &key_files,
        analysis::prompt::DEFAULT_QUESTION,
        analysis::prompt::DEFAULT_FOCUS_AREAS,
    );

    info!(key_files = key_files.len(), "running analysis");
    let result = analysis::analyze(client, &prompt).await?;
    info!(score = result.score, findings = result.findings.len(), "analysis complete");

    let generated_at = chrono::Local::now().naive_local();
    let built_report = report::Report::new(generated_at, project, repository, result, client.model());

    info!("generating report");
    let outcomes = report::write_reports(&built_report, &formats, output_dir);
    let mut failed = 0;
    for (format, outcome) in &outcomes {
        match outcome {
            Ok(ReportArtifact::Console(text)) => print!("{text}"),
            Ok(ReportArtifact::File(path)) => println!("{} {} report saved: {}", "✔".green(), format, path.display()),
            Err(e) => {
                failed += 1;
                eprintln!("{} {} report failed: {}", "✘".red(), format, e);
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} of {} report format(s) failed", outcomes.len()).into());
    }
    info!(report_id = %built_report.metadata.report_id, "done");
    Ok(())
}

/// Ask the model to review one parser against optional test cases.
async fn run_parser(
    config: &config::Config,
    repo: &Path,
    client: &dyn AnalysisClient,
    name: &str,
    cases: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (relative, path) = project::find_by_name(repo, &config.project.include_patterns, name)?
        .ok_or_else(|| format!("parser not found: {name}"))?;
    let code = project::read_source(&path, config.project.max_file_bytes)?;

    let test_cases = match cases {
        Some(cases_path) => serde_json::from_str(&std::fs::read_to_string(cases_path)?)?,
        None => serde_json::Value::Array(Vec::new()),
    };

    info!(parser = %relative, "validating parser");
    let prompt = analysis::prompt::parser_validation_prompt(&relative, &code, &test_cases);
    let reply = client.complete(&prompt).await?;
    let validation = analysis::normalize_parser_validation(analysis::RawAnalysisPayload::from_reply(reply))?;

    println!();
    println!("{}", format!("═══ Parser Validation: {relative} ═══").bold());
    if validation.is_valid {
        println!("Status: {}", "VALID".green().bold());
    } else {
        println!("Status: {}", "ISSUES FOUND".red().bold());
    }
    println!("Test coverage: {:.0}/100", validation.test_coverage);
    if !validation.issues.is_empty() {
        println!();
        println!("Issues:");
        for issue in &validation.issues {
            println!("  • {issue}");
        }
    }
    if !validation.suggestions.is_empty() {
        println!();
        println!("Suggestions:");
        for suggestion in &validation.suggestions {
            println!("  • {suggestion}");
        }
    }
    println!();
    Ok(())
}

/// Print the most recent commits and the files they touched.
async fn run_commits(repo: &Path, n: usize) -> Result<(), Box<dyn std::error::Error>> {
    let git_client = git::GitClient::open(repo).await?;
    let commits = git_client.recent_commits(n).await?;
    info!(repo = %git_client.repo_path().display(), commits = commits.len(), "loaded commits");

    println!();
    println!("{}", format!("═══ Last {} commits ═══", commits.len()).bold());
    for commit in &commits {
        println!("{} - {}", commit.hash.yellow(), commit.author);
        if let Some(date) = commit.date {
            println!("   {}", date.format("%Y-%m-%d %H:%M"));
        }
        println!("   {}", commit.message);
        if !commit.changed_files.is_empty() {
            println!("   Files changed: {}", commit.changed_files.len());
            for file in commit.changed_files.iter().take(3) {
                println!("     - {file}");
            }
        }
        println!();
    }
    Ok(())
}

/// Ask for improvement suggestions for each file matching `pattern`.
async fn run_improve(
    config: &config::Config,
    repo: &Path,
    client: &dyn AnalysisClient,
    pattern: &str,
    max_files: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = project::find_files(repo, pattern)?;
    if files.is_empty() {
        return Err(format!("no files match {pattern}").into());
    }
    if files.len() > max_files {
        warn!(matched = files.len(), max_files, "limiting improvement requests");
    }

    let context = analysis::prompt::project_context(config.project.description.as_deref(), None, None);
    for (relative, path) in files.into_iter().take(max_files) {
        let code = project::read_source(&path, config.project.max_file_bytes)?;
        let prompt = analysis::prompt::improvement_prompt(&relative, &code, &context);
        info!(file = %relative, "requesting suggestions");
        let reply = client.complete(&prompt).await?;
        let suggestions = analysis::parse_suggestions(&reply);

        println!();
        println!("{}", format!("═══ {relative} ═══").bold());
        if suggestions.is_empty() {
            println!("  No suggestions.");
        }
        for suggestion in &suggestions {
            println!("  • {suggestion}");
        }
    }
    println!();
    Ok(())
}
