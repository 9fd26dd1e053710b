use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = ".repo-validator.toml";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No API key found: pass --api-key, set ANTHROPIC_API_KEY, or add api_key under [analysis] in .repo-validator.toml")]
    MissingCredential,
}

/// Top-level configuration loaded from .repo-validator.toml.
///
/// All fields are optional. Environment variables are folded in once by
/// `Config::load`; nothing else in the crate reads the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub report: ReportConfig,

    /// Install paths of external document tools. Passed through untouched.
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// API key. If None, falls back to ANTHROPIC_API_KEY.
    pub api_key: Option<String>,
    /// Model identifier. If None, falls back to CLAUDE_MODEL, then the built-in default.
    pub model: Option<String>,
    pub max_tokens: u32,
    pub base_url: String,
    /// Per-request timeout for the analysis call
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            max_tokens: 4000,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Free-form description of the project, prepended to every prompt
    pub description: Option<String>,
    /// Globs (relative to the repository root) counted in the project snapshot
    pub include_patterns: Vec<String>,
    /// Globs whose file contents are sent with the `full` analysis
    pub key_files: Vec<String>,
    /// Per-file cap on content sent to the model
    pub max_file_bytes: usize,
    /// Number of commits recorded in the repository snapshot
    pub recent_commits: usize,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            description: None,
            include_patterns: vec!["**/*.py".to_string(), "**/*.rs".to_string()],
            key_files: vec![
                "**/*{main,runner,parser,engine,pipeline,extractor,processor}*.{py,rs}".to_string(),
            ],
            max_file_bytes: 40_000,
            recent_commits: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    /// Formats rendered by `full` when --formats is not given
    pub formats: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
            formats: vec![
                "json".to_string(),
                "markdown".to_string(),
                "console".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsConfig {
    /// Falls back to TESSERACT_PATH
    pub tesseract_path: Option<String>,
    /// Falls back to POPPLER_PATH
    pub poppler_path: Option<String>,
}

impl Config {
    /// Load configuration from `path`, or from .repo-validator.toml in the
    /// current directory when no path is given. A missing default file yields
    /// the default config; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path without consulting the environment.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Fill unset or blank values from environment variables. File values win.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !is_blank(v));

        if self.analysis.api_key.as_deref().map_or(true, is_blank) {
            self.analysis.api_key = non_empty("ANTHROPIC_API_KEY");
        }
        if self.analysis.model.as_deref().map_or(true, is_blank) {
            self.analysis.model = non_empty("CLAUDE_MODEL");
        }
        if self.tools.tesseract_path.as_deref().map_or(true, is_blank) {
            self.tools.tesseract_path = non_empty("TESSERACT_PATH");
        }
        if self.tools.poppler_path.as_deref().map_or(true, is_blank) {
            self.tools.poppler_path = non_empty("POPPLER_PATH");
        }
    }

    /// Resolve the API key: the --api-key flag wins, then the config value
    /// (which already includes ANTHROPIC_API_KEY). Blank values are skipped.
    pub fn api_key(&self, flag: Option<&str>) -> Result<String, ConfigError> {
        flag.filter(|key| !is_blank(key))
            .or_else(|| self.analysis.api_key.as_deref().filter(|key| !is_blank(key)))
            .map(str::to_string)
            .ok_or(ConfigError::MissingCredential)
    }

    pub fn model(&self) -> &str {
        self.analysis.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
