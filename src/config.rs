/*!
 * Configuration types for tdoc-harvest
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use harvest_core_resilience::RetryPolicy;
use regex::Regex;

use crate::error::{HarvestError, Result};

/// Smallest accepted folder-name bound; keeps room for the hash suffix
/// and the "Unknown" fallback.
pub const MIN_FOLDER_NAME_LEN: usize = 16;

/// Main configuration for a harvest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Archive host name
    #[serde(default = "default_host")]
    pub host: String,

    /// Control connection port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Local root for downloads and category folders
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Remote directory to harvest (None = choose interactively)
    #[serde(default)]
    pub remote_dir: Option<String>,

    /// Where interactive navigation starts
    #[serde(default = "default_start_path")]
    pub start_path: String,

    /// Header label of the identifier column
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Header label of the category column
    #[serde(default = "default_category_column")]
    pub category_column: String,

    /// Regex selecting the manifest from the remote file listing
    #[serde(default = "default_manifest_pattern")]
    pub manifest_pattern: String,

    /// Extension (without dot) of the archives to download
    #[serde(default = "default_archive_extension")]
    pub archive_extension: String,

    /// Attempts allowed when (re)connecting
    #[serde(default = "default_attempts")]
    pub connect_attempts: u32,

    /// Attempts allowed per file download
    #[serde(default = "default_attempts")]
    pub transfer_attempts: u32,

    /// Pause between attempts in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Control socket read/write timeout in seconds
    #[serde(default = "default_io_timeout")]
    pub io_timeout_secs: u64,

    /// Maximum length of a category folder name
    #[serde(default = "default_max_folder_name_len")]
    pub max_folder_name_len: usize,

    /// Show a progress bar while downloading archives
    #[serde(default = "default_true")]
    pub show_progress: bool,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    /// Write the run summary as JSON to this path
    #[serde(default)]
    pub summary_path: Option<PathBuf>,

    /// Settings for the `summarize` command
    #[serde(default)]
    pub summarize: SummarizeConfig,
}

/// Settings for summarizing a folder of documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizeConfig {
    /// Base URL of the generative language API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model used for every completion
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Extension (without dot) of the documents to summarize
    #[serde(default = "default_document_extension")]
    pub document_extension: String,

    /// Characters of document text sent with each summary request
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// Attempts per completion request
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// First pause between completion attempts; doubles each retry
    #[serde(default = "default_completion_delay")]
    pub retry_delay_secs: u64,

    /// Longest pause between completion attempts
    #[serde(default = "default_completion_max_delay")]
    pub max_retry_delay_secs: u64,

    /// HTTP request timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// File name of the HTML report, written into the analysed folder
    #[serde(default = "default_report_name")]
    pub report_name: String,

    /// Keep a JSON copy of the results under `backups/`
    #[serde(default = "default_true")]
    pub save_backup: bool,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            document_extension: default_document_extension(),
            max_input_chars: default_max_input_chars(),
            attempts: default_attempts(),
            retry_delay_secs: default_completion_delay(),
            max_retry_delay_secs: default_completion_max_delay(),
            request_timeout_secs: default_request_timeout(),
            report_name: default_report_name(),
            save_backup: true,
        }
    }
}

impl SummarizeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() || self.model.trim().is_empty() {
            return Err(HarvestError::Config(
                "summarize endpoint and model must not be empty".to_string(),
            ));
        }
        if self.attempts == 0 {
            return Err(HarvestError::Config(
                "summarize attempts must be at least 1".to_string(),
            ));
        }
        if self.max_input_chars == 0 || self.request_timeout_secs == 0 {
            return Err(HarvestError::Config(
                "max_input_chars and request_timeout_secs must be at least 1".to_string(),
            ));
        }
        let plain_name = Path::new(&self.report_name)
            .file_name()
            .is_some_and(|name| name == self.report_name.as_str());
        if !plain_name {
            return Err(HarvestError::Config(format!(
                "report_name must be a plain file name, got '{}'",
                self.report_name
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retry policy for completion requests; rate limits need a growing pause
    pub fn completion_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.attempts,
            Duration::from_secs(self.retry_delay_secs),
            Duration::from_secs(self.max_retry_delay_secs),
        )
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            output_dir: default_output_dir(),
            remote_dir: None,
            start_path: default_start_path(),
            id_column: default_id_column(),
            category_column: default_category_column(),
            manifest_pattern: default_manifest_pattern(),
            archive_extension: default_archive_extension(),
            connect_attempts: default_attempts(),
            transfer_attempts: default_attempts(),
            retry_delay_secs: default_retry_delay(),
            io_timeout_secs: default_io_timeout(),
            max_folder_name_len: default_max_folder_name_len(),
            show_progress: true,
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
            summary_path: None,
            summarize: SummarizeConfig::default(),
        }
    }
}

/// Named choice of category column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryPreset {
    /// Sort by document type
    #[default]
    Type,

    /// Sort by agenda item
    Agenda,
}

impl CategoryPreset {
    /// Header label this preset sorts by
    pub fn column(&self) -> &'static str {
        match self {
            CategoryPreset::Type => "Type",
            CategoryPreset::Agenda => "Agenda item",
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "ftp.3gpp.org".to_string()
}

fn default_port() -> u16 {
    21
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./downloaded_files")
}

fn default_start_path() -> String {
    "/".to_string()
}

fn default_id_column() -> String {
    "TDoc".to_string()
}

fn default_category_column() -> String {
    CategoryPreset::Type.column().to_string()
}

fn default_manifest_pattern() -> String {
    r"^TDoc_List.*\.xlsx$".to_string()
}

fn default_archive_extension() -> String {
    "zip".to_string()
}

fn default_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5
}

fn default_io_timeout() -> u64 {
    60
}

fn default_max_folder_name_len() -> usize {
    50
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-pro".to_string()
}

fn default_api_key_env() -> String {
    "GOOGLE_AI_API_KEY".to_string()
}

fn default_document_extension() -> String {
    "docx".to_string()
}

fn default_max_input_chars() -> usize {
    50_000
}

fn default_completion_delay() -> u64 {
    2
}

fn default_completion_max_delay() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    120
}

fn default_report_name() -> String {
    "document_analysis_report.html".to_string()
}

impl HarvestConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: HarvestConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| HarvestError::Config(format!("TOML encode error: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Default config file location (`<config dir>/tdoc-harvest/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tdoc-harvest").join("config.toml"))
    }

    /// Load from `path`, or from the default location if it exists, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::from_file(&default),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(HarvestError::Config("host must not be empty".to_string()));
        }
        if self.id_column.is_empty() || self.category_column.is_empty() {
            return Err(HarvestError::Config(
                "identifier and category column labels must not be empty".to_string(),
            ));
        }
        if self.id_column == self.category_column {
            return Err(HarvestError::Config(format!(
                "identifier and category columns must differ (both '{}')",
                self.id_column
            )));
        }
        if self.connect_attempts == 0 || self.transfer_attempts == 0 {
            return Err(HarvestError::Config(
                "attempt counts must be at least 1".to_string(),
            ));
        }
        if self.io_timeout_secs == 0 {
            return Err(HarvestError::Config(
                "io_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.max_folder_name_len < MIN_FOLDER_NAME_LEN {
            return Err(HarvestError::Config(format!(
                "max_folder_name_len must be at least {}",
                MIN_FOLDER_NAME_LEN
            )));
        }
        if self.archive_extension.trim_start_matches('.').is_empty() {
            return Err(HarvestError::Config(
                "archive_extension must not be empty".to_string(),
            ));
        }
        self.manifest_regex()?;
        Ok(())
    }

    /// Compiled manifest file pattern
    pub fn manifest_regex(&self) -> Result<Regex> {
        Ok(Regex::new(&self.manifest_pattern)?)
    }

    /// Pause between attempts
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Control socket timeout
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }

    /// Retry policy for connecting and reconnecting
    pub fn connect_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.connect_attempts, self.retry_delay())
    }

    /// Retry policy for single-file downloads
    pub fn transfer_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.transfer_attempts, self.retry_delay())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = HarvestConfig::default();
        assert_eq!(config.host, "ftp.3gpp.org");
        assert_eq!(config.port, 21);
        assert_eq!(config.id_column, "TDoc");
        assert_eq!(config.category_column, "Type");
        assert_eq!(config.max_folder_name_len, 50);
        assert!(config.remote_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_attempts(), 3);
        assert_eq!(default_retry_delay(), 5);
        assert_eq!(default_start_path(), "/");
        assert_eq!(HarvestConfig::default().io_timeout(), Duration::from_secs(60));
        assert!(default_true());
    }

    #[test]
    fn test_presets() {
        assert_eq!(CategoryPreset::Type.column(), "Type");
        assert_eq!(CategoryPreset::Agenda.column(), "Agenda item");
        assert_eq!(CategoryPreset::default(), CategoryPreset::Type);
    }

    #[test]
    fn test_policies_follow_config() {
        let config = HarvestConfig {
            connect_attempts: 4,
            transfer_attempts: 2,
            retry_delay_secs: 7,
            ..Default::default()
        };
        let connect = config.connect_policy();
        assert_eq!(connect.max_attempts, 4);
        assert_eq!(connect.delay_after(1), Duration::from_secs(7));
        assert_eq!(config.transfer_policy().max_attempts, 2);
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let short_names = HarvestConfig {
            max_folder_name_len: 8,
            ..Default::default()
        };
        assert!(matches!(
            short_names.validate(),
            Err(HarvestError::Config(_))
        ));

        let bad_pattern = HarvestConfig {
            manifest_pattern: "TDoc_List(".to_string(),
            ..Default::default()
        };
        assert!(bad_pattern.validate().is_err());

        let same_columns = HarvestConfig {
            category_column: "TDoc".to_string(),
            ..Default::default()
        };
        assert!(same_columns.validate().is_err());

        let no_attempts = HarvestConfig {
            transfer_attempts: 0,
            ..Default::default()
        };
        assert!(no_attempts.validate().is_err());

        let no_timeout = HarvestConfig {
            io_timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            no_timeout.validate(),
            Err(HarvestError::Config(ref msg)) if msg.contains("io_timeout_secs")
        ));
    }

    #[test]
    fn test_manifest_regex_default() {
        let re = HarvestConfig::default().manifest_regex().unwrap();
        assert!(re.is_match("TDoc_List_Meeting_SA1#105.xlsx"));
        assert!(!re.is_match("S1-241001.zip"));
        assert!(!re.is_match("Agenda_TDoc_List.xlsx"));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = HarvestConfig {
            remote_dir: Some("/tsg_sa/WG1_Serv/TSGS1_105/Docs".to_string()),
            category_column: "Agenda item".to_string(),
            ..Default::default()
        };
        config.to_file(&path).unwrap();

        let loaded = HarvestConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.remote_dir, config.remote_dir);
        assert_eq!(loaded.category_column, "Agenda item");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
host = "ftp.example.org"
category_column = "Agenda item"
retry_delay_secs = 1
log_level = "debug"
"#;
        let config: HarvestConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "ftp.example.org");
        assert_eq!(config.category_column, "Agenda item");
        assert_eq!(config.retry_delay_secs, 1);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.id_column, "TDoc");
        assert_eq!(config.transfer_attempts, 3);
        assert!(config.show_progress);
    }

    #[test]
    fn test_summarize_section() {
        let toml_str = r#"
host = "ftp.example.org"

[summarize]
model = "gemini-1.5-flash"
attempts = 5
"#;
        let config: HarvestConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.summarize.model, "gemini-1.5-flash");
        assert_eq!(config.summarize.attempts, 5);
        assert_eq!(config.summarize.api_key_env, "GOOGLE_AI_API_KEY");
        assert_eq!(config.summarize.report_name, "document_analysis_report.html");
        assert!(config.summarize.save_backup);

        let policy = config.summarize.completion_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(10), Duration::from_secs(60));
    }

    #[test]
    fn test_summarize_validation() {
        assert!(SummarizeConfig::default().validate().is_ok());

        let nested_report = SummarizeConfig {
            report_name: "../report.html".to_string(),
            ..Default::default()
        };
        assert!(nested_report.validate().is_err());

        let no_attempts = SummarizeConfig {
            attempts: 0,
            ..Default::default()
        };
        assert!(no_attempts.validate().is_err());
    }
}
