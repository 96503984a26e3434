/*!
 * Per-run statistics
 */

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, EXIT_PARTIAL, EXIT_SUCCESS};

/// What became of the manifest spreadsheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    /// Downloaded and indexed
    Indexed,
    /// No listed name matched the manifest pattern
    NotFound,
    /// Every download attempt failed
    DownloadFailed,
    /// The workbook could not be opened or parsed
    Unreadable,
    /// No header row with both configured columns
    SchemaMismatch,
}

impl ManifestStatus {
    /// Whether archives went unclassified because something failed
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ManifestStatus::DownloadFailed | ManifestStatus::Unreadable
        )
    }
}

impl std::fmt::Display for ManifestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ManifestStatus::Indexed => "indexed",
            ManifestStatus::NotFound => "not found",
            ManifestStatus::DownloadFailed => "download failed",
            ManifestStatus::Unreadable => "unreadable",
            ManifestStatus::SchemaMismatch => "columns not found",
        };
        f.write_str(text)
    }
}

/// Counters for one harvest run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub host: String,
    pub remote_dir: String,
    pub output_dir: PathBuf,
    pub manifest: Option<String>,
    pub manifest_status: ManifestStatus,
    /// Identifiers in the category map
    pub index_entries: usize,
    /// Distinct category folders in the map
    pub categories: usize,
    pub archives_found: usize,
    pub downloaded: usize,
    pub download_failed: usize,
    pub distributed: usize,
    pub unclassified: usize,
    /// Archives that could not be moved or extracted
    pub distribution_failed: usize,
    pub bytes_downloaded: u64,
    /// Remote names of archives that did not make it to disk
    pub failed_files: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    pub fn new(host: &str, output_dir: &Path) -> Self {
        Self {
            host: host.to_string(),
            remote_dir: String::new(),
            output_dir: output_dir.to_path_buf(),
            manifest: None,
            manifest_status: ManifestStatus::NotFound,
            index_entries: 0,
            categories: 0,
            archives_found: 0,
            downloaded: 0,
            download_failed: 0,
            distributed: 0,
            unclassified: 0,
            distribution_failed: 0,
            bytes_downloaded: 0,
            failed_files: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Record a failed archive download
    pub fn record_download_failure(&mut self, name: &str) {
        self.download_failed += 1;
        self.failed_files.push(name.to_string());
    }

    /// Stamp the end time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock seconds between start and finish (or now)
    pub fn elapsed_secs(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
    }

    /// Whether anything failed along the way
    pub fn has_failures(&self) -> bool {
        self.download_failed > 0 || self.distribution_failed > 0 || self.manifest_status.is_failure()
    }

    /// `EXIT_PARTIAL` when any file was lost to a failure
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            EXIT_PARTIAL
        } else {
            EXIT_SUCCESS
        }
    }

    /// Write the summary as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
