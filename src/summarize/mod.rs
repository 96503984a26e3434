/*!
 * Document folder analysis
 *
 * Summarizes every document in a local folder through a text completion
 * service, then asks the service for a cross-document comparison and a
 * prioritised list of discussion points. The results feed an HTML report
 * (see [`report`]).
 *
 * Both collaborators sit behind traits: [`DocumentReader`] turns a file into
 * plain text and [`TextCompletion`] answers a prompt. Production uses
 * [`DocxReader`] and [`GeminiClient`].
 */

pub mod docx;
pub mod gemini;
pub mod report;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use harvest_core_resilience::RetryPolicy;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{HarvestError, Result, EXIT_PARTIAL, EXIT_SUCCESS};

pub use docx::DocxReader;
pub use gemini::GeminiClient;
pub use report::render_report;

/// Produces the plain text of one document
pub trait DocumentReader {
    fn read_text(&self, path: &Path) -> Result<String>;
}

/// Answers a single prompt
pub trait TextCompletion {
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Model summary of one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub file_name: String,
    pub summary: String,
}

/// A document that produced no summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentFailure {
    pub file_name: String,
    pub reason: String,
}

/// Everything one analysis run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReport {
    pub documents_found: usize,
    pub summaries: Vec<DocumentSummary>,
    pub failures: Vec<DocumentFailure>,
    pub cross_document_analysis: Option<String>,
    pub discussion_points: Option<String>,
}

impl AnalysisReport {
    /// Partial when any document or aggregate step failed
    pub fn exit_code(&self) -> i32 {
        let aggregates_missing = !self.summaries.is_empty()
            && (self.cross_document_analysis.is_none() || self.discussion_points.is_none());
        if self.failures.is_empty() && !aggregates_missing {
            EXIT_SUCCESS
        } else {
            EXIT_PARTIAL
        }
    }

    /// Write the results as JSON to `<dir>/analysis_backup_<timestamp>.json`
    pub fn write_backup(&self, dir: &Path, at: DateTime<Local>) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("analysis_backup_{}.json", at.format("%Y%m%d_%H%M%S")));
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "analysis backup written");
        Ok(path)
    }
}

/// Files in `folder` (not recursive) ending in `.<extension>`, sorted by name.
///
/// Word lock files (`~$name.docx`) are skipped.
pub fn find_documents(folder: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let wanted = extension.trim_start_matches('.');
    let mut documents = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches_ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted));
        let lock_file = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("~$"));
        if matches_ext && !lock_file {
            documents.push(path);
        }
    }
    documents.sort();
    Ok(documents)
}

/// First `max_chars` characters of `text`
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn summary_prompt(file_name: &str, text: &str) -> String {
    format!(
        "Analyse the following document and answer in exactly this format.\n\
         - Author: [the name(s) given as Source; list all of them]\n\
         - Overview: [a summary of about 100 characters]\n\
         - Main claims:\n  \
           1. [claim 1]\n  \
           2. [claim 2]\n  \
           3. [claim 3]\n\
         - Conclusion: [the document's conclusion or final position]\n\n\
         Document ({}):\n{}",
        file_name, text
    )
}

fn joined_summaries(summaries: &[DocumentSummary]) -> String {
    summaries
        .iter()
        .map(|s| format!("Document: {}\n{}", s.file_name, s.summary))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn cross_document_prompt(summaries: &[DocumentSummary]) -> String {
    format!(
        "Compare the following documents with each other and answer in this format.\n\n\
         1. Overview table\n\
         | Document | Author | Main claims | Conclusion | Keywords |\n\
         |----------|--------|-------------|------------|----------|\n\
         [one row per document]\n\n\
         2. Common themes\n\
         - [themes discussed by more than one document]\n\n\
         3. Position comparison\n\
         | Theme | Position of each document |\n\
         |-------|---------------------------|\n\
         [one row per major theme]\n\n\
         4. Differences\n\
         - [main disagreements between documents]\n\n\
         5. Shared understanding\n\
         - [assumptions and views all documents agree on]\n\n\
         6. Open issues\n\
         - [questions the documents leave for further study]\n\n\
         Documents:\n{}",
        joined_summaries(summaries)
    )
}

pub fn discussion_prompt(summaries: &[DocumentSummary]) -> String {
    format!(
        "From the following documents, extract the important discussion points and rank them.\n\n\
         1. Critical discussion points\n\
         - [most urgent or important points]\n  \
           * Reason: [why it matters]\n  \
           * Documents: [which documents raise it]\n\n\
         2. Important discussion points\n\
         - [point]\n  \
           * Background: [context of the discussion]\n  \
           * Differing views: [if any]\n\n\
         3. Points for later study\n\
         - [point]\n  \
           * Open question: [what needs to be examined]\n\n\
         4. Supplementary points\n\
         - [other related points]\n\n\
         Documents:\n{}",
        joined_summaries(summaries)
    )
}

/// Summarizes a folder of documents
pub struct DocumentAnalyzer<'a> {
    reader: &'a dyn DocumentReader,
    completion: &'a dyn TextCompletion,
    policy: RetryPolicy,
    max_input_chars: usize,
}

impl<'a> DocumentAnalyzer<'a> {
    pub fn new(
        reader: &'a dyn DocumentReader,
        completion: &'a dyn TextCompletion,
        policy: RetryPolicy,
        max_input_chars: usize,
    ) -> Self {
        Self {
            reader,
            completion,
            policy,
            max_input_chars,
        }
    }

    /// Summarize each of `documents`, then aggregate across the summaries.
    ///
    /// A document that cannot be read or summarized is recorded as a failure
    /// and the rest carry on. Aggregation only runs when at least one
    /// summary exists; a failed aggregate step leaves its field `None`.
    pub fn analyze(&self, documents: &[PathBuf]) -> AnalysisReport {
        let mut report = AnalysisReport {
            documents_found: documents.len(),
            ..Default::default()
        };

        for (index, path) in documents.iter().enumerate() {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            info!(file = %file_name, index = index + 1, total = documents.len(), "summarizing document");

            match self.summarize_document(path, &file_name) {
                Ok(summary) => report.summaries.push(DocumentSummary { file_name, summary }),
                Err(e) => {
                    warn!(file = %file_name, error = %e, "document not summarized");
                    report.failures.push(DocumentFailure {
                        file_name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if report.summaries.is_empty() {
            warn!("no summaries produced, skipping cross-document analysis");
            return report;
        }

        report.cross_document_analysis = self.aggregate(
            "cross-document analysis",
            &cross_document_prompt(&report.summaries),
        );
        report.discussion_points =
            self.aggregate("discussion points", &discussion_prompt(&report.summaries));
        report
    }

    fn summarize_document(&self, path: &Path, file_name: &str) -> Result<String> {
        let text = self.reader.read_text(path)?;
        if text.trim().is_empty() {
            return Err(HarvestError::Document {
                path: path.to_path_buf(),
                message: "no text found".to_string(),
            });
        }
        let excerpt = truncate_chars(&text, self.max_input_chars);
        if excerpt.len() < text.len() {
            debug!(file = file_name, chars = self.max_input_chars, "document text truncated");
        }
        self.complete(&format!("summarize {}", file_name), &summary_prompt(file_name, excerpt))
    }

    fn aggregate(&self, operation: &str, prompt: &str) -> Option<String> {
        match self.complete(operation, prompt) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(operation, error = %e, "aggregate step failed");
                None
            }
        }
    }

    fn complete(&self, operation: &str, prompt: &str) -> Result<String> {
        let text = self
            .policy
            .run(operation, |_| self.completion.complete(prompt))?;
        Ok(text)
    }
}
