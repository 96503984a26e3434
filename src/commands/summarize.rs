/*!
 * Summarize command: analyse a folder of documents into an HTML report
 *
 * Typically pointed at a category folder produced by a harvest run. The
 * report and a JSON backup of the results are written into that folder.
 */

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};

use crate::cli_style::{analysis_table, print_info, print_warning, section_header};
use crate::config::SummarizeConfig;
use crate::error::{HarvestError, Result};
use crate::summarize::{
    find_documents, render_report, AnalysisReport, DocumentAnalyzer, DocumentReader, DocxReader,
    GeminiClient, TextCompletion,
};

/// What a summarize run left on disk
#[derive(Debug)]
pub struct SummarizeRun {
    pub report: AnalysisReport,
    pub report_path: PathBuf,
    pub backup_path: Option<PathBuf>,
}

/// The explicit key if given, else the configured environment variable
pub fn resolve_api_key(explicit: Option<String>, env_var: &str) -> Result<String> {
    explicit
        .filter(|key| !key.trim().is_empty())
        .or_else(|| std::env::var(env_var).ok().filter(|key| !key.trim().is_empty()))
        .ok_or_else(|| {
            HarvestError::Config(format!(
                "No API key: pass --api-key or set the {} environment variable",
                env_var
            ))
        })
}

/// Analyse every document in `folder` and write the report into it
pub fn summarize_folder(
    config: &SummarizeConfig,
    folder: &Path,
    reader: &dyn DocumentReader,
    completion: &dyn TextCompletion,
) -> Result<SummarizeRun> {
    if !folder.is_dir() {
        return Err(HarvestError::Config(format!(
            "Input folder does not exist: {}",
            folder.display()
        )));
    }

    let documents = find_documents(folder, &config.document_extension)?;
    info!(folder = %folder.display(), count = documents.len(), "documents found");
    if documents.is_empty() {
        warn!(extension = %config.document_extension, "no documents to summarize");
    }

    let analyzer = DocumentAnalyzer::new(
        reader,
        completion,
        config.completion_policy(),
        config.max_input_chars,
    );
    let report = analyzer.analyze(&documents);
    let at = Local::now();

    let backup_path = if config.save_backup {
        match report.write_backup(&folder.join("backups"), at) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "could not write analysis backup");
                None
            }
        }
    } else {
        None
    };

    let report_path = folder.join(&config.report_name);
    let html = render_report(&report, &at.format("%Y-%m-%d %H:%M:%S").to_string());
    fs::write(&report_path, html)?;
    info!(path = %report_path.display(), "report written");

    Ok(SummarizeRun {
        report,
        report_path,
        backup_path,
    })
}

/// Entry point for `tdoc-harvest summarize`; returns the process exit code
pub fn run_summarize(config: &SummarizeConfig, folder: &Path, api_key: Option<String>) -> Result<i32> {
    config.validate()?;
    let key = resolve_api_key(api_key, &config.api_key_env)?;
    let client = GeminiClient::new(&config.endpoint, &config.model, key, config.request_timeout())?;

    section_header("Document analysis");
    print_info(&format!("Summarizing {} with {}", folder.display(), config.model));

    let run = summarize_folder(config, folder, &DocxReader, &client)?;

    println!();
    println!("{}", analysis_table(&run.report, &run.report_path));
    for failure in &run.report.failures {
        print_warning(&format!("{}: {}", failure.file_name, failure.reason));
    }
    if let Some(ref backup) = run.backup_path {
        print_info(&format!("Backup saved to {}", backup.display()));
    }
    Ok(run.report.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EXIT_PARTIAL, EXIT_SUCCESS};
    use crate::summarize::mock::{MemoryReader, ScriptedCompletion};
    use tempfile::tempdir;

    fn quick_config() -> SummarizeConfig {
        SummarizeConfig {
            retry_delay_secs: 0,
            max_retry_delay_secs: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_summarize_folder_writes_report_and_backup() {
        let dir = tempdir().unwrap();
        for name in ["S1-001.docx", "S1-002.docx", "S1-001.zip"] {
            fs::write(dir.path().join(name), "package").unwrap();
        }
        let reader = MemoryReader::default()
            .with("S1-001.docx", "Source: Alpha\nKey handling")
            .with("S1-002.docx", "Source: Beta\nKey rotation");
        let completion = ScriptedCompletion::default();

        let run = summarize_folder(&quick_config(), dir.path(), &reader, &completion).unwrap();

        assert_eq!(run.report.documents_found, 2);
        assert_eq!(run.report.summaries.len(), 2);
        assert_eq!(run.report.exit_code(), EXIT_SUCCESS);
        assert_eq!(run.report_path, dir.path().join("document_analysis_report.html"));

        let html = fs::read_to_string(&run.report_path).unwrap();
        assert!(html.contains("<h3>S1-001.docx</h3>"));
        assert!(html.contains("<h3>S1-002.docx</h3>"));

        let backup = run.backup_path.unwrap();
        assert_eq!(backup.parent().unwrap(), dir.path().join("backups"));
        assert!(backup.exists());
    }

    #[test]
    fn test_summarize_empty_folder_still_reports() {
        let dir = tempdir().unwrap();
        let config = SummarizeConfig {
            save_backup: false,
            ..quick_config()
        };
        let completion = ScriptedCompletion::default();

        let run = summarize_folder(&config, dir.path(), &MemoryReader::default(), &completion).unwrap();

        assert_eq!(run.report.documents_found, 0);
        assert!(run.backup_path.is_none());
        assert!(!dir.path().join("backups").exists());
        assert!(run.report_path.exists());
        assert!(completion.prompts.borrow().is_empty());
    }

    #[test]
    fn test_unreadable_document_makes_run_partial() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("S1-001.docx"), "package").unwrap();
        fs::write(dir.path().join("S1-009.docx"), "package").unwrap();
        let reader = MemoryReader::default().with("S1-001.docx", "Key handling");

        let run = summarize_folder(&quick_config(), dir.path(), &reader, &ScriptedCompletion::default())
            .unwrap();

        assert_eq!(run.report.summaries.len(), 1);
        assert_eq!(run.report.failures[0].file_name, "S1-009.docx");
        assert_eq!(run.report.exit_code(), EXIT_PARTIAL);
        let html = fs::read_to_string(&run.report_path).unwrap();
        assert!(html.contains("Not summarized"));
    }

    #[test]
    fn test_missing_folder_is_config_error() {
        let dir = tempdir().unwrap();
        let result = summarize_folder(
            &quick_config(),
            &dir.path().join("absent"),
            &MemoryReader::default(),
            &ScriptedCompletion::default(),
        );
        assert!(matches!(result, Err(HarvestError::Config(_))));
    }

    #[test]
    fn test_resolve_api_key() {
        assert_eq!(
            resolve_api_key(Some("abc".to_string()), "TDOC_HARVEST_UNSET_KEY_VAR").unwrap(),
            "abc"
        );
        let err = resolve_api_key(Some("  ".to_string()), "TDOC_HARVEST_UNSET_KEY_VAR").unwrap_err();
        assert!(err.to_string().contains("TDOC_HARVEST_UNSET_KEY_VAR"));
        assert!(resolve_api_key(None, "TDOC_HARVEST_UNSET_KEY_VAR").is_err());
    }
}
