/*!
 * End-to-end harvest run
 *
 * connect → choose directory → fetch manifest → index → for each archive:
 * fetch, then file and extract. One session is threaded through every
 * step; only the loss of that session, or a failure to list the chosen
 * directory, ends the run early.
 */

use std::fs;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogIndexer, CategoryMap, ManifestReader};
use crate::config::HarvestConfig;
use crate::connection::ConnectionManager;
use crate::distribute::{identifier_for, ArchiveDistributor, DistributionOutcome};
use crate::error::{HarvestError, Result};
use crate::navigator::{Console, DirectoryNavigator};
use crate::remote::{normalize_path, Connector, RemoteSession};
use crate::sanitize::NameSanitizer;
use crate::stats::{ManifestStatus, RunSummary};
use crate::transfer::{ResilientTransfer, TransferOutcome};

/// Last path component of a listed name, if it is usable as a file name
pub fn local_file_name(listed: &str) -> Option<&str> {
    listed
        .rsplit('/')
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

/// First listed name matching the manifest pattern
pub fn find_manifest<'a>(names: &'a [String], pattern: &Regex) -> Option<&'a str> {
    names
        .iter()
        .map(String::as_str)
        .find(|name| local_file_name(name).is_some_and(|base| pattern.is_match(base)))
}

/// Listed names carrying the archive extension, in listing order
pub fn archive_names<'a>(names: &'a [String], extension: &str) -> Vec<&'a str> {
    let extension = extension.trim_start_matches('.');
    names
        .iter()
        .map(String::as_str)
        .filter(|name| {
            local_file_name(name)
                .and_then(|base| Path::new(base).extension())
                .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
        })
        .collect()
}

pub struct Pipeline {
    config: HarvestConfig,
    manager: ConnectionManager,
    reader: Box<dyn ManifestReader>,
}

impl Pipeline {
    pub fn new(
        config: HarvestConfig,
        connector: Box<dyn Connector>,
        reader: Box<dyn ManifestReader>,
    ) -> Self {
        let manager = ConnectionManager::new(connector, config.host.clone(), config.connect_policy());
        Self {
            config,
            manager,
            reader,
        }
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Run one harvest. `console` is only consulted when no remote
    /// directory is configured.
    pub fn run(&self, console: &mut dyn Console) -> Result<RunSummary> {
        let config = &self.config;
        let mut summary = RunSummary::new(&config.host, &config.output_dir);

        let session = self.manager.connect()?;
        let (session, remote_dir) = match &config.remote_dir {
            Some(dir) => (session, normalize_path(dir)),
            None => DirectoryNavigator::new(&self.manager, config.connect_policy()).navigate(
                session,
                &config.start_path,
                console,
            )?,
        };
        summary.remote_dir = remote_dir.clone();
        info!(host = %config.host, path = %remote_dir, "harvesting directory");

        if let Err(e) = fs::create_dir_all(&config.output_dir) {
            session.close();
            return Err(e.into());
        }

        let (session, listed) = self.manager.with_session(
            session,
            &config.transfer_policy(),
            "list files",
            |s| {
                s.change_dir(&remote_dir)?;
                s.name_list()
            },
        )?;
        let names = match listed {
            Ok(names) => names,
            Err(e) => {
                session.close();
                return Err(e);
            }
        };
        debug!(entries = names.len(), "directory listed");

        let transfer = ResilientTransfer::new(&self.manager, config.transfer_policy());
        let (session, categories) = self.load_manifest(session, &transfer, &names, &mut summary)?;

        let session = self.harvest_archives(session, &transfer, &names, &categories, &mut summary)?;

        session.close();
        summary.finish();
        info!(
            downloaded = summary.downloaded,
            failed = summary.download_failed,
            distributed = summary.distributed,
            unclassified = summary.unclassified,
            "harvest finished"
        );
        Ok(summary)
    }

    /// Fetch and index the manifest. Every failure short of losing the
    /// session degrades to an empty map.
    fn load_manifest(
        &self,
        session: RemoteSession,
        transfer: &ResilientTransfer<'_>,
        names: &[String],
        summary: &mut RunSummary,
    ) -> Result<(RemoteSession, CategoryMap)> {
        let config = &self.config;
        let pattern = config.manifest_regex()?;

        let Some(listed) = find_manifest(names, &pattern) else {
            warn!(pattern = %config.manifest_pattern, "no manifest in directory, archives will not be classified");
            summary.manifest_status = ManifestStatus::NotFound;
            return Ok((session, CategoryMap::new()));
        };
        let local_name = local_file_name(listed).unwrap_or(listed);
        summary.manifest = Some(local_name.to_string());

        let local_path = config.output_dir.join(local_name);
        let (session, outcome) = transfer.fetch(session, listed, &local_path)?;
        if let TransferOutcome::Failed { reason, .. } = outcome {
            warn!(file = listed, %reason, "manifest download failed, archives will not be classified");
            summary.manifest_status = ManifestStatus::DownloadFailed;
            return Ok((session, CategoryMap::new()));
        }

        let indexer = CatalogIndexer::new(
            config.id_column.as_str(),
            config.category_column.as_str(),
            NameSanitizer::new(config.max_folder_name_len),
        );
        let indexed = self
            .reader
            .read_rows(&local_path)
            .and_then(|rows| indexer.build_index(&rows));

        let categories = match indexed {
            Ok(map) => {
                summary.manifest_status = ManifestStatus::Indexed;
                summary.index_entries = map.len();
                summary.categories = map.categories().len();
                map
            }
            Err(e @ HarvestError::ManifestSchema { .. }) => {
                warn!(file = local_name, error = %e, "archives will not be classified");
                summary.manifest_status = ManifestStatus::SchemaMismatch;
                CategoryMap::new()
            }
            Err(e) => {
                warn!(file = local_name, error = %e, "manifest unreadable, archives will not be classified");
                summary.manifest_status = ManifestStatus::Unreadable;
                CategoryMap::new()
            }
        };
        Ok((session, categories))
    }

    fn harvest_archives(
        &self,
        mut session: RemoteSession,
        transfer: &ResilientTransfer<'_>,
        names: &[String],
        categories: &CategoryMap,
        summary: &mut RunSummary,
    ) -> Result<RemoteSession> {
        let archives = archive_names(names, &self.config.archive_extension);
        summary.archives_found = archives.len();
        info!(count = archives.len(), "archives to download");

        let mut distributor = ArchiveDistributor::new(&self.config.output_dir);
        let progress = self.progress_bar(archives.len() as u64);

        for listed in archives {
            let Some(local_name) = local_file_name(listed) else {
                warn!(file = listed, "unusable file name, skipping");
                summary.record_download_failure(listed);
                progress.inc(1);
                continue;
            };
            progress.set_message(local_name.to_string());

            let local_path = self.config.output_dir.join(local_name);
            let (live, outcome) = match transfer.fetch(session, listed, &local_path) {
                Ok(result) => result,
                Err(e) => {
                    progress.abandon();
                    return Err(e);
                }
            };
            session = live;

            match outcome {
                TransferOutcome::Success { bytes, .. } => {
                    summary.downloaded += 1;
                    summary.bytes_downloaded += bytes;
                }
                TransferOutcome::Failed { .. } => {
                    summary.record_download_failure(listed);
                    progress.inc(1);
                    continue;
                }
            }

            if categories.is_empty() {
                summary.unclassified += 1;
            } else {
                match distributor.distribute(&local_path, &identifier_for(local_name), categories) {
                    DistributionOutcome::Filed { .. } => summary.distributed += 1,
                    DistributionOutcome::Unclassified => summary.unclassified += 1,
                    DistributionOutcome::Failed { .. } => summary.distribution_failed += 1,
                }
            }
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok(session)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.config.show_progress || !console::Term::stderr().is_term() {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar
    }
}
