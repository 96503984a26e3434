/*!
 * Filing downloaded archives into category folders
 */

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::catalog::CategoryMap;
use crate::error::{HarvestError, Result};

/// What happened to one archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributionOutcome {
    /// Moved into `folder` and unpacked there
    Filed {
        category: String,
        folder: PathBuf,
        extracted: usize,
    },
    /// Identifier not in the manifest; archive left where it was
    Unclassified,
    /// Move or extraction failed
    Failed { reason: String },
}

/// Archive identifier: the file name without its extension
pub fn identifier_for(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

/// Unpack every entry of `archive` under `dest`, keeping internal paths.
///
/// Entries whose names would land outside `dest` make the whole archive
/// fail. Returns the number of entries.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize> {
    let archive_error = |message: String| HarvestError::Archive {
        path: archive.to_path_buf(),
        message,
    };

    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| archive_error(e.to_string()))?;
    let entries = zip.len();
    zip.extract(dest).map_err(|e| archive_error(e.to_string()))?;
    Ok(entries)
}

/// Moves archives into lazily created category folders under one root
#[derive(Debug)]
pub struct ArchiveDistributor {
    root: PathBuf,
    folders: HashMap<String, PathBuf>,
}

impl ArchiveDistributor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            folders: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Category folders created (or reused) so far
    pub fn folders(&self) -> &HashMap<String, PathBuf> {
        &self.folders
    }

    /// File `archive` under the category of `identifier`.
    ///
    /// Unknown identifiers leave the archive untouched and create nothing.
    /// Failures are logged and reported in the outcome.
    pub fn distribute(
        &mut self,
        archive: &Path,
        identifier: &str,
        categories: &CategoryMap,
    ) -> DistributionOutcome {
        let Some(category) = categories.get(identifier) else {
            warn!(identifier, file = %archive.display(), "identifier not in manifest, leaving archive in place");
            return DistributionOutcome::Unclassified;
        };

        match self.file_into(archive, category) {
            Ok((folder, extracted)) => {
                info!(identifier, category, extracted, "archive filed");
                DistributionOutcome::Filed {
                    category: category.to_string(),
                    folder,
                    extracted,
                }
            }
            Err(e) => {
                warn!(identifier, category, file = %archive.display(), error = %e, "could not file archive");
                DistributionOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn file_into(&mut self, archive: &Path, category: &str) -> Result<(PathBuf, usize)> {
        let folder = self.category_folder(category)?;
        let file_name = archive.file_name().ok_or_else(|| HarvestError::Archive {
            path: archive.to_path_buf(),
            message: "path has no file name".to_string(),
        })?;

        let target = folder.join(file_name);
        fs::rename(archive, &target)?;
        debug!(from = %archive.display(), to = %target.display(), "archive moved");

        let extracted = extract_archive(&target, &folder)?;
        Ok((folder, extracted))
    }

    /// Folder for `category`, created on first use
    pub fn category_folder(&mut self, category: &str) -> Result<PathBuf> {
        if let Some(folder) = self.folders.get(category) {
            return Ok(folder.clone());
        }
        let folder = self.root.join(category);
        fs::create_dir_all(&folder)?;
        debug!(category, folder = %folder.display(), "category folder ready");
        self.folders.insert(category.to_string(), folder.clone());
        Ok(folder)
    }
}
