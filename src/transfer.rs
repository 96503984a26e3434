/*!
 * Single-file downloads with retry
 */

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use harvest_core_resilience::RetryPolicy;
use tracing::{debug, info, warn};

use crate::connection::ConnectionManager;
use crate::error::Result;
use crate::remote::RemoteSession;

/// Verdict for one attempted file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success { bytes: u64, attempts: u32 },
    Failed { attempts: u32, reason: String },
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            TransferOutcome::Success { attempts, .. } | TransferOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Downloads named files from the session's working directory
pub struct ResilientTransfer<'a> {
    manager: &'a ConnectionManager,
    policy: RetryPolicy,
}

impl<'a> ResilientTransfer<'a> {
    pub fn new(manager: &'a ConnectionManager, policy: RetryPolicy) -> Self {
        Self { manager, policy }
    }

    /// Download `remote_name` to `local_path`.
    ///
    /// Each attempt starts from an empty file. A file that could not be
    /// fetched is reported as `Failed` and any partial content is removed;
    /// only the loss of the session itself is returned as an error.
    pub fn fetch(
        &self,
        session: RemoteSession,
        remote_name: &str,
        local_path: &Path,
    ) -> Result<(RemoteSession, TransferOutcome)> {
        let mut attempts = 0;
        let operation = format!("retrieve {}", remote_name);

        let (session, result) =
            self.manager
                .with_session(session, &self.policy, &operation, |s| {
                    attempts += 1;
                    debug!(file = remote_name, attempt = attempts, "downloading");
                    let mut writer = BufWriter::new(File::create(local_path)?);
                    let bytes = s.retrieve(remote_name, &mut writer)?;
                    writer.flush()?;
                    Ok(bytes)
                })?;

        let outcome = match result {
            Ok(bytes) => {
                info!(file = remote_name, bytes, attempts, "downloaded");
                TransferOutcome::Success { bytes, attempts }
            }
            Err(e) => {
                warn!(file = remote_name, attempts, error = %e, "download failed, skipping");
                if local_path.exists() {
                    if let Err(rm) = fs::remove_file(local_path) {
                        debug!(path = %local_path.display(), error = %rm, "could not remove partial file");
                    }
                }
                TransferOutcome::Failed {
                    attempts,
                    reason: e.to_string(),
                }
            }
        };

        Ok((session, outcome))
    }
}
