/*!
 * tdoc-harvest - meeting document harvester
 *
 * Downloads the document archives of one meeting directory from an
 * anonymous FTP archive, sorts them into folders named after a category
 * column of the meeting's manifest spreadsheet, and unpacks them there:
 * - Interactive walk of the remote tree, or a fixed remote directory
 * - Liveness probe before every remote command, with reconnect
 * - Per-file retry of transient failures
 * - Bounded, collision-safe category folder names
 *
 * A second workflow summarizes a folder of Word documents through a text
 * completion service and writes an HTML analysis report.
 *
 * Version: 0.3.0
 */

pub mod catalog;
pub mod cli_style;
pub mod commands;
pub mod config;
pub mod connection;
pub mod distribute;
pub mod error;
pub mod logging;
pub mod navigator;
pub mod pipeline;
pub mod remote;
pub mod sanitize;
pub mod stats;
pub mod summarize;
pub mod transfer;

// Re-export commonly used types
pub use catalog::{build_index, CatalogIndexer, CategoryMap, Cell, ManifestReader, ManifestRow, XlsxManifestReader};
pub use config::{CategoryPreset, HarvestConfig, LogLevel};
pub use connection::ConnectionManager;
pub use distribute::{ArchiveDistributor, DistributionOutcome};
pub use error::{HarvestError, Result};
pub use navigator::{Console, DialoguerConsole, DirectoryNavigator};
pub use pipeline::Pipeline;
pub use remote::{Connector, FtpConnection, FtpConnector, RemoteSession};
pub use sanitize::{sanitize_folder_name, NameSanitizer};
pub use stats::{ManifestStatus, RunSummary};
pub use summarize::{AnalysisReport, DocumentAnalyzer, DocumentReader, TextCompletion};
pub use transfer::{ResilientTransfer, TransferOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
