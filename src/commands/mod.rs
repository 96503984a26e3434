/*!
 * Subcommands other than the harvest run itself
 */

pub mod init;
pub mod summarize;

pub use init::run_init;
pub use summarize::run_summarize;
