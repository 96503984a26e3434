/*!
 * Remote archive host abstraction
 *
 * The pipeline talks to the archive host through two small seams:
 * - [`Connector`] opens a logged-in, passive-mode, binary-type connection
 * - [`FtpConnection`] issues the handful of commands the pipeline needs
 *
 * [`RemoteSession`] wraps one connection together with the working path it
 * was last moved to, so a replacement connection can be put back in the
 * same place after a reconnect.
 */

pub mod ftp;
pub mod listing;

#[cfg(test)]
pub mod mock;

use std::io::Write;

use tracing::debug;

use crate::error::Result;

pub use ftp::FtpConnector;
pub use listing::{directory_names, join_path, normalize_path, parent_path, ROOT};

/// Commands issued against an open control connection
pub trait FtpConnection {
    /// Liveness probe (`NOOP`)
    fn noop(&mut self) -> Result<()>;

    /// Change the working directory (`CWD`)
    fn change_dir(&mut self, path: &str) -> Result<()>;

    /// Long listing of the working directory (`LIST`), one entry per line
    fn list(&mut self) -> Result<Vec<String>>;

    /// Bare names in the working directory (`NLST`)
    fn name_list(&mut self) -> Result<Vec<String>>;

    /// Binary download of `name` (`RETR`) into `sink`; returns bytes written
    fn retrieve(&mut self, name: &str, sink: &mut dyn Write) -> Result<u64>;

    /// Polite shutdown (`QUIT`)
    fn quit(&mut self) -> Result<()>;
}

/// Opens anonymous connections to an archive host
pub trait Connector {
    fn open(&self, host: &str) -> Result<Box<dyn FtpConnection>>;
}

/// One open connection plus the path it is positioned at.
///
/// Sessions are passed by value through the pipeline; any step that may
/// reconnect hands back the session the caller should keep using.
pub struct RemoteSession {
    conn: Box<dyn FtpConnection>,
    host: String,
    cwd: String,
    alive: bool,
}

impl std::fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("host", &self.host)
            .field("cwd", &self.cwd)
            .field("alive", &self.alive)
            .finish()
    }
}

impl RemoteSession {
    pub fn new(conn: Box<dyn FtpConnection>, host: impl Into<String>) -> Self {
        Self {
            conn,
            host: host.into(),
            cwd: ROOT.to_string(),
            alive: true,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Path of the last successful `change_dir`
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// Result of the last probe or command
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Send a `NOOP`; `false` means the peer is gone
    pub fn probe(&mut self) -> bool {
        match self.conn.noop() {
            Ok(()) => {
                self.alive = true;
                true
            }
            Err(e) => {
                debug!(host = %self.host, error = %e, "liveness probe failed");
                self.alive = false;
                false
            }
        }
    }

    pub fn change_dir(&mut self, path: &str) -> Result<()> {
        let path = normalize_path(path);
        let result = self.conn.change_dir(&path);
        self.track(result)?;
        self.cwd = path;
        Ok(())
    }

    /// Child directory names of the working directory, in listing order
    pub fn list_directories(&mut self) -> Result<Vec<String>> {
        let result = self.conn.list();
        let lines = self.track(result)?;
        Ok(directory_names(&lines))
    }

    pub fn name_list(&mut self) -> Result<Vec<String>> {
        let result = self.conn.name_list();
        self.track(result)
    }

    pub fn retrieve(&mut self, name: &str, sink: &mut dyn Write) -> Result<u64> {
        let result = self.conn.retrieve(name, sink);
        self.track(result)
    }

    /// Close the connection; errors are irrelevant at this point
    pub fn close(mut self) {
        if self.alive {
            if let Err(e) = self.conn.quit() {
                debug!(host = %self.host, error = %e, "QUIT failed");
            }
        }
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(ref e) = result {
            if e.is_transient() {
                self.alive = false;
            }
        }
        result
    }
}
