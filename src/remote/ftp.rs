/*!
 * Production FTP backend built on suppaftp
 */

use std::io::{self, Write};
use std::net::ToSocketAddrs;
use std::time::Duration;

use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Mode};
use tracing::debug;

use super::{Connector, FtpConnection};
use crate::error::{HarvestError, Result};

pub const ANONYMOUS_USER: &str = "anonymous";
pub const ANONYMOUS_PASSWORD: &str = "anonymous@";

/// Opens anonymous passive-mode sessions over plain FTP
#[derive(Debug, Clone)]
pub struct FtpConnector {
    port: u16,
    timeout: Duration,
}

impl FtpConnector {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }
}

impl Connector for FtpConnector {
    fn open(&self, host: &str) -> Result<Box<dyn FtpConnection>> {
        let addr = (host, self.port)
            .to_socket_addrs()
            .map_err(|e| connectivity(host, e))?
            .next()
            .ok_or_else(|| HarvestError::Connectivity {
                host: host.to_string(),
                message: "host name did not resolve".to_string(),
            })?;

        debug!(host, %addr, "opening control connection");
        let mut stream =
            FtpStream::connect_timeout(addr, self.timeout).map_err(|e| map_ftp_error(host, e))?;

        // Idle peers surface as TimedOut instead of hanging the run
        stream
            .get_ref()
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| connectivity(host, e))?;
        stream
            .get_ref()
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| connectivity(host, e))?;

        stream
            .login(ANONYMOUS_USER, ANONYMOUS_PASSWORD)
            .map_err(|e| map_ftp_error(host, e))?;
        stream.set_mode(Mode::Passive);
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| map_ftp_error(host, e))?;

        Ok(Box::new(FtpLink {
            stream,
            host: host.to_string(),
        }))
    }
}

/// A logged-in suppaftp stream
struct FtpLink {
    stream: FtpStream,
    host: String,
}

impl FtpConnection for FtpLink {
    fn noop(&mut self) -> Result<()> {
        self.stream.noop().map_err(|e| map_ftp_error(&self.host, e))
    }

    fn change_dir(&mut self, path: &str) -> Result<()> {
        self.stream
            .cwd(path)
            .map_err(|e| map_ftp_error(&self.host, e))
    }

    fn list(&mut self) -> Result<Vec<String>> {
        self.stream
            .list(None)
            .map_err(|e| map_ftp_error(&self.host, e))
    }

    fn name_list(&mut self) -> Result<Vec<String>> {
        self.stream
            .nlst(None)
            .map_err(|e| map_ftp_error(&self.host, e))
    }

    fn retrieve(&mut self, name: &str, sink: &mut dyn Write) -> Result<u64> {
        let mut buffer = self
            .stream
            .retr_as_buffer(name)
            .map_err(|e| map_ftp_error(&self.host, e))?;
        Ok(io::copy(&mut buffer, sink)?)
    }

    fn quit(&mut self) -> Result<()> {
        self.stream.quit().map_err(|e| map_ftp_error(&self.host, e))
    }
}

fn connectivity(host: &str, err: io::Error) -> HarvestError {
    HarvestError::Connectivity {
        host: host.to_string(),
        message: err.to_string(),
    }
}

/// Socket failures become `Connectivity`, server replies become `Protocol`
fn map_ftp_error(host: &str, err: FtpError) -> HarvestError {
    match err {
        FtpError::ConnectionError(io_err) => connectivity(host, io_err),
        other => HarvestError::Protocol(other.to_string()),
    }
}
