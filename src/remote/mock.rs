//! In-memory archive host for testing
//!
//! `MockHost` holds a directory tree and a script of failures; every
//! connection opened through its [`MockConnector`] shares that state, so a
//! test can drop all live connections mid-run or make a particular download
//! fail a fixed number of times and then watch the pipeline recover.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::rc::Rc;

use super::listing::{join_path, normalize_path, ROOT};
use super::{Connector, FtpConnection};
use crate::error::{HarvestError, Result};

#[derive(Debug, Default)]
struct MockDir {
    subdirs: Vec<String>,
    files: Vec<(String, Vec<u8>)>,
}

#[derive(Debug, Default)]
struct MockState {
    dirs: BTreeMap<String, MockDir>,
    /// Connections opened before this generation are dead
    cutoff: u64,
    generation: u64,
    connect_failures: u32,
    retrieve_failures: HashMap<String, u32>,
    connects: u32,
    noops: u32,
    retrieves: Vec<String>,
    quits: u32,
}

/// Shared, scriptable in-memory FTP host
#[derive(Debug, Clone)]
pub struct MockHost {
    state: Rc<RefCell<MockState>>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    pub fn new() -> Self {
        let mut state = MockState::default();
        state.dirs.insert(ROOT.to_string(), MockDir::default());
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Create `path` and any missing ancestors
    pub fn add_dir(&self, path: &str) {
        let path = normalize_path(path);
        let mut state = self.state.borrow_mut();
        let mut current = ROOT.to_string();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            let next = join_path(&current, part);
            if !state.dirs.contains_key(&next) {
                state.dirs.insert(next.clone(), MockDir::default());
                if let Some(parent) = state.dirs.get_mut(&current) {
                    parent.subdirs.push(part.to_string());
                }
            }
            current = next;
        }
    }

    /// Add a file to `dir`, creating the directory if needed
    pub fn add_file(&self, dir: &str, name: &str, data: &[u8]) {
        self.add_dir(dir);
        let dir = normalize_path(dir);
        let mut state = self.state.borrow_mut();
        if let Some(entry) = state.dirs.get_mut(&dir) {
            entry.files.push((name.to_string(), data.to_vec()));
        }
    }

    /// Next `count` connection attempts are refused
    pub fn fail_connects(&self, count: u32) {
        self.state.borrow_mut().connect_failures = count;
    }

    /// Next `count` downloads of `name` fail with a reset
    pub fn fail_retrieves(&self, name: &str, count: u32) {
        self.state
            .borrow_mut()
            .retrieve_failures
            .insert(name.to_string(), count);
    }

    /// Kill every connection opened so far
    pub fn drop_connections(&self) {
        let mut state = self.state.borrow_mut();
        state.cutoff = state.generation;
    }

    pub fn connector(&self) -> MockConnector {
        MockConnector { host: self.clone() }
    }

    pub fn connects(&self) -> u32 {
        self.state.borrow().connects
    }

    pub fn noops(&self) -> u32 {
        self.state.borrow().noops
    }

    pub fn quits(&self) -> u32 {
        self.state.borrow().quits
    }

    /// Names passed to every download attempt, in order
    pub fn retrieves(&self) -> Vec<String> {
        self.state.borrow().retrieves.clone()
    }
}

/// Connector handing out connections to a [`MockHost`]
#[derive(Debug, Clone)]
pub struct MockConnector {
    host: MockHost,
}

impl Connector for MockConnector {
    fn open(&self, host: &str) -> Result<Box<dyn FtpConnection>> {
        let mut state = self.host.state.borrow_mut();
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(HarvestError::Connectivity {
                host: host.to_string(),
                message: "connection refused".to_string(),
            });
        }
        state.connects += 1;
        state.generation += 1;
        Ok(Box::new(MockConnection {
            host: self.host.clone(),
            generation: state.generation,
            cwd: ROOT.to_string(),
        }))
    }
}

struct MockConnection {
    host: MockHost,
    generation: u64,
    cwd: String,
}

impl MockConnection {
    fn check_alive(&self) -> Result<()> {
        if self.generation <= self.host.state.borrow().cutoff {
            return Err(HarvestError::Connectivity {
                host: "mock".to_string(),
                message: "connection reset by peer".to_string(),
            });
        }
        Ok(())
    }
}

impl FtpConnection for MockConnection {
    fn noop(&mut self) -> Result<()> {
        self.host.state.borrow_mut().noops += 1;
        self.check_alive()
    }

    fn change_dir(&mut self, path: &str) -> Result<()> {
        self.check_alive()?;
        let path = normalize_path(path);
        if !self.host.state.borrow().dirs.contains_key(&path) {
            return Err(HarvestError::Protocol(format!(
                "550 {}: No such file or directory",
                path
            )));
        }
        self.cwd = path;
        Ok(())
    }

    fn list(&mut self) -> Result<Vec<String>> {
        self.check_alive()?;
        let state = self.host.state.borrow();
        let dir = &state.dirs[&self.cwd];
        let mut lines: Vec<String> = dir
            .subdirs
            .iter()
            .map(|name| {
                format!(
                    "drwxr-xr-x    2 ftp      ftp          4096 Jan 01 00:00 {}",
                    name
                )
            })
            .collect();
        lines.extend(dir.files.iter().map(|(name, data)| {
            format!(
                "-rw-r--r--    1 ftp      ftp      {:>8} Jan 01 00:00 {}",
                data.len(),
                name
            )
        }));
        Ok(lines)
    }

    fn name_list(&mut self) -> Result<Vec<String>> {
        self.check_alive()?;
        let state = self.host.state.borrow();
        let dir = &state.dirs[&self.cwd];
        Ok(dir
            .subdirs
            .iter()
            .cloned()
            .chain(dir.files.iter().map(|(name, _)| name.clone()))
            .collect())
    }

    fn retrieve(&mut self, name: &str, sink: &mut dyn Write) -> Result<u64> {
        self.check_alive()?;
        let data = {
            let mut state = self.host.state.borrow_mut();
            state.retrieves.push(name.to_string());
            if let Some(remaining) = state.retrieve_failures.get_mut(name) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(HarvestError::Io(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "data connection reset",
                    )));
                }
            }
            state.dirs[&self.cwd]
                .files
                .iter()
                .find(|(file, _)| file == name)
                .map(|(_, data)| data.clone())
                .ok_or_else(|| {
                    HarvestError::Protocol(format!("550 {}: No such file", name))
                })?
        };
        sink.write_all(&data)?;
        Ok(data.len() as u64)
    }

    fn quit(&mut self) -> Result<()> {
        self.host.state.borrow_mut().quits += 1;
        Ok(())
    }
}
