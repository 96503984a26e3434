/*!
 * Interactive walk of the remote directory tree
 *
 * The navigator is a small state machine over a remote path. Every time it
 * enters a directory it re-checks the session, lists the child directories
 * and asks the operator for one of:
 *
 * - `0` download from this directory (terminal)
 * - `-1` go up one level (the root's parent is the root)
 * - `1..=n` enter the n-th child
 *
 * Anything else is rejected and the operator is asked again.
 */

use std::io::{self, BufRead};

use console::Term;
use dialoguer::{theme::ColorfulTheme, Input};
use harvest_core_resilience::RetryPolicy;
use tracing::{debug, info, warn};

use crate::cli_style::{print_warning, render_directory};
use crate::connection::ConnectionManager;
use crate::error::{HarvestError, Result};
use crate::remote::{join_path, normalize_path, parent_path, RemoteSession, ROOT};

/// Where the walk currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavState {
    Browsing(String),
    Selected(String),
}

/// One parsed operator answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    DownloadHere,
    GoUp,
    /// Zero-based index into the child listing
    Child(usize),
}

/// Parse one line of operator input against a listing of `child_count`
/// directories.
pub fn parse_choice(input: &str, child_count: usize) -> Result<Choice> {
    let trimmed = input.trim();
    let number: i64 = trimmed
        .parse()
        .map_err(|_| HarvestError::OperatorInput(format!("'{}' is not a number", trimmed)))?;

    match number {
        0 => Ok(Choice::DownloadHere),
        -1 => Ok(Choice::GoUp),
        n if n >= 1 && (n as u64) <= child_count as u64 => Ok(Choice::Child(n as usize - 1)),
        n => Err(HarvestError::OperatorInput(if child_count == 0 {
            format!("{} is not available here, enter 0 or -1", n)
        } else {
            format!("{} is out of range, enter -1, 0 or 1-{}", n, child_count)
        })),
    }
}

/// Apply `choice` at `path`
pub fn next_state(path: &str, children: &[String], choice: Choice) -> NavState {
    match choice {
        Choice::DownloadHere => NavState::Selected(path.to_string()),
        Choice::GoUp => NavState::Browsing(parent_path(path)),
        Choice::Child(idx) => match children.get(idx) {
            Some(child) => NavState::Browsing(join_path(path, child)),
            None => NavState::Browsing(path.to_string()),
        },
    }
}

/// Operator console seam
pub trait Console {
    /// Present the current path and its child directories
    fn show_directory(&mut self, path: &str, children: &[String]);

    /// Read one raw line of input
    fn read_choice(&mut self) -> Result<String>;

    /// Tell the operator the last input or step was not accepted
    fn reject(&mut self, message: &str);
}

/// Terminal console: a dialoguer prompt on a TTY, plain stdin lines otherwise
#[derive(Debug, Default)]
pub struct DialoguerConsole;

impl Console for DialoguerConsole {
    fn show_directory(&mut self, path: &str, children: &[String]) {
        println!();
        print!("{}", render_directory(path, children));
    }

    fn read_choice(&mut self) -> Result<String> {
        if Term::stdout().is_term() {
            let answer: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Enter your choice")
                .interact_text()?;
            return Ok(answer);
        }

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(HarvestError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "operator input closed",
            )));
        }
        Ok(line)
    }

    fn reject(&mut self, message: &str) {
        print_warning(message);
    }
}

/// Walks the remote tree until the operator picks a directory
pub struct DirectoryNavigator<'a> {
    manager: &'a ConnectionManager,
    policy: RetryPolicy,
}

impl<'a> DirectoryNavigator<'a> {
    /// `policy` bounds each change-directory-and-list step
    pub fn new(manager: &'a ConnectionManager, policy: RetryPolicy) -> Self {
        Self { manager, policy }
    }

    /// Run the walk from `start`; returns the session and the chosen path.
    ///
    /// A directory that cannot be entered is reported and the walk returns
    /// to the last directory that could be listed. Only a failure at the
    /// root, or a lost session that cannot be re-established, ends the walk
    /// with an error.
    pub fn navigate(
        &self,
        mut session: RemoteSession,
        start: &str,
        console: &mut dyn Console,
    ) -> Result<(RemoteSession, String)> {
        let mut state = NavState::Browsing(normalize_path(start));
        let mut last_good = ROOT.to_string();

        loop {
            let path = match state {
                NavState::Selected(path) => {
                    info!(path = %path, "directory selected");
                    return Ok((session, path));
                }
                NavState::Browsing(path) => path,
            };

            let (live, listed) =
                self.manager
                    .with_session(session, &self.policy, "list directory", |s| {
                        s.change_dir(&path)?;
                        s.list_directories()
                    })?;
            session = live;

            let children = match listed {
                Ok(children) => children,
                Err(e) if path != ROOT => {
                    warn!(path = %path, error = %e, "cannot open directory");
                    console.reject(&format!("Cannot open {}: {}", path, e));
                    let fallback = if path == last_good {
                        ROOT.to_string()
                    } else {
                        last_good.clone()
                    };
                    state = NavState::Browsing(fallback);
                    continue;
                }
                Err(e) => return Err(e),
            };

            debug!(path = %path, children = children.len(), "listed directory");
            last_good = path.clone();
            console.show_directory(&path, &children);

            state = loop {
                let input = console.read_choice()?;
                match parse_choice(&input, children.len()) {
                    Ok(choice) => break next_state(&path, &children, choice),
                    Err(e) => console.reject(&e.to_string()),
                }
            };
        }
    }
}

/// Console fed from a fixed list of answers
#[cfg(test)]
pub struct ScriptedConsole {
    inputs: std::collections::VecDeque<String>,
    hooks: std::collections::HashMap<usize, Box<dyn FnMut()>>,
    reads: usize,
    pub screens: Vec<(String, Vec<String>)>,
    pub rejections: Vec<String>,
}

#[cfg(test)]
impl ScriptedConsole {
    pub fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            hooks: std::collections::HashMap::new(),
            reads: 0,
            screens: Vec::new(),
            rejections: Vec::new(),
        }
    }

    /// Run `action` just before answer number `read` (0-based) is handed out
    pub fn on_read(mut self, read: usize, action: impl FnMut() + 'static) -> Self {
        self.hooks.insert(read, Box::new(action));
        self
    }

    /// Paths shown so far, in order
    pub fn paths(&self) -> Vec<&str> {
        self.screens.iter().map(|(p, _)| p.as_str()).collect()
    }
}

#[cfg(test)]
impl Console for ScriptedConsole {
    fn show_directory(&mut self, path: &str, children: &[String]) {
        self.screens.push((path.to_string(), children.to_vec()));
    }

    fn read_choice(&mut self) -> Result<String> {
        if let Some(hook) = self.hooks.get_mut(&self.reads) {
            hook();
        }
        self.reads += 1;
        self.inputs.pop_front().ok_or_else(|| {
            HarvestError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "script exhausted",
            ))
        })
    }

    fn reject(&mut self, message: &str) {
        self.rejections.push(message.to_string());
    }
}
