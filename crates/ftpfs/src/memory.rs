//! In-memory FTP server
//!
//! [`MemoryServer`] implements [`Connector`] over a process-local file tree so
//! the client can be exercised without a network. It records every command
//! it receives and can drop live sessions or fail selected commands, which
//! makes reconnect and directory-restoration paths observable in tests.

use crate::path::{clean, join, split};
use crate::session::{Connector, DialOptions, Entry, EntryKind, Session};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
    Symlink,
}

#[derive(Debug)]
struct Failure {
    command: String,
    argument: Option<String>,
    reply: String,
}

#[derive(Debug, Default)]
struct ServerState {
    nodes: BTreeMap<String, Node>,
    users: HashMap<String, String>,
    commands: Vec<String>,
    failures: Vec<Failure>,
    dials: usize,
    epoch: u64,
}

impl ServerState {
    fn failure_for(&self, command: &str, argument: Option<&str>) -> Option<String> {
        self.failures
            .iter()
            .find(|f| {
                f.command == command
                    && f.argument.as_deref().is_none_or(|expected| Some(expected) == argument)
            })
            .map(|f| f.reply.clone())
    }

    fn insert_parents(&mut self, path: &str) {
        let mut current = parent_of(path);
        while current != "/" {
            self.nodes.entry(current.clone()).or_insert(Node::Dir);
            current = parent_of(&current);
        }
    }

    fn is_dir(&self, path: &str) -> bool {
        path == "/" || matches!(self.nodes.get(path), Some(Node::Dir))
    }
}

/// In-memory FTP server
///
/// Cloning yields another handle to the same file tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl MemoryServer {
    /// Create an empty server that accepts any credentials
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept logins for the given users
    #[must_use]
    pub fn with_user(self, username: &str, password: &str) -> Self {
        self.state()
            .users
            .insert(username.to_string(), password.to_string());
        self
    }

    /// Create a directory (and its parents)
    pub fn add_dir(&self, path: &str) {
        let path = absolute(path);
        let mut state = self.state();
        state.insert_parents(&path);
        if path != "/" {
            state.nodes.insert(path, Node::Dir);
        }
    }

    /// Create a file (and its parent directories)
    pub fn add_file(&self, path: &str, contents: impl Into<Vec<u8>>) {
        let path = absolute(path);
        let mut state = self.state();
        state.insert_parents(&path);
        state.nodes.insert(path, Node::File(contents.into()));
    }

    /// Create a symbolic link entry (and its parent directories)
    pub fn add_symlink(&self, path: &str) {
        let path = absolute(path);
        let mut state = self.state();
        state.insert_parents(&path);
        state.nodes.insert(path, Node::Symlink);
    }

    /// Contents of the file at `path`
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        match self.state().nodes.get(&absolute(path)) {
            Some(Node::File(contents)) => Some(contents.clone()),
            _ => None,
        }
    }

    /// Whether anything exists at `path`
    pub fn exists(&self, path: &str) -> bool {
        let path = absolute(path);
        path == "/" || self.state().nodes.contains_key(&path)
    }

    /// Fail every `command` (e.g. `CWD`, `RETR`) with `reply`
    pub fn fail(&self, command: &str, reply: &str) {
        self.push_failure(command, None, reply);
    }

    /// Fail `command` with `reply` when its argument is exactly `argument`
    pub fn fail_with_argument(&self, command: &str, argument: &str, reply: &str) {
        self.push_failure(command, Some(argument), reply);
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// Break every session dialed so far
    ///
    /// Their next command fails as if the control connection was reset.
    pub fn drop_connections(&self) {
        self.state().epoch += 1;
    }

    /// Commands received so far, formatted as `VERB argument`
    pub fn commands(&self) -> Vec<String> {
        self.state().commands.clone()
    }

    /// Forget recorded commands
    pub fn clear_commands(&self) {
        self.state().commands.clear();
    }

    /// Number of sessions dialed
    pub fn dial_count(&self) -> usize {
        self.state().dials
    }

    fn push_failure(&self, command: &str, argument: Option<&str>, reply: &str) {
        self.state().failures.push(Failure {
            command: command.to_string(),
            argument: argument.map(str::to_string),
            reply: reply.to_string(),
        });
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connector for MemoryServer {
    fn dial(&self, options: &DialOptions) -> Result<Box<dyn Session>> {
        let mut state = self.state();
        state.commands.push(format!("DIAL {}", options.host));
        if let Some(reply) = state.failure_for("DIAL", Some(&options.host)) {
            return Err(Error::connection(reply));
        }
        state.dials += 1;

        Ok(Box::new(MemorySession {
            server: self.clone(),
            cwd: "/".to_string(),
            epoch: state.epoch,
            logged_in: false,
            closed: false,
        }))
    }
}

/// A session on a [`MemoryServer`]
#[derive(Debug)]
pub struct MemorySession {
    server: MemoryServer,
    cwd: String,
    epoch: u64,
    logged_in: bool,
    closed: bool,
}

impl MemorySession {
    /// Record `command` and check that it may run
    fn begin(&self, command: &str, argument: Option<&str>) -> Result<MutexGuard<'_, ServerState>> {
        let mut state = self.server.state();
        if self.closed || state.epoch != self.epoch {
            return Err(Error::connection("connection reset by peer"));
        }

        state.commands.push(match argument {
            Some(arg) => format!("{command} {arg}"),
            None => command.to_string(),
        });

        if let Some(reply) = state.failure_for(command, argument) {
            return Err(Error::remote(reply));
        }
        if !self.logged_in && command != "USER" && command != "QUIT" {
            return Err(Error::remote("530 Please login with USER and PASS"));
        }
        Ok(state)
    }

    fn resolve(&self, path: &str) -> String {
        if path.starts_with('/') {
            clean(path)
        } else {
            clean(&join(&self.cwd, path))
        }
    }
}

impl Session for MemorySession {
    fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let state = self.begin("USER", Some(username))?;
        let accepted = state.users.is_empty()
            || state.users.get(username).is_some_and(|p| p == password);
        drop(state);

        if !accepted {
            return Err(Error::remote("530 Incorrect password, not logged in"));
        }
        self.logged_in = true;
        Ok(())
    }

    fn noop(&mut self) -> Result<()> {
        self.begin("NOOP", None).map(drop)
    }

    fn quit(&mut self) -> Result<()> {
        self.begin("QUIT", None)?;
        self.closed = true;
        Ok(())
    }

    fn current_dir(&mut self) -> Result<String> {
        self.begin("PWD", None)?;
        Ok(self.cwd.clone())
    }

    fn change_dir(&mut self, path: &str) -> Result<()> {
        let target = self.resolve(path);
        let state = self.begin("CWD", Some(path))?;
        if !state.is_dir(&target) {
            return Err(Error::remote(format!(
                "550 Directory change to {target} failed: no such file or directory"
            )));
        }
        drop(state);

        self.cwd = target;
        Ok(())
    }

    fn retrieve(&mut self, name: &str) -> Result<Box<dyn Read + Send>> {
        let target = self.resolve(name);
        let state = self.begin("RETR", Some(name))?;
        match state.nodes.get(&target) {
            Some(Node::File(contents)) => Ok(Box::new(Cursor::new(contents.clone()))),
            // Directories transfer nothing, like many real servers
            Some(Node::Dir) => Ok(Box::new(std::io::empty())),
            _ if target == "/" => Ok(Box::new(std::io::empty())),
            _ => Err(Error::remote("551 File not available")),
        }
    }

    fn finish_retrieve(&mut self, stream: Box<dyn Read + Send>) -> Result<()> {
        drop(stream);
        let state = self.server.state();
        if self.closed || state.epoch != self.epoch {
            return Err(Error::connection("connection reset by peer"));
        }
        Ok(())
    }

    fn store(&mut self, name: &str, contents: &mut dyn Read) -> Result<()> {
        let target = self.resolve(name);
        let mut data = Vec::new();
        contents.read_to_end(&mut data)?;

        let mut state = self.begin("STOR", Some(name))?;
        if !state.is_dir(&parent_of(&target)) || state.is_dir(&target) {
            return Err(Error::remote(format!("553 Could not create file {target}")));
        }
        state.nodes.insert(target, Node::File(data));
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        let target = self.resolve(name);
        let mut state = self.begin("DELE", Some(name))?;
        if state.is_dir(&target) {
            return Err(Error::remote(format!(
                "550 Could not delete {target}: is a directory"
            )));
        }
        match state.nodes.remove(&target) {
            Some(_) => Ok(()),
            None => Err(Error::remote(format!(
                "550 Could not delete {target}: no such file or directory"
            ))),
        }
    }

    fn make_dir(&mut self, path: &str) -> Result<()> {
        let target = self.resolve(path);
        let mut state = self.begin("MKD", Some(path))?;
        if target == "/" || state.nodes.contains_key(&target) {
            return Err(Error::remote(format!("550 {target}: file exists")));
        }
        if !state.is_dir(&parent_of(&target)) {
            return Err(Error::remote(format!(
                "550 Could not create {target}: no such file or directory"
            )));
        }
        state.nodes.insert(target, Node::Dir);
        Ok(())
    }

    fn list(&mut self, dir: &str) -> Result<Vec<Entry>> {
        let target = self.resolve(dir);
        let state = self.begin("LIST", Some(dir))?;
        if !state.is_dir(&target) {
            return Err(Error::remote(format!(
                "550 Could not list {target}: no such file or directory"
            )));
        }

        let entries = state
            .nodes
            .iter()
            .filter(|(path, _)| path.as_str() != "/" && parent_of(path) == target)
            .map(|(path, node)| {
                let name = split(path).1;
                match node {
                    Node::Dir => Entry::new(name, EntryKind::Folder),
                    Node::File(contents) => {
                        Entry::new(name, EntryKind::File).with_size(contents.len() as u64)
                    }
                    Node::Symlink => Entry::new(name, EntryKind::Symlink),
                }
            })
            .collect();
        Ok(entries)
    }
}

fn absolute(path: &str) -> String {
    clean(&join("/", path))
}

fn parent_of(path: &str) -> String {
    clean(split(path).0)
}
