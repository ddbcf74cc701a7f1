//! Protocol session abstraction
//!
//! The client never speaks the FTP wire protocol itself. It drives a
//! [`Session`] produced by a [`Connector`]; the `ftp` module provides one
//! backed by `suppaftp`, and the `memory` module an in-process one.

use crate::config::TlsMode;
use crate::Result;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

/// Options for dialing a new session
#[derive(Clone, Default)]
pub struct DialOptions {
    /// `host:port` of the server
    pub host: String,
    /// Dial timeout; zero means no timeout
    pub timeout: Duration,
    /// Use PASV instead of EPSV for data connections
    pub disable_epsv: bool,
    /// Secure the control connection when set
    pub tls: Option<Arc<rustls::ClientConfig>>,
    /// Implicit FTPS, or an `AUTH TLS` upgrade; ignored without `tls`
    pub tls_mode: TlsMode,
}

impl std::fmt::Debug for DialOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialOptions")
            .field("host", &self.host)
            .field("timeout", &self.timeout)
            .field("disable_epsv", &self.disable_epsv)
            .field("tls", &self.tls.is_some())
            .field("tls_mode", &self.tls_mode)
            .finish()
    }
}

/// Establishes new protocol sessions
pub trait Connector: Send + Sync {
    /// Dial the server. The returned session is not yet authenticated.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached or the TLS
    /// handshake fails.
    fn dial(&self, options: &DialOptions) -> Result<Box<dyn Session>>;
}

/// A single live protocol connection
///
/// Sessions are stateful (they carry a working directory) and are not safe
/// for concurrent use. The client owns at most one at a time and only
/// touches it while holding its lock.
pub trait Session: Send {
    /// Authenticate
    fn login(&mut self, username: &str, password: &str) -> Result<()>;

    /// Keep-alive probe
    fn noop(&mut self) -> Result<()>;

    /// Terminate the session gracefully
    fn quit(&mut self) -> Result<()>;

    /// Current remote working directory
    fn current_dir(&mut self) -> Result<String>;

    /// Change the remote working directory
    fn change_dir(&mut self, path: &str) -> Result<()>;

    /// Start retrieving `name`
    ///
    /// The returned stream reads the data connection. Once the caller is
    /// done with it, it must be handed back through
    /// [`Session::finish_retrieve`].
    fn retrieve(&mut self, name: &str) -> Result<Box<dyn Read + Send>>;

    /// Close a retrieval stream and consume the server's completion reply
    fn finish_retrieve(&mut self, stream: Box<dyn Read + Send>) -> Result<()>;

    /// Store `contents` as `name`
    fn store(&mut self, name: &str, contents: &mut dyn Read) -> Result<()>;

    /// Delete a file
    fn delete(&mut self, name: &str) -> Result<()>;

    /// Create a directory
    fn make_dir(&mut self, path: &str) -> Result<()>;

    /// List one directory level
    ///
    /// `.` and `..` are never returned.
    fn list(&mut self, dir: &str) -> Result<Vec<Entry>>;
}

/// Kind of a remote directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Folder,
    /// Symbolic link
    Symlink,
    /// Anything else the server reports
    Other,
}

/// A remote directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: String,
    kind: EntryKind,
    size: Option<u64>,
}

impl Entry {
    /// Create an entry
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            size: None,
        }
    }

    /// Attach the size reported by the server
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Base name exactly as the server reported it
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry kind
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Size in bytes, when known
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Whether this entry is a directory
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}
