//! FTP Client Implementation
//!
//! This module provides the filesystem-like client facade. Every operation
//! that touches the session runs under the client's lock: the connection is
//! verified (and re-established if needed), path-relative commands run from
//! inside the target's parent directory, and results are wrapped with the
//! operation and path they belong to.

use crate::connection::Connection;
use crate::file::{File, RemoteStream};
use crate::path::{base, split};
use crate::scoped::in_parent;
use crate::session::{Connector, Entry, Session};
use crate::walk::{Visitor, WalkControl};
use crate::{list, walk, ClientConfig, Error, Result};
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// The client's public operation set
///
/// Implemented by [`Client`] and by [`crate::MockClient`], so code that
/// depends on a remote filesystem can be tested without a server.
pub trait RemoteFs: Send + Sync {
    /// Verify the connection, reconnecting if needed
    fn ping(&self) -> Result<()>;

    /// Terminate the session
    fn close(&self) -> Result<()>;

    /// Retrieve the whole file at `path` into memory
    fn open(&self, path: &str) -> Result<File>;

    /// Stream the file at `path`
    fn reader(&self, path: &str) -> Result<File>;

    /// Delete the file at `path`; deleting a missing file succeeds
    fn delete(&self, path: &str) -> Result<()>;

    /// Store `contents` at `path`; `contents` is always dropped
    fn upload_file(&self, path: &str, contents: Box<dyn Read + Send>) -> Result<()>;

    /// Paths of the files directly inside `dir`
    fn list_files(&self, dir: &str) -> Result<Vec<String>>;

    /// Visit every file below `dir`
    fn walk(&self, dir: &str, visit: &mut Visitor<'_>) -> Result<()>;
}

/// FTP Client
///
/// Owns at most one protocol session and serializes all access to it.
/// Clones share the same session and lock.
#[derive(Clone)]
pub struct Client {
    connection: Arc<Mutex<Connection>>,
}

/// The initial connection of [`Client::connect`] failed
///
/// The client is still usable: later operations retry the connection.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ConnectFailure {
    /// The constructed client
    pub client: Client,
    /// `ftp connect: ...` error
    pub error: Error,
}

impl ConnectFailure {
    /// Keep the client, discarding the error
    pub fn into_client(self) -> Client {
        self.client
    }
}

impl Client {
    /// Create a client without connecting
    ///
    /// The first operation establishes the session.
    pub fn new(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            connection: Arc::new(Mutex::new(Connection::new(config, connector))),
        }
    }

    /// Create a client and establish its first session
    ///
    /// # Errors
    ///
    /// Returns [`ConnectFailure`] carrying both the client and the
    /// `ftp connect: ...` error if dialing or logging in fails.
    pub fn connect(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
    ) -> std::result::Result<Self, ConnectFailure> {
        let client = Self::new(config, connector);
        let initial = client.lock().ensure_connected().map(|_| ());

        match initial {
            Ok(()) => Ok(client),
            Err(e) => Err(ConnectFailure {
                client,
                error: Error::Connect(Box::new(e)),
            }),
        }
    }

    /// Create a client for a real FTP server and establish its first session
    ///
    /// # Errors
    ///
    /// See [`Client::connect`].
    #[cfg(feature = "suppaftp")]
    pub fn dial(config: ClientConfig) -> std::result::Result<Self, ConnectFailure> {
        Self::connect(config, Arc::new(crate::ftp::FtpConnector))
    }

    /// Verify the connection, reconnecting if needed
    ///
    /// # Errors
    ///
    /// Returns the dial, login or probe error.
    pub fn ping(&self) -> Result<()> {
        self.lock().ensure_connected()?.noop()
    }

    /// Terminate the session
    ///
    /// Closing a client that never connected, or closing twice, succeeds.
    /// A later operation reconnects.
    ///
    /// # Errors
    ///
    /// Returns the reconnect or QUIT error.
    pub fn close(&self) -> Result<()> {
        self.lock().close()
    }

    /// Retrieve the whole file at `path` into memory
    ///
    /// WARNING: the entire file is held in memory.
    ///
    /// FTP has no portable STAT, so a directory cannot be told apart from an
    /// empty file: retrieving either yields an empty, error-free `File`.
    ///
    /// # Errors
    ///
    /// `retrieving <path> failed: ...` if the server refuses the transfer,
    /// `reading <path> failed: ...` if the transfer breaks.
    pub fn open(&self, path: &str) -> Result<File> {
        debug!("Opening {}", path);
        let mut connection = self.lock();
        let session = connection.ensure_connected()?;

        let contents = in_parent(session, path, "reading", |session, name| {
            let mut stream = session.retrieve(name).map_err(|e| Error::retrieve(path, e))?;
            let mut buf = Vec::new();
            let drained = stream.read_to_end(&mut buf);
            let finished = session.finish_retrieve(stream);

            let n = drained.map_err(|e| Error::Read {
                path: path.to_string(),
                source: Box::new(Error::Io(e)),
            })?;
            finished?;

            if n == 0 {
                debug!("Retrieved nothing from {}, it may be a directory", path);
            }
            Ok(buf)
        })?;

        Ok(File::from_bytes(base(path), contents))
    }

    /// Stream the file at `path`
    ///
    /// The client lock is only held while the transfer is started. Reads
    /// from the returned file are not serialized with other operations, so
    /// callers must not run other operations or open a second reader on this
    /// client until the file is closed. Closing completes the transfer.
    ///
    /// Closing never waits for the client: a file closed while another
    /// operation holds the client (for instance from inside a [`Client::walk`]
    /// visitor) abandons its session, and the next operation reconnects.
    ///
    /// # Errors
    ///
    /// `retrieving <path> failed: ...` if the server refuses the transfer.
    pub fn reader(&self, path: &str) -> Result<File> {
        debug!("Streaming {}", path);
        let mut connection = self.lock();
        let session = connection.ensure_connected()?;

        let stream = in_parent(session, path, "reading", |session, name| {
            session.retrieve(name).map_err(|e| Error::retrieve(path, e))
        })?;

        let stream = RemoteStream::new(
            stream,
            Arc::downgrade(&self.connection),
            connection.generation(),
            connection.abandoned_marker(),
        );
        Ok(File::streaming(base(path), stream))
    }

    /// Delete the file at `path`
    ///
    /// Deleting a file that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPath`] for an empty path or one ending in `/`, checked
    /// before contacting the server; otherwise the server's error.
    pub fn delete(&self, path: &str) -> Result<()> {
        if path.is_empty() || path.ends_with('/') {
            return Err(Error::InvalidPath(path.to_string()));
        }

        debug!("Deleting {}", path);
        let mut connection = self.lock();
        match connection.ensure_connected()?.delete(path) {
            Err(e) if e.to_string().contains("no such file or directory") => {
                debug!("{} already absent", path);
                Ok(())
            }
            other => other,
        }
    }

    /// Store `contents` at `path`
    ///
    /// `contents` is consumed and dropped on every path, including errors.
    /// With `create_upload_directories` set, missing parent directories are
    /// created first.
    ///
    /// # Errors
    ///
    /// Returns the server's error, or [`Error::Restore`] if the working
    /// directory could not be restored afterwards.
    pub fn upload_file(&self, path: &str, contents: impl Read) -> Result<()> {
        let mut contents = contents;

        debug!("Uploading {}", path);
        let mut connection = self.lock();
        let create_dirs = connection.config().create_upload_directories;
        let session = connection.ensure_connected()?;

        let (dir, _) = split(path);
        if create_dirs && !dir.is_empty() {
            make_parent_dirs(session, dir);
        }

        in_parent(session, path, "uploading", |session, name| {
            session.store(name, &mut contents)
        })?;
        info!("Uploaded {}", path);
        Ok(())
    }

    /// Paths of the files directly inside `dir`
    ///
    /// Paths are relative to `dir`'s root: absolute if `dir` is. Matching is
    /// case-insensitive, but paths are returned exactly as the server
    /// reports them. Order is unspecified.
    ///
    /// # Errors
    ///
    /// `listing <dir> failed: ...`
    pub fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        debug!("Listing {}", dir);
        let mut connection = self.lock();
        let session = connection.ensure_connected()?;
        list::list_files(session, dir)
    }

    /// Visit every file below `dir`, depth-first
    ///
    /// Directories are descended into but never passed to `visit`; see
    /// [`WalkControl`] for how the visitor steers the walk.
    ///
    /// # Errors
    ///
    /// `walking <path> failed: ...` when the visitor aborts, or the error
    /// entering `dir`.
    pub fn walk<F>(&self, dir: &str, mut visit: F) -> Result<()>
    where
        F: FnMut(&str, &Entry, Option<Error>) -> WalkControl,
    {
        let mut connection = self.lock();
        let session = connection.ensure_connected()?;
        walk::walk(session, dir, &mut visit)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never block: the lock may be held by the caller formatting us
        match self.connection.try_lock() {
            Ok(connection) => f
                .debug_struct("Client")
                .field("hostname", &connection.config().hostname)
                .field("connected", &connection.has_session())
                .finish(),
            Err(_) => f.debug_struct("Client").finish_non_exhaustive(),
        }
    }
}

impl RemoteFs for Client {
    fn ping(&self) -> Result<()> {
        Client::ping(self)
    }

    fn close(&self) -> Result<()> {
        Client::close(self)
    }

    fn open(&self, path: &str) -> Result<File> {
        Client::open(self, path)
    }

    fn reader(&self, path: &str) -> Result<File> {
        Client::reader(self, path)
    }

    fn delete(&self, path: &str) -> Result<()> {
        Client::delete(self, path)
    }

    fn upload_file(&self, path: &str, contents: Box<dyn Read + Send>) -> Result<()> {
        Client::upload_file(self, path, contents)
    }

    fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        Client::list_files(self, dir)
    }

    fn walk(&self, dir: &str, visit: &mut Visitor<'_>) -> Result<()> {
        Client::walk(self, dir, visit)
    }
}

/// Create every directory along `dir`, ignoring failures
///
/// Existing directories fail to be created; anything really wrong surfaces
/// when changing into `dir` afterwards.
fn make_parent_dirs(session: &mut dyn Session, dir: &str) {
    let mut current = String::new();
    if dir.starts_with('/') {
        current.push('/');
    }

    for part in dir.split('/').filter(|part| !part.is_empty()) {
        if !current.is_empty() && !current.ends_with('/') {
            current.push('/');
        }
        current.push_str(part);

        if let Err(e) = session.make_dir(&current) {
            debug!("Not creating {}: {}", current, e);
        }
    }
}
