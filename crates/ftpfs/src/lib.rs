//! # ftpfs
//!
//! Filesystem-like client for FTP and FTPS servers.
//!
//! The client wraps a single stateful protocol session behind a blocking,
//! thread-safe facade:
//!
//! - Automatic reconnection: every operation probes the session with `NOOP`
//!   and transparently dials and logs in again if it is gone
//! - Directory-scoped commands: path-relative commands run from inside the
//!   target's parent directory, and the working directory is restored
//!   afterwards
//! - File operations (open, stream, upload, delete)
//! - Case-insensitive file listing and recursive walks
//! - Implicit or explicit FTPS with a custom CA bundle
//!
//! The wire protocol is pluggable through [`Connector`]. The `suppaftp`
//! feature provides a real FTP connector; [`MemoryServer`] serves an
//! in-process tree for tests, and [`MockClient`] stands in for the whole
//! client.

pub mod client;
pub mod config;
mod connection;
pub mod error;
pub mod file;
#[cfg(feature = "suppaftp")]
pub mod ftp;
mod list;
pub mod memory;
pub mod mock;
pub mod path;
mod scoped;
pub mod session;
pub mod tls;
pub mod walk;

pub use client::{Client, ConnectFailure, RemoteFs};
pub use config::{ClientConfig, LogFormat, LoggingConfig, TlsMode};
pub use error::{Error, Result};
pub use file::File;
#[cfg(feature = "suppaftp")]
pub use ftp::FtpConnector;
pub use memory::MemoryServer;
pub use mock::MockClient;
pub use session::{Connector, DialOptions, Entry, EntryKind, Session};
pub use walk::{Visitor, WalkControl};
