//! Error types for FTP client operations
//!
//! NIST 800-53: SI-11 (Error Handling)
//! Implementation: Every remote failure is returned as a value, wrapped with
//! the operation and path it occurred on. Nothing here is fatal to the process.

use thiserror::Error;

/// Result type alias for FTP client operations
pub type Result<T> = std::result::Result<T, Error>;

/// FTP client error types
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection error
    ///
    /// Dial, probe or transport failures. The next serialized operation
    /// reconnects transparently.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Error reply from the remote server, kept verbatim
    /// (e.g. `551 File not available`)
    #[error("{0}")]
    Remote(String),

    /// TLS setup error
    ///
    /// NIST 800-53: SC-8 (Transmission Confidentiality), SI-11
    #[error("TLS error: {0}")]
    Tls(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path
    ///
    /// NIST 800-53: SI-10 (Input Validation)
    /// Rejected before any command is sent to the server.
    #[error("FTP client: invalid path {0}")]
    InvalidPath(String),

    /// A directory name that does not form a valid listing glob
    ///
    /// NIST 800-53: SI-10 (Input Validation)
    #[error("syntax error in pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// The initial connection made while constructing a client failed
    #[error("ftp connect: {0}")]
    Connect(Box<Error>),

    /// A retrieve command failed
    #[error("retrieving {path} failed: {source}")]
    Retrieve {
        /// Path as requested by the caller
        path: String,
        /// Underlying failure
        source: Box<Error>,
    },

    /// Draining a retrieved file into memory failed
    #[error("reading {path} failed: {source}")]
    Read {
        /// Path as requested by the caller
        path: String,
        /// Underlying failure
        source: Box<Error>,
    },

    /// Listing a directory failed
    #[error("listing {dir} failed: {source}")]
    List {
        /// Directory as requested by the caller
        dir: String,
        /// Underlying failure
        source: Box<Error>,
    },

    /// A walk was aborted by its visitor
    #[error("walking {path} failed: {source}")]
    Walk {
        /// Path of the entry the visitor aborted on
        path: String,
        /// Error returned by the visitor
        source: Box<Error>,
    },

    /// Returning to the previous working directory failed
    ///
    /// The session's working directory is now unknown, which affects every
    /// later command on it.
    #[error("FTP: problem {action} {path}: {source}")]
    Restore {
        /// Operation that ran in the directory (`uploading`, `walking`, ...)
        action: &'static str,
        /// Path the operation ran against
        path: String,
        /// Change-directory failure
        source: Box<Error>,
    },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Check if error is recoverable
    ///
    /// # Returns
    ///
    /// `true` if a fresh session is likely to succeed where this one failed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::Connection(_) => true,
            Error::Connect(inner) => inner.is_recoverable(),
            _ => false,
        }
    }

    /// Check if error is due to caller input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidPath(_) | Error::Pattern(_) | Error::Config(_)
        )
    }

    /// Check if the server reported that a file or directory does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Retrieve { source, .. }
            | Error::Read { source, .. }
            | Error::List { source, .. }
            | Error::Walk { source, .. } => source.is_not_found(),
            Error::Remote(message) => {
                let message = message.to_lowercase();
                message.contains("no such file or directory")
                    || message.starts_with("550")
                    || message.starts_with("551")
            }
            _ => false,
        }
    }

    /// Check if the session's working directory could not be restored
    ///
    /// NIST 800-53: SI-11
    /// Implementation: Callers should treat the connection state as unreliable.
    pub fn is_connection_integrity(&self) -> bool {
        matches!(self, Error::Restore { .. })
    }

    /// Create a connection error with context
    pub fn connection(context: impl Into<String>) -> Self {
        Error::Connection(context.into())
    }

    /// Create a remote reply error
    pub fn remote(message: impl Into<String>) -> Self {
        Error::Remote(message.into())
    }

    pub(crate) fn retrieve(path: &str, source: Error) -> Self {
        Error::Retrieve {
            path: path.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn list(dir: &str, source: Error) -> Self {
        Error::List {
            dir: dir.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn walk(path: &str, source: Error) -> Self {
        Error::Walk {
            path: path.to_string(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_messages() {
        let err = Error::retrieve("new.txt", Error::remote("551 File not available"));
        assert_eq!(err.to_string(), "retrieving new.txt failed: 551 File not available");

        let err = Error::list("/archive", Error::connection("reset"));
        assert_eq!(
            err.to_string(),
            "listing /archive failed: Connection error: reset"
        );

        let err = Error::walk("a/b.txt", Error::Other("stop".into()));
        assert_eq!(err.to_string(), "walking a/b.txt failed: stop");

        let err = Error::Connect(Box::new(Error::remote(
            "530 Incorrect password, not logged in",
        )));
        assert_eq!(
            err.to_string(),
            "ftp connect: 530 Incorrect password, not logged in"
        );
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::Timeout("test".into()).is_recoverable());
        assert!(Error::Connection("test".into()).is_recoverable());
        assert!(Error::Connect(Box::new(Error::Connection("test".into()))).is_recoverable());
        assert!(!Error::Remote("550 nope".into()).is_recoverable());
        assert!(!Error::InvalidPath("".into()).is_recoverable());
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::remote("550 /x: no such file or directory").is_not_found());
        assert!(Error::retrieve("x", Error::remote("551 File not available")).is_not_found());
        assert!(!Error::remote("530 Not logged in").is_not_found());
        assert!(!Error::Connection("no such file or directory".into()).is_not_found());
    }

    #[test]
    fn test_restore_is_connection_integrity() {
        let err = Error::Restore {
            action: "uploading",
            path: "f.txt".into(),
            source: Box::new(Error::remote("550 gone")),
        };
        assert!(err.is_connection_integrity());
        assert_eq!(err.to_string(), "FTP: problem uploading f.txt: 550 gone");
    }
}
