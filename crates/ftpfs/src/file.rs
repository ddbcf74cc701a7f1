//! Retrieved files

use crate::connection::Connection;
use crate::Result;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, TryLockError, Weak};
use std::time::SystemTime;
use tracing::debug;

/// A file retrieved from the server
///
/// Contents are either fully buffered in memory ([`crate::Client::open`]) or
/// streamed from the data connection ([`crate::Client::reader`]). Closing is
/// idempotent and also happens on drop.
pub struct File {
    name: String,
    contents: Option<Contents>,
    mod_time: Option<SystemTime>,
}

enum Contents {
    Buffered(Cursor<Vec<u8>>),
    Streaming(RemoteStream),
    Reader(Box<dyn Read + Send>),
}

/// Data connection of an in-flight retrieval
pub(crate) struct RemoteStream {
    stream: Option<Box<dyn Read + Send>>,
    connection: Weak<Mutex<Connection>>,
    generation: u64,
    abandoned: Arc<AtomicU64>,
}

impl RemoteStream {
    pub(crate) fn new(
        stream: Box<dyn Read + Send>,
        connection: Weak<Mutex<Connection>>,
        generation: u64,
        abandoned: Arc<AtomicU64>,
    ) -> Self {
        Self {
            stream: Some(stream),
            connection,
            generation,
            abandoned,
        }
    }

    /// Hand the stream back to the session that opened it
    ///
    /// If the session was replaced in the meantime the stream is simply
    /// dropped. Never blocks on the client lock: when it is held (say, by a
    /// walk whose visitor closes this file) the stream is dropped and the
    /// session is marked for replacement by the next operation.
    fn close(&mut self) -> Result<()> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        let Some(connection) = self.connection.upgrade() else {
            return Ok(());
        };

        let mut guard = match connection.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("Client busy, abandoning the session of an unfinished transfer");
                drop(stream);
                self.abandoned.store(self.generation, Ordering::Release);
                return Ok(());
            }
        };
        match guard.session_for(self.generation) {
            Some(session) => session.finish_retrieve(stream),
            None => {
                debug!("Session replaced before stream was closed");
                Ok(())
            }
        }
    }
}

impl Read for RemoteStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.as_mut() {
            Some(stream) => stream.read(buf),
            None => Ok(0),
        }
    }
}

impl File {
    /// A file holding `contents` in memory
    pub fn from_bytes(name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            contents: Some(Contents::Buffered(Cursor::new(contents))),
            mod_time: None,
        }
    }

    /// A file reading from an arbitrary stream
    pub fn from_reader(name: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        Self {
            name: name.into(),
            contents: Some(Contents::Reader(Box::new(reader))),
            mod_time: None,
        }
    }

    pub(crate) fn streaming(name: impl Into<String>, stream: RemoteStream) -> Self {
        Self {
            name: name.into(),
            contents: Some(Contents::Streaming(stream)),
            mod_time: None,
        }
    }

    /// Set the last modification time
    #[must_use]
    pub fn with_mod_time(mut self, mod_time: SystemTime) -> Self {
        self.mod_time = Some(mod_time);
        self
    }

    /// Base name of the file
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last modification time, if known
    pub fn mod_time(&self) -> Option<SystemTime> {
        self.mod_time
    }

    /// Whether the contents are held in memory
    pub fn is_buffered(&self) -> bool {
        matches!(self.contents, Some(Contents::Buffered(_)))
    }

    /// Whether the file has been closed
    pub fn is_closed(&self) -> bool {
        self.contents.is_none()
    }

    /// Release the contents
    ///
    /// For streamed files this completes the transfer on the session. Calling
    /// it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the session's error if completing a streamed transfer fails.
    pub fn close(&mut self) -> Result<()> {
        match self.contents.take() {
            Some(Contents::Streaming(mut stream)) => stream.close(),
            _ => Ok(()),
        }
    }
}

impl Read for File {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.contents.as_mut() {
            Some(Contents::Buffered(cursor)) => cursor.read(buf),
            Some(Contents::Streaming(stream)) => stream.read(buf),
            Some(Contents::Reader(reader)) => reader.read(buf),
            None => Ok(0),
        }
    }
}

impl Drop for File {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!("Error closing {}: {}", self.name, e);
        }
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let contents = match &self.contents {
            Some(Contents::Buffered(_)) => "buffered",
            Some(Contents::Streaming(_)) => "streaming",
            Some(Contents::Reader(_)) => "reader",
            None => "closed",
        };
        f.debug_struct("File")
            .field("name", &self.name)
            .field("contents", &contents)
            .field("mod_time", &self.mod_time)
            .finish()
    }
}
