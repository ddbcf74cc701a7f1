//! Directory-scoped command execution
//!
//! Some FTP commands are only reliable against a bare name in the current
//! working directory. [`in_directory`] changes into a directory, runs an
//! operation and changes back on every exit path.

use crate::path::split;
use crate::session::Session;
use crate::{Error, Result};
use tracing::{debug, warn};

/// Working-directory change that is undone when the guard goes away
///
/// [`DirGuard::restore`] reports restoration failures. If the guard is
/// dropped without it (a panic unwinding through the operation) the previous
/// directory is still restored, best effort.
pub(crate) struct DirGuard<'a> {
    session: &'a mut dyn Session,
    previous: Option<String>,
}

impl<'a> DirGuard<'a> {
    /// Remember the working directory and change into `dir`
    ///
    /// Nothing needs restoring if either step fails.
    pub(crate) fn enter(session: &'a mut dyn Session, dir: &str) -> Result<Self> {
        let previous = session.current_dir()?;
        session.change_dir(dir)?;
        debug!("Changed directory from {} into {}", previous, dir);

        Ok(Self {
            session,
            previous: Some(previous),
        })
    }

    pub(crate) fn session(&mut self) -> &mut dyn Session {
        &mut *self.session
    }

    /// Change back to the remembered directory
    pub(crate) fn restore(mut self) -> Result<()> {
        match self.previous.take() {
            Some(previous) => self.session.change_dir(&previous),
            None => Ok(()),
        }
    }
}

impl Drop for DirGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(e) = self.session.change_dir(&previous) {
                warn!("Failed to restore working directory {}: {}", previous, e);
            }
        }
    }
}

/// Run `op` inside `dir`, then restore the previous working directory
///
/// An empty `dir` runs `op` in place. A restoration failure is reported in
/// preference to the operation's own result, since it leaves the session
/// in an unknown directory for every later command.
pub(crate) fn in_directory<T>(
    session: &mut dyn Session,
    dir: &str,
    action: &'static str,
    path: &str,
    op: impl FnOnce(&mut dyn Session) -> Result<T>,
) -> Result<T> {
    if dir.is_empty() {
        return op(session);
    }

    let mut guard = DirGuard::enter(session, dir)?;
    let result = op(guard.session());

    guard.restore().map_err(|e| Error::Restore {
        action,
        path: path.to_string(),
        source: Box::new(e),
    })?;
    result
}

/// Run `op` against the leaf name of `path` from inside its parent directory
pub(crate) fn in_parent<T>(
    session: &mut dyn Session,
    path: &str,
    action: &'static str,
    op: impl FnOnce(&mut dyn Session, &str) -> Result<T>,
) -> Result<T> {
    let (dir, name) = split(path);
    in_directory(session, dir, action, name, |session| op(session, name))
}
