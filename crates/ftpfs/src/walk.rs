//! Recursive directory traversal
//!
//! Directories are routing nodes: the walker descends into them but only
//! hands non-directory entries to the visitor. The visitor steers the walk
//! through [`WalkControl`].

use crate::path::join;
use crate::scoped::in_directory;
use crate::session::{Entry, EntryKind, Session};
use crate::{Error, Result};
use tracing::debug;

/// Visitor decision after seeing an entry
#[derive(Debug)]
pub enum WalkControl {
    /// Keep walking
    Continue,
    /// Skip the remaining entries of the directory containing this entry,
    /// including its unvisited subdirectories. The rest of the walk goes on.
    SkipSubtree,
    /// Stop the whole walk with this error
    Abort(Error),
}

/// Callback invoked for every file, symlink or listing failure
///
/// Arguments are the entry's path (prefixed with the walk root), the entry
/// and the listing error, if enumerating that path failed.
pub type Visitor<'a> = dyn FnMut(&str, &Entry, Option<Error>) -> WalkControl + 'a;

/// Walk `dir` depth-first
///
/// Walks of anything but the current directory run inside `dir`, and the
/// previous working directory is restored afterwards.
pub(crate) fn walk(session: &mut dyn Session, dir: &str, visit: &mut Visitor<'_>) -> Result<()> {
    debug!("Walking {:?}", dir);

    if dir.is_empty() || dir == "." {
        return Walker {
            session,
            root: ".",
            visit,
        }
        .run();
    }

    in_directory(session, dir, "walking", dir, |session| {
        Walker {
            session,
            root: dir,
            visit,
        }
        .run()
    })
}

struct Walker<'a, 'v> {
    session: &'a mut dyn Session,
    root: &'a str,
    visit: &'a mut Visitor<'v>,
}

impl Walker<'_, '_> {
    fn run(&mut self) -> Result<()> {
        let root = Entry::new(self.root, EntryKind::Folder);
        self.walk_dir(".", &root)
    }

    /// Walk the directory at `rel` (relative to the working directory)
    fn walk_dir(&mut self, rel: &str, dir: &Entry) -> Result<()> {
        let entries = match self.session.list(rel) {
            Ok(entries) => entries,
            Err(err) => {
                let path = self.display(rel);
                return match (self.visit)(&path, dir, Some(err)) {
                    WalkControl::Continue | WalkControl::SkipSubtree => Ok(()),
                    WalkControl::Abort(e) => Err(Error::walk(&path, e)),
                };
            }
        };

        for entry in entries {
            let child = join(rel, entry.name());
            if entry.is_dir() {
                self.walk_dir(&child, &entry)?;
                continue;
            }

            let path = self.display(&child);
            match (self.visit)(&path, &entry, None) {
                WalkControl::Continue => {}
                WalkControl::SkipSubtree => {
                    debug!("Skipping rest of {:?}", self.display(rel));
                    return Ok(());
                }
                WalkControl::Abort(e) => return Err(Error::walk(&path, e)),
            }
        }
        Ok(())
    }

    fn display(&self, rel: &str) -> String {
        join(self.root, rel)
    }
}
