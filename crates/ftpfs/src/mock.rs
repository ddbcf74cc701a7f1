//! Mock client backed by a local directory
//!
//! [`MockClient`] implements [`RemoteFs`] over the local filesystem so code
//! written against the client can be tested without any server. Each
//! operation can be made to fail through the `*_err` fields; an
//! operation-specific error wins over `err`.

use crate::client::RemoteFs;
use crate::file::File;
use crate::path::{base, join};
use crate::session::{Entry, EntryKind};
use crate::walk::{Visitor, WalkControl};
use crate::{Error, Result};
use std::io::Read;
use std::path::{Path, PathBuf};

/// A [`RemoteFs`] rooted in a local directory
#[derive(Debug, Clone, Default)]
pub struct MockClient {
    root: PathBuf,

    /// Returned by every operation unless a specific error is set
    pub err: Option<String>,

    /// Returned by `ping`
    pub ping_err: Option<String>,
    /// Returned by `close`
    pub close_err: Option<String>,

    /// Returned by `open`
    pub open_err: Option<String>,
    /// Returned by `reader`
    pub reader_err: Option<String>,

    /// Returned by `delete`
    pub delete_err: Option<String>,
    /// Returned by `upload_file`
    pub upload_file_err: Option<String>,

    /// Returned by `list_files`
    pub list_files_err: Option<String>,
    /// Returned by `walk`
    pub walk_err: Option<String>,
}

impl MockClient {
    /// Create a mock client serving files under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Local directory backing the mock
    pub fn dir(&self) -> &Path {
        &self.root
    }

    fn injected(&self, specific: &Option<String>) -> Result<()> {
        match specific.as_ref().or(self.err.as_ref()) {
            Some(message) => Err(Error::Other(message.clone())),
            None => Ok(()),
        }
    }

    fn local(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn walk_local(
        &self,
        local: &Path,
        rel: &str,
        root: &str,
        visit: &mut Visitor<'_>,
    ) -> Result<()> {
        let mut children: Vec<_> = std::fs::read_dir(local)?.collect::<std::io::Result<_>>()?;
        children.sort_by_key(std::fs::DirEntry::file_name);

        for child in children {
            let name = child.file_name().to_string_lossy().into_owned();
            let child_rel = join(rel, &name);
            let file_type = child.file_type()?;

            if file_type.is_dir() {
                self.walk_local(&child.path(), &child_rel, root, visit)?;
                continue;
            }

            let kind = if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };
            let path = join(root, &child_rel);
            match visit(&path, &Entry::new(name, kind), None) {
                WalkControl::Continue => {}
                WalkControl::SkipSubtree => return Ok(()),
                WalkControl::Abort(e) => return Err(Error::walk(&path, e)),
            }
        }
        Ok(())
    }
}

impl RemoteFs for MockClient {
    fn ping(&self) -> Result<()> {
        self.injected(&self.ping_err)
    }

    fn close(&self) -> Result<()> {
        self.injected(&self.close_err)
    }

    fn open(&self, path: &str) -> Result<File> {
        self.injected(&self.open_err)?;
        let file = std::fs::File::open(self.local(path))?;
        Ok(File::from_reader(base(path), file))
    }

    fn reader(&self, path: &str) -> Result<File> {
        self.injected(&self.reader_err)?;
        self.open(path)
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.injected(&self.delete_err)?;
        match std::fs::remove_file(self.local(path)) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => Ok(other?),
        }
    }

    fn upload_file(&self, path: &str, mut contents: Box<dyn Read + Send>) -> Result<()> {
        self.injected(&self.upload_file_err)?;
        let local = self.local(path);
        if let Some(parent) = local.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut data = Vec::new();
        contents.read_to_end(&mut data)?;
        std::fs::write(local, data)?;
        Ok(())
    }

    fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        self.injected(&self.list_files_err)?;
        let local = self.local(dir);
        std::fs::create_dir_all(&local)?;

        let mut out = Vec::new();
        for entry in std::fs::read_dir(&local)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            out.push(join(dir, &entry.file_name().to_string_lossy()));
        }
        Ok(out)
    }

    fn walk(&self, dir: &str, visit: &mut Visitor<'_>) -> Result<()> {
        self.injected(&self.walk_err)?;
        let local = self.local(dir);
        std::fs::create_dir_all(&local)?;

        let root = if dir.is_empty() { "." } else { dir };
        self.walk_local(&local, ".", root, visit)
    }
}
