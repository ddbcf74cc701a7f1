//! File listing by path pattern
//!
//! FTP servers differ in how they treat case. Listing therefore walks the
//! whole tree, matches paths against a glob in lower case, and reports each
//! match with exactly the case the server used.

use crate::path::{base, clean, join};
use crate::session::Session;
use crate::walk::{walk, WalkControl};
use crate::{Error, Result};
use glob::{MatchOptions, Pattern};
use tracing::debug;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Glob selecting the immediate children of `dir`
///
/// `"/"`, `"."` and `""` all select the top level of the walk root.
pub(crate) fn listing_pattern(dir: &str) -> String {
    if dir == "/" {
        return "*".to_string();
    }

    let normalized = clean(dir.strip_prefix('/').unwrap_or(dir));
    if normalized == "." {
        if dir.is_empty() {
            "*".to_string()
        } else {
            join(dir, "*")
        }
    } else {
        format!("{normalized}/*")
    }
}

/// Matches walked paths against the listing pattern for one directory
pub(crate) struct FileMatcher<'a> {
    dir: &'a str,
    pattern: Pattern,
    prefix: String,
}

impl<'a> FileMatcher<'a> {
    /// Fails with [`Error::Pattern`] when `dir` does not form a valid glob
    pub(crate) fn new(dir: &'a str) -> Result<Self> {
        let lowered = listing_pattern(dir).to_lowercase();
        let pattern = Pattern::new(&lowered)?;
        let prefix = lowered.strip_suffix('*').unwrap_or(&lowered).to_string();

        Ok(Self {
            dir,
            pattern,
            prefix,
        })
    }

    /// The path to report for `path`, if it is listed
    pub(crate) fn matches(&self, path: &str) -> Option<String> {
        let lowered = path.to_lowercase();
        if !self.pattern.matches_with(&lowered, MATCH_OPTIONS) {
            return None;
        }

        let found = lowered
            .find(&self.prefix)
            .and_then(|idx| path.get(idx..));
        match found {
            Some(found) => {
                if self.dir.starts_with('/') && !found.starts_with('/') {
                    Some(format!("/{found}"))
                } else {
                    Some(found.to_string())
                }
            }
            None => Some(join(self.dir, base(path))),
        }
    }
}

/// Paths of the files directly inside `dir`
///
/// Results keep the server's case and carry a leading `/` when `dir` has one.
pub(crate) fn list_files(session: &mut dyn Session, dir: &str) -> Result<Vec<String>> {
    let matcher = FileMatcher::new(dir).map_err(|e| Error::list(dir, e))?;
    let mut filenames = Vec::new();

    walk(session, ".", &mut |path, entry, err| {
        if let Some(err) = err {
            return WalkControl::Abort(err);
        }
        if entry.is_dir() {
            return WalkControl::Continue;
        }
        if let Some(found) = matcher.matches(path) {
            filenames.push(found);
        }
        WalkControl::Continue
    })
    .map_err(|e| Error::list(dir, e))?;

    debug!("Listed {} files in {:?}", filenames.len(), dir);
    Ok(filenames)
}
