//! Remote path utilities
//!
//! Remote FTP paths always use `/` as separator, regardless of the local
//! operating system, so `std::path` is not used for them.

/// Lexically clean a remote path.
///
/// Collapses repeated separators, removes `.` elements and resolves `..`
/// against the preceding element. An empty result becomes `"."`.
///
/// ```
/// use ftpfs::path::clean;
/// assert_eq!(clean("archive/"), "archive");
/// assert_eq!(clean("/a/./b/../c"), "/a/c");
/// assert_eq!(clean(""), ".");
/// ```
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Join two remote path elements and clean the result.
///
/// Empty elements are ignored; joining two empty elements yields `""`.
pub fn join(base: &str, name: &str) -> String {
    match (base.is_empty(), name.is_empty()) {
        (true, true) => String::new(),
        (true, false) => clean(name),
        (false, true) => clean(base),
        (false, false) => clean(&format!("{base}/{name}")),
    }
}

/// Split a remote path immediately after its final separator.
///
/// The directory part keeps its trailing separator and is empty when the
/// path has no directory component.
///
/// ```
/// use ftpfs::path::split;
/// assert_eq!(split("dir/f.txt"), ("dir/", "f.txt"));
/// assert_eq!(split("f.txt"), ("", "f.txt"));
/// assert_eq!(split("/f.txt"), ("/", "f.txt"));
/// ```
pub fn split(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => path.split_at(idx + 1),
        None => ("", path),
    }
}

/// Last element of a remote path, ignoring trailing separators.
pub fn base(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.is_empty() { "." } else { "/" };
    }
    split(trimmed).1
}
