//! Listing and walk tests against the in-memory server
//!
//! NIST 800-53: AC-3 (Access Enforcement), SI-11 (Error Handling)
//! Implementation: Case-insensitive listing with case-preserving results,
//! depth-first walks with visitor control

use ftpfs::{Client, ClientConfig, EntryKind, Error, MemoryServer, WalkControl};
use std::sync::Arc;

fn setup() -> (Client, MemoryServer) {
    let server = MemoryServer::new();
    server.add_file("first.txt", "hello world");
    server.add_file("archive/old.txt", "previous data");
    server.add_file("archive/empty2.txt", "");
    server.add_file("archive/nested/deep.txt", "deep");
    server.add_file("Upper/Names.TXT", "shouting");
    server.add_symlink("latest");

    let config = ClientConfig::new("memory:21", "admin", "123456");
    let client = Client::connect(config, Arc::new(server.clone())).unwrap();
    (client, server)
}

fn sorted(mut files: Vec<String>) -> Vec<String> {
    files.sort();
    files
}

fn walked(client: &Client, dir: &str) -> Vec<String> {
    let mut found = Vec::new();
    client
        .walk(dir, |path, _, err| {
            assert!(err.is_none());
            found.push(path.to_string());
            WalkControl::Continue
        })
        .unwrap();
    found
}

#[test]
fn test_list_root_variants() {
    let (client, _server) = setup();

    assert_eq!(
        sorted(client.list_files("/").unwrap()),
        vec!["/first.txt", "/latest"]
    );
    assert_eq!(
        sorted(client.list_files("").unwrap()),
        vec!["first.txt", "latest"]
    );
    assert_eq!(
        sorted(client.list_files(".").unwrap()),
        vec!["first.txt", "latest"]
    );
}

#[test]
fn test_list_subdirectory() {
    let (client, _server) = setup();

    assert_eq!(
        sorted(client.list_files("archive").unwrap()),
        vec!["archive/empty2.txt", "archive/old.txt"]
    );
    assert_eq!(
        sorted(client.list_files("/archive/").unwrap()),
        vec!["/archive/empty2.txt", "/archive/old.txt"]
    );
    assert_eq!(
        client.list_files("archive/nested").unwrap(),
        vec!["archive/nested/deep.txt"]
    );
}

#[test]
fn test_list_is_case_insensitive_and_preserves_case() {
    let (client, _server) = setup();

    assert_eq!(client.list_files("/upper").unwrap(), vec!["/Upper/Names.TXT"]);
    assert_eq!(client.list_files("UPPER").unwrap(), vec!["Upper/Names.TXT"]);
}

#[test]
fn test_list_missing_directory_is_empty() {
    let (client, _server) = setup();

    assert!(client.list_files("/does-not-exist").unwrap().is_empty());
}

#[test]
fn test_list_failure_is_wrapped() {
    let (client, server) = setup();
    server.fail_with_argument("LIST", ".", "450 Requested file action not taken");

    let err = client.list_files("/").unwrap_err();
    assert!(matches!(err, Error::List { .. }));
    assert_eq!(
        err.to_string(),
        "listing / failed: walking . failed: 450 Requested file action not taken"
    );
}

#[test]
fn test_list_invalid_pattern_is_an_error() {
    let (client, server) = setup();
    server.add_file("foo[/bar.txt", "bracketed");

    let err = client.list_files("foo[").unwrap_err();
    assert!(matches!(err, Error::List { .. }));
    assert!(err.to_string().starts_with("listing foo[ failed: syntax error in pattern"));
}

#[test]
fn test_walk_visits_files_only() {
    let (client, _server) = setup();

    assert_eq!(
        walked(&client, "."),
        vec![
            "Upper/Names.TXT",
            "archive/empty2.txt",
            "archive/nested/deep.txt",
            "archive/old.txt",
            "first.txt",
            "latest",
        ]
    );
}

#[test]
fn test_walk_subdirectory_restores_working_directory() {
    let (client, server) = setup();
    server.clear_commands();

    assert_eq!(
        walked(&client, "archive"),
        vec![
            "archive/empty2.txt",
            "archive/nested/deep.txt",
            "archive/old.txt",
        ]
    );
    assert_eq!(server.commands().last().map(String::as_str), Some("CWD /"));

    // Relative listing still resolves from the root afterwards
    assert_eq!(
        sorted(client.list_files("").unwrap()),
        vec!["first.txt", "latest"]
    );
}

#[test]
fn test_walk_reports_entry_details() {
    let (client, _server) = setup();

    let mut kinds = Vec::new();
    client
        .walk("/", |path, entry, _| {
            kinds.push((path.to_string(), entry.kind(), entry.size()));
            WalkControl::Continue
        })
        .unwrap();

    assert!(kinds.contains(&("/latest".to_string(), EntryKind::Symlink, None)));
    assert!(kinds.contains(&("/first.txt".to_string(), EntryKind::File, Some(11))));
}

#[test]
fn test_walk_skip_subtree() {
    let (client, _server) = setup();

    let mut found = Vec::new();
    client
        .walk(".", |path, _, _| {
            found.push(path.to_string());
            if path.starts_with("archive/") {
                WalkControl::SkipSubtree
            } else {
                WalkControl::Continue
            }
        })
        .unwrap();

    assert_eq!(
        found,
        vec!["Upper/Names.TXT", "archive/empty2.txt", "first.txt", "latest"]
    );
}

#[test]
fn test_walk_abort() {
    let (client, server) = setup();

    let err = client
        .walk("archive", |path, _, _| {
            if path.ends_with("old.txt") {
                WalkControl::Abort(Error::Other("found it".into()))
            } else {
                WalkControl::Continue
            }
        })
        .unwrap_err();

    assert_eq!(err.to_string(), "walking archive/old.txt failed: found it");
    assert_eq!(server.commands().last().map(String::as_str), Some("CWD /"));
}

#[test]
fn test_walk_listing_errors_reach_visitor() {
    let (client, server) = setup();
    server.fail_with_argument("LIST", "nested", "550 Permission denied");

    let mut failures = Vec::new();
    let mut files = 0;
    client
        .walk("archive", |path, entry, err| {
            match err {
                Some(err) => failures.push(format!("{path} {} {err}", entry.name())),
                None => files += 1,
            }
            WalkControl::Continue
        })
        .unwrap();

    assert_eq!(failures, vec!["archive/nested nested 550 Permission denied"]);
    assert_eq!(files, 2);
}

#[test]
fn test_walk_missing_directory() {
    let (client, _server) = setup();

    let err = client.walk("nope", |_, _, _| WalkControl::Continue).unwrap_err();
    assert_eq!(
        err.to_string(),
        "550 Directory change to /nope failed: no such file or directory"
    );
}
