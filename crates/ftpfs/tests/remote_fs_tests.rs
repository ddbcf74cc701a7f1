//! Code written against `RemoteFs` runs on the real client and on the mock

use ftpfs::{Client, ClientConfig, MemoryServer, MockClient, RemoteFs, WalkControl};
use std::io::{Cursor, Read};
use std::sync::Arc;
use tempfile::TempDir;

/// Archive a report and read it back, the way an application would
fn archive_report(fs: &dyn RemoteFs) -> Vec<String> {
    fs.upload_file(
        "reports/today.txt",
        Box::new(Cursor::new(b"all systems nominal".to_vec())),
    )
    .unwrap();

    let mut file = fs.open("reports/today.txt").unwrap();
    let mut contents = String::new();
    file.read_to_string(&mut contents).unwrap();
    assert_eq!(contents, "all systems nominal");

    let mut walked = Vec::new();
    fs.walk("reports", &mut |path, _, _| {
        walked.push(path.to_string());
        WalkControl::Continue
    })
    .unwrap();
    assert_eq!(walked, vec!["reports/today.txt"]);

    fs.delete("reports/today.txt").unwrap();
    fs.list_files("reports").unwrap()
}

#[test]
fn test_client_as_remote_fs() {
    let server = MemoryServer::new();
    server.add_dir("reports");
    let config = ClientConfig::new("memory:21", "admin", "123456");
    let client = Client::connect(config, Arc::new(server)).unwrap();

    assert!(archive_report(&client).is_empty());
    client.close().unwrap();
}

#[test]
fn test_mock_as_remote_fs() {
    let temp = TempDir::new().unwrap();
    let mock = MockClient::new(temp.path());

    assert!(archive_report(&mock).is_empty());
    assert!(temp.path().join("reports").is_dir());
}

#[test]
fn test_mock_specific_error_wins() {
    let temp = TempDir::new().unwrap();
    let mut mock = MockClient::new(temp.path());
    mock.err = Some("server unavailable".into());
    mock.open_err = Some("551 File not available".into());

    assert_eq!(mock.open("x").unwrap_err().to_string(), "551 File not available");
    assert_eq!(mock.reader("x").unwrap_err().to_string(), "server unavailable");
    assert_eq!(mock.delete("x").unwrap_err().to_string(), "server unavailable");

    mock.err = None;
    mock.ping().unwrap();
    mock.close().unwrap();
}
