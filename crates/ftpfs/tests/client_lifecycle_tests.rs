//! Client connection lifecycle tests
//!
//! NIST 800-53: SC-10 (Network Disconnect), IA-2 (Identification and Authentication)
//! Implementation: Connect, authentication failure, transparent reconnect and close

use ftpfs::{Client, ClientConfig, Error, MemoryServer};
use std::sync::Arc;

fn config() -> ClientConfig {
    ClientConfig::new("memory:21", "admin", "123456")
}

#[test]
fn test_connect_and_ping() {
    let server = MemoryServer::new();
    let client = Client::connect(config(), Arc::new(server.clone())).unwrap();

    client.ping().unwrap();
    assert_eq!(server.dial_count(), 1);
    assert_eq!(server.commands(), vec!["DIAL memory:21", "USER admin", "NOOP", "NOOP"]);
}

/// NIST 800-53: IA-2 - Rejected credentials
#[test]
fn test_auth_failure_still_returns_client() {
    let server = MemoryServer::new().with_user("admin", "secret");

    let failure = Client::connect(config(), Arc::new(server.clone())).unwrap_err();
    assert_eq!(
        failure.error.to_string(),
        "ftp connect: 530 Incorrect password, not logged in"
    );
    assert!(!failure.error.is_recoverable());

    let client = failure.into_client();
    let err = client.ping().unwrap_err();
    assert_eq!(err.to_string(), "530 Incorrect password, not logged in");

    // Nothing was ever established, so there is nothing to close
    client.close().unwrap();
}

#[test]
fn test_dial_failure_is_recoverable() {
    let server = MemoryServer::new();
    server.fail_with_argument("DIAL", "memory:21", "connection refused");

    let failure = Client::connect(config(), Arc::new(server.clone())).unwrap_err();
    assert_eq!(
        failure.to_string(),
        "ftp connect: Connection error: connection refused"
    );
    assert!(failure.error.is_recoverable());

    server.clear_failures();
    failure.client.ping().unwrap();
}

#[test]
fn test_lazy_client_connects_on_first_operation() {
    let server = MemoryServer::new();
    let client = Client::new(config(), Arc::new(server.clone()));
    assert_eq!(server.dial_count(), 0);

    client.ping().unwrap();
    assert_eq!(server.dial_count(), 1);
}

/// NIST 800-53: SC-10 - Dropped control connection
#[test]
fn test_reconnects_after_connection_drop() {
    let server = MemoryServer::new();
    server.add_file("first.txt", "hello world");
    let client = Client::connect(config(), Arc::new(server.clone())).unwrap();

    server.drop_connections();

    let files = client.list_files("/").unwrap();
    assert_eq!(files, vec!["/first.txt"]);
    assert_eq!(server.dial_count(), 2);
}

#[test]
fn test_close_twice_then_reconnect() {
    let server = MemoryServer::new();
    let client = Client::connect(config(), Arc::new(server.clone())).unwrap();

    client.close().unwrap();
    client.close().unwrap();
    assert_eq!(server.dial_count(), 1);

    client.ping().unwrap();
    assert_eq!(server.dial_count(), 2);
}

#[test]
fn test_operations_after_failed_reconnect_report_cause() {
    let server = MemoryServer::new();
    let client = Client::connect(config(), Arc::new(server.clone())).unwrap();

    server.drop_connections();
    server.fail("DIAL", "no route to host");

    let err = client.open("first.txt").unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
    assert!(err.to_string().contains("no route to host"));
}

#[test]
fn test_debug_hides_credentials() {
    let server = MemoryServer::new();
    let client = Client::connect(config(), Arc::new(server)).unwrap();

    let rendered = format!("{client:?}");
    assert!(rendered.contains("memory:21"));
    assert!(!rendered.contains("123456"));
}
