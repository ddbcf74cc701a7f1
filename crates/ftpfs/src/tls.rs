//! TLS configuration for FTPS sessions
//!
//! NIST 800-53: SC-8 (Transmission Confidentiality), SC-13 (Cryptographic Protection)
//! Implementation: Server certificates are verified against the platform trust
//! store plus a caller-supplied CA certificate. Only TLS 1.2 and 1.3 are offered.

use crate::{ClientConfig, Error, Result};
use rustls::client::WebPkiServerVerifier;
use rustls::RootCertStore;
use rustls_pemfile::certs;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Root store holding the platform trust store plus the certificates in `ca_file`
///
/// # Errors
///
/// Returns [`Error::Tls`] if the file cannot be read or holds no usable
/// PEM certificate.
pub fn load_roots(ca_file: &Path) -> Result<RootCertStore> {
    let bytes = std::fs::read(ca_file)
        .map_err(|e| Error::Tls(format!("failed to read {}: {}", ca_file.display(), e)))?;

    let mut roots = RootCertStore::empty();

    // Seed from the system trust store when one is available
    let native = rustls_native_certs::load_native_certs();
    if !native.errors.is_empty() {
        debug!("Skipped {} errors loading native certificates", native.errors.len());
    }
    let (system, _) = roots.add_parsable_certificates(native.certs);
    debug!("Loaded {} system root certificates", system);

    let mut reader = BufReader::new(bytes.as_slice());
    let custom: Vec<_> = certs(&mut reader)
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| {
            Error::Tls(format!(
                "problem appending certificates from {}: {}",
                ca_file.display(),
                e
            ))
        })?;

    let (added, _) = roots.add_parsable_certificates(custom);
    if added == 0 {
        return Err(Error::Tls(format!(
            "problem appending certificates from {}",
            ca_file.display()
        )));
    }

    Ok(roots)
}

/// Build a client TLS configuration trusting the certificates in `ca_file`
///
/// # Errors
///
/// See [`load_roots`].
pub fn load_ca_config(ca_file: &Path) -> Result<rustls::ClientConfig> {
    let config = rustls::ClientConfig::builder_with_protocol_versions(&[
        &rustls::version::TLS13,
        &rustls::version::TLS12,
    ])
    .with_root_certificates(load_roots(ca_file)?)
    .with_no_client_auth();

    Ok(config)
}

/// TLS configuration to dial with, if any
///
/// Only a configured CA file enables TLS. A caller-supplied `tls_config`
/// then serves as the base: its settings are kept and server certificates
/// are verified against the CA file's roots. Without a CA file sessions
/// are plain FTP and `tls_config` is ignored.
///
/// # Errors
///
/// Propagates [`load_roots`] failures.
pub fn dial_tls(config: &ClientConfig) -> Result<Option<Arc<rustls::ClientConfig>>> {
    let Some(ca_file) = &config.ca_file else {
        if config.tls_config.is_some() {
            debug!("TLS configuration ignored, no CA file configured");
        }
        return Ok(None);
    };

    let Some(base) = &config.tls_config else {
        return load_ca_config(ca_file).map(|tls| Some(Arc::new(tls)));
    };

    let roots = Arc::new(load_roots(ca_file)?);
    let mut tls = rustls::ClientConfig::clone(base);
    let verifier =
        WebPkiServerVerifier::builder_with_provider(roots, Arc::clone(tls.crypto_provider()))
            .build()
            .map_err(|e| Error::Tls(format!("failed to build certificate verifier: {e}")))?;
    tls.dangerous().set_certificate_verifier(verifier);

    Ok(Some(Arc::new(tls)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_ca_file() {
        let err = load_ca_config(Path::new("/nonexistent/ca.pem")).unwrap_err();
        assert!(matches!(err, Error::Tls(_)));
        assert!(err.to_string().contains("failed to read /nonexistent/ca.pem"));
    }

    #[test]
    fn test_ca_file_without_certificates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a certificate").unwrap();

        let err = load_ca_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("problem appending certificates"));
    }

    #[test]
    fn test_plain_without_ca_file() {
        let config = ClientConfig::new("127.0.0.1:2121", "admin", "123456");
        assert!(dial_tls(&config).unwrap().is_none());
    }

    #[test]
    fn test_dial_tls_propagates_ca_errors() {
        let config =
            ClientConfig::new("127.0.0.1:2121", "admin", "123456").with_ca_file("/nonexistent/ca.pem");
        assert!(dial_tls(&config).is_err());
    }

    fn ca_fixture() -> &'static Path {
        Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/ca.pem"))
    }

    fn base_config() -> Arc<rustls::ClientConfig> {
        let mut tls = rustls::ClientConfig::builder_with_protocol_versions(&[&rustls::version::TLS13])
            .with_root_certificates(RootCertStore::empty())
            .with_no_client_auth();
        tls.alpn_protocols = vec![b"ftp".to_vec()];
        Arc::new(tls)
    }

    #[test]
    fn test_tls_config_without_ca_file_is_plain() {
        let config =
            ClientConfig::new("127.0.0.1:2121", "admin", "123456").with_tls_config(base_config());
        assert!(dial_tls(&config).unwrap().is_none());
    }

    #[test]
    fn test_ca_file_enables_tls() {
        let roots = load_roots(ca_fixture()).unwrap();
        assert!(!roots.is_empty());

        let config =
            ClientConfig::new("127.0.0.1:2121", "admin", "123456").with_ca_file(ca_fixture());
        let tls = dial_tls(&config).unwrap().unwrap();
        assert!(tls.alpn_protocols.is_empty());
    }

    #[test]
    fn test_tls_config_keeps_settings_with_ca_roots() {
        let base = base_config();
        let config = ClientConfig::new("127.0.0.1:2121", "admin", "123456")
            .with_ca_file(ca_fixture())
            .with_tls_config(Arc::clone(&base));

        let tls = dial_tls(&config).unwrap().unwrap();
        assert!(!Arc::ptr_eq(&tls, &base));
        assert_eq!(tls.alpn_protocols, vec![b"ftp".to_vec()]);
    }

    #[test]
    fn test_tls_config_with_bad_ca_file_fails() {
        let config = ClientConfig::new("127.0.0.1:2121", "admin", "123456")
            .with_ca_file("/nonexistent/ca.pem")
            .with_tls_config(base_config());
        assert!(dial_tls(&config).is_err());
    }
}
