//! FTP sessions over the network
//!
//! NIST 800-53: SC-8 (Transmission Confidentiality and Integrity)
//! Implementation: When the client is configured for TLS, the control
//! connection is secured before credentials are sent. Implicit FTPS speaks
//! TLS from the first byte; explicit FTPS upgrades with `AUTH TLS`.

use crate::config::TlsMode;
use crate::session::{Connector, DialOptions, Entry, EntryKind, Session};
use crate::{Error, Result};
use std::io::Read;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use suppaftp::list::File as ListEntry;
use suppaftp::{FtpError, Mode, RustlsConnector, RustlsFtpStream};
use tracing::{debug, trace};

impl From<FtpError> for Error {
    fn from(err: FtpError) -> Self {
        match err {
            FtpError::ConnectionError(e) => Error::Connection(e.to_string()),
            FtpError::SecureError(e) => Error::Tls(e),
            FtpError::UnexpectedResponse(response) => Error::Remote(
                String::from_utf8_lossy(&response.body).trim().to_string(),
            ),
            other => Error::Remote(other.to_string()),
        }
    }
}

/// Dials FTP servers with `suppaftp`
#[derive(Debug, Default, Clone, Copy)]
pub struct FtpConnector;

impl Connector for FtpConnector {
    fn dial(&self, options: &DialOptions) -> Result<Box<dyn Session>> {
        let mut stream = match (&options.tls, options.tls_mode) {
            (Some(tls), TlsMode::Implicit) => {
                let domain = server_name(&options.host);
                if !options.timeout.is_zero() {
                    debug!("Dial timeout is not applied to implicit FTPS");
                }
                debug!("Connecting with implicit TLS to {}", domain);
                RustlsFtpStream::connect_secure_implicit(
                    options.host.as_str(),
                    RustlsConnector::from(Arc::clone(tls)),
                    domain,
                )?
            }
            (Some(tls), TlsMode::Explicit) => {
                let domain = server_name(&options.host);
                debug!("Upgrading control connection to TLS for {}", domain);
                connect_plain(options)?
                    .into_secure(RustlsConnector::from(Arc::clone(tls)), domain)?
            }
            (None, _) => connect_plain(options)?,
        };

        if !options.disable_epsv {
            stream.set_mode(Mode::ExtendedPassive);
        }

        Ok(Box::new(FtpSession { stream }))
    }
}

fn connect_plain(options: &DialOptions) -> Result<RustlsFtpStream> {
    if options.timeout.is_zero() {
        return Ok(RustlsFtpStream::connect(options.host.as_str())?);
    }

    let addr = options
        .host
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| Error::connection(format!("no address for {}", options.host)))?;
    Ok(RustlsFtpStream::connect_timeout(addr, options.timeout)?)
}

/// Host part of `host:port`, used for TLS server name verification
fn server_name(host: &str) -> &str {
    let name = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    name.trim_start_matches('[').trim_end_matches(']')
}

/// A live FTP control connection
pub struct FtpSession {
    stream: RustlsFtpStream,
}

impl std::fmt::Debug for FtpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpSession").finish_non_exhaustive()
    }
}

impl Session for FtpSession {
    fn login(&mut self, username: &str, password: &str) -> Result<()> {
        Ok(self.stream.login(username, password)?)
    }

    fn noop(&mut self) -> Result<()> {
        Ok(self.stream.noop()?)
    }

    fn quit(&mut self) -> Result<()> {
        Ok(self.stream.quit()?)
    }

    fn current_dir(&mut self) -> Result<String> {
        Ok(self.stream.pwd()?)
    }

    fn change_dir(&mut self, path: &str) -> Result<()> {
        Ok(self.stream.cwd(path)?)
    }

    fn retrieve(&mut self, name: &str) -> Result<Box<dyn Read + Send>> {
        let stream = self.stream.retr_as_stream(name)?;
        Ok(Box::new(stream))
    }

    fn finish_retrieve(&mut self, stream: Box<dyn Read + Send>) -> Result<()> {
        Ok(self.stream.finalize_retr_stream(stream)?)
    }

    fn store(&mut self, name: &str, mut contents: &mut dyn Read) -> Result<()> {
        let written = self.stream.put_file(name, &mut contents)?;
        trace!("Stored {} bytes as {}", written, name);
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        Ok(self.stream.rm(name)?)
    }

    fn make_dir(&mut self, path: &str) -> Result<()> {
        Ok(self.stream.mkdir(path)?)
    }

    fn list(&mut self, dir: &str) -> Result<Vec<Entry>> {
        let lines = self.stream.list(Some(dir))?;

        let mut entries = Vec::with_capacity(lines.len());
        for line in lines {
            match line.parse::<ListEntry>() {
                Ok(file) => {
                    if file.name() == "." || file.name() == ".." {
                        continue;
                    }
                    entries.push(entry_from_listing(&file));
                }
                Err(e) => debug!("Skipping unparsable listing line {:?}: {}", line, e),
            }
        }
        Ok(entries)
    }
}

fn entry_from_listing(file: &ListEntry) -> Entry {
    let kind = if file.is_directory() {
        EntryKind::Folder
    } else if file.is_symlink() {
        EntryKind::Symlink
    } else if file.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    };
    Entry::new(file.name(), kind).with_size(file.size() as u64)
}
