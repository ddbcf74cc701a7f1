//! Connection lifecycle management
//!
//! NIST 800-53: SC-10 (Network Disconnect), SC-23 (Session Authenticity)
//! Implementation: The client owns at most one authenticated session. Before
//! every operation the session is probed with NOOP; a dead session is
//! discarded and replaced by a freshly dialed and authenticated one.

use crate::session::{Connector, DialOptions, Session};
use crate::{tls, ClientConfig, Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owner of the client's (at most one) live session
///
/// Not thread-safe on its own; the client keeps it behind its mutex.
pub(crate) struct Connection {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    session: Option<Box<dyn Session>>,
    generation: u64,
    /// Generation whose session must be discarded; zero when none
    abandoned: Arc<AtomicU64>,
}

impl Connection {
    pub(crate) fn new(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            session: None,
            generation: 0,
            abandoned: Arc::default(),
        }
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether a session was ever established and not yet closed
    pub(crate) fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Counter identifying the current session; bumped on every reconnect
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Shared flag through which streams abandon their session
    pub(crate) fn abandoned_marker(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.abandoned)
    }

    /// Return a healthy session, reconnecting if needed
    ///
    /// Dial and login errors are returned verbatim and leave no session
    /// behind.
    pub(crate) fn ensure_connected(&mut self) -> Result<&mut (dyn Session + 'static)> {
        self.discard_abandoned();

        if let Some(mut current) = self.session.take() {
            match current.noop() {
                Ok(()) => self.session = Some(current),
                Err(e) => {
                    warn!(host = %self.config.hostname, "Session probe failed, reconnecting: {}", e);
                    // Best effort, the session is already unusable
                    let _ = current.quit();
                }
            }
        }

        if self.session.is_none() {
            let session = self.dial()?;
            self.session = Some(session);
            self.generation += 1;
        }

        self.session
            .as_deref_mut()
            .ok_or_else(|| Error::connection("no session available"))
    }

    /// Session for `generation`, if it is still the live one
    pub(crate) fn session_for(&mut self, generation: u64) -> Option<&mut (dyn Session + 'static)> {
        if generation != self.generation {
            return None;
        }
        self.session.as_deref_mut()
    }

    /// Terminate the session
    ///
    /// A client that holds no session (never connected, or already closed)
    /// closes successfully without contacting the server.
    pub(crate) fn close(&mut self) -> Result<()> {
        self.discard_abandoned();
        if !self.has_session() {
            return Ok(());
        }

        let result = self.ensure_connected()?.quit();
        self.session = None;
        info!(host = %self.config.hostname, "Disconnected from FTP server");
        result
    }

    fn discard_abandoned(&mut self) {
        let abandoned = self.abandoned.swap(0, Ordering::AcqRel);
        if abandoned != 0 && abandoned == self.generation && self.session.take().is_some() {
            // Its control channel still owes the transfer's final reply
            debug!(host = %self.config.hostname, "Discarding session with an abandoned transfer");
        }
    }

    fn dial(&self) -> Result<Box<dyn Session>> {
        let options = DialOptions {
            host: self.config.hostname.clone(),
            timeout: self.config.timeout(),
            disable_epsv: self.config.disable_epsv,
            tls: tls::dial_tls(&self.config)?,
            tls_mode: self.config.tls_mode,
        };

        debug!("Dialing {:?}", options);
        let mut session = self.connector.dial(&options)?;
        session.login(&self.config.username, &self.config.password)?;

        info!(
            host = %self.config.hostname,
            user = %self.config.username,
            tls = options.tls.is_some(),
            "Connected to FTP server"
        );
        Ok(session)
    }
}
