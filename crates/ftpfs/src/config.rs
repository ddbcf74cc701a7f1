//! Configuration for the FTP client

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// FTP client configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server address as `host:port`
    pub hostname: String,

    /// Login user
    #[serde(default)]
    pub username: String,

    /// Login password
    #[serde(default)]
    pub password: String,

    /// Dial timeout, in (fractional) seconds in TOML; zero disables it
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,

    /// Use PASV instead of EPSV for data connections
    #[serde(default)]
    pub disable_epsv: bool,

    /// PEM file with an additional CA certificate; enables FTPS
    #[serde(default)]
    pub ca_file: Option<PathBuf>,

    /// Create missing parent directories when uploading
    #[serde(default)]
    pub create_upload_directories: bool,

    /// How TLS is negotiated once a CA file enables it
    #[serde(default)]
    pub tls_mode: TlsMode,

    /// Base TLS configuration; only used together with `ca_file`, whose
    /// roots replace the ones it carries
    #[serde(skip)]
    pub tls_config: Option<Arc<rustls::ClientConfig>>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
///
/// NIST 800-53: AU-2 (Audit Events), AU-12 (Audit Generation)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (text or json)
    pub format: LogFormat,
    /// Optional log file path (logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

/// FTPS flavour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// TLS from the first byte of the control connection (usually port 990)
    #[default]
    Implicit,
    /// Plain connection upgraded with `AUTH TLS` before login
    Explicit,
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain text logging for human readability
    Text,
    /// JSON structured logging for log aggregators
    Json,
}

impl ClientConfig {
    /// Create a configuration with default options
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            password: password.into(),
            timeout: default_timeout(),
            disable_epsv: false,
            ca_file: None,
            create_upload_directories: false,
            tls_mode: TlsMode::default(),
            tls_config: None,
            logging: LoggingConfig::default(),
        }
    }

    /// Set the dial timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disable EPSV
    #[must_use]
    pub fn with_disable_epsv(mut self, disable: bool) -> Self {
        self.disable_epsv = disable;
        self
    }

    /// Trust an additional CA certificate and connect over TLS
    #[must_use]
    pub fn with_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }

    /// Choose implicit or explicit FTPS
    #[must_use]
    pub fn with_tls_mode(mut self, mode: TlsMode) -> Self {
        self.tls_mode = mode;
        self
    }

    /// Base TLS configuration, combined with the CA file's roots
    #[must_use]
    pub fn with_tls_config(mut self, config: Arc<rustls::ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Create missing directories on upload
    #[must_use]
    pub fn with_create_upload_directories(mut self, create: bool) -> Self {
        self.create_upload_directories = create;
        self
    }

    /// Dial timeout as a duration
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] describing the first problem found.
    pub fn validate(&self) -> crate::Result<()> {
        if self.hostname.trim().is_empty() {
            return Err(crate::Error::Config("hostname must not be empty".to_string()));
        }

        if let Some(ca_file) = &self.ca_file {
            if !ca_file.is_file() {
                return Err(crate::Error::Config(format!(
                    "CA file does not exist: {:?}",
                    ca_file
                )));
            }
        }

        Ok(())
    }
}

// The password never reaches logs or panic messages
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("disable_epsv", &self.disable_epsv)
            .field("ca_file", &self.ca_file)
            .field("create_upload_directories", &self.create_upload_directories)
            .field("tls_mode", &self.tls_mode)
            .field("tls_config", &self.tls_config.is_some())
            .field("logging", &self.logging)
            .finish()
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Durations as seconds, accepting integers and fractions (`timeout = 2.5`)
mod duration_secs {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        if value.subsec_nanos() == 0 {
            serializer.serialize_u64(value.as_secs())
        } else {
            serializer.serialize_f64(value.as_secs_f64())
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| de::Error::custom(format!("invalid timeout {secs}: {e}")))
    }
}
