//! FTP Client Binary
//!
//! Run with: cargo run --features suppaftp --bin ftpfs-client

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ftpfs::{Client, ClientConfig, LogFormat, TlsMode, WalkControl};
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML); command-line flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server address as host:port
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Username
    #[arg(short, long)]
    username: Option<String>,

    /// Password
    #[arg(long, env = "FTPFS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Dial timeout in seconds, fractions allowed (0 disables it)
    #[arg(long)]
    timeout: Option<f64>,

    /// Use PASV instead of EPSV
    #[arg(long)]
    disable_epsv: bool,

    /// CA certificate (PEM); enables FTPS
    #[arg(long)]
    ca_file: Option<PathBuf>,

    /// Upgrade a plain connection with AUTH TLS instead of implicit FTPS
    #[arg(long)]
    explicit_tls: bool,

    /// Create missing directories when uploading
    #[arg(long)]
    create_dirs: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the server is reachable
    Ping,
    /// List the files in a directory
    Ls {
        /// Remote directory path
        #[arg(default_value = "/")]
        path: String,
    },
    /// List every file below a directory
    Walk {
        /// Remote directory path
        #[arg(default_value = ".")]
        path: String,
    },
    /// Download a file
    Get {
        /// Remote file path
        remote: String,
        /// Local file path (defaults to the remote base name)
        local: Option<PathBuf>,
    },
    /// Print a file to stdout
    Cat {
        /// Remote file path
        remote: String,
    },
    /// Upload a file
    Put {
        /// Local file path
        local: PathBuf,
        /// Remote file path
        remote: String,
    },
    /// Remove a file
    Rm {
        /// Remote file path
        path: String,
    },
}

fn main() {
    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(2);
        }
    };

    let _log_guard = init_logging(&config, args.verbose);

    if let Err(e) = run(config, args.command) {
        error!("Operation failed: {:#}", e);
        std::process::exit(1);
    }
}

fn build_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            let Some(host) = &args.host else {
                bail!("either --config or --host is required");
            };
            ClientConfig::new(host.as_str(), "anonymous", "anonymous")
        }
    };

    if let Some(host) = &args.host {
        config.hostname.clone_from(host);
    }
    if let Some(username) = &args.username {
        config.username.clone_from(username);
    }
    if let Some(password) = &args.password {
        config.password.clone_from(password);
    }
    if let Some(timeout) = args.timeout {
        config.timeout = Duration::try_from_secs_f64(timeout)
            .with_context(|| format!("invalid timeout {timeout}"))?;
    }
    if let Some(ca_file) = &args.ca_file {
        config.ca_file = Some(ca_file.clone());
    }
    if args.explicit_tls {
        config.tls_mode = TlsMode::Explicit;
    }
    config.disable_epsv |= args.disable_epsv;
    config.create_upload_directories |= args.create_dirs;
    if args.verbose {
        config.logging.level = "debug".to_string();
    }

    config.validate()?;
    Ok(config)
}

/// Log to the configured file, or to stderr so stdout stays clean for output
///
/// NIST 800-53: AU-12 (Audit Generation)
fn init_logging(
    config: &ClientConfig,
    verbose: bool,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = || {
        if verbose {
            EnvFilter::new(&config.logging.level)
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
        }
    };

    let file = config.logging.file.as_ref().and_then(|path| {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty())?;
        let name = path.file_name()?;
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Warning: failed to create log directory: {e}");
            return None;
        }
        Some(tracing_appender::rolling::never(dir, name))
    });

    match file {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            match config.logging.format {
                LogFormat::Json => tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter())
                    .with_writer(writer)
                    .init(),
                LogFormat::Text => tracing_subscriber::fmt()
                    .with_env_filter(filter())
                    .with_writer(writer)
                    .with_ansi(false)
                    .init(),
            }
            Some(guard)
        }
        None => {
            match config.logging.format {
                LogFormat::Json => tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter())
                    .with_writer(io::stderr)
                    .init(),
                LogFormat::Text => tracing_subscriber::fmt()
                    .with_env_filter(filter())
                    .with_writer(io::stderr)
                    .init(),
            }
            None
        }
    }
}

fn run(config: ClientConfig, command: Commands) -> anyhow::Result<()> {
    // A failed first connection is retried by the first operation
    let client = Client::dial(config).unwrap_or_else(|failure| {
        error!("{}", failure.error);
        failure.into_client()
    });

    match command {
        Commands::Ping => {
            client.ping()?;
            println!("ok");
        }
        Commands::Ls { path } => {
            let mut files = client.list_files(&path)?;
            files.sort();
            for file in files {
                println!("{file}");
            }
        }
        Commands::Walk { path } => {
            client.walk(&path, |path, entry, err| match err {
                Some(err) => WalkControl::Abort(err),
                None => {
                    match entry.size() {
                        Some(size) => println!("{path}\t{size}"),
                        None => println!("{path}"),
                    }
                    WalkControl::Continue
                }
            })?;
        }
        Commands::Get { remote, local } => {
            let local = local.unwrap_or_else(|| PathBuf::from(ftpfs::path::base(&remote)));
            let mut file = client.open(&remote)?;
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            std::fs::write(&local, &contents)
                .with_context(|| format!("writing {}", local.display()))?;
            info!("Downloaded {} ({} bytes)", remote, contents.len());
        }
        Commands::Cat { remote } => {
            let mut file = client.reader(&remote)?;
            io::copy(&mut file, &mut io::stdout().lock())?;
            file.close()?;
        }
        Commands::Put { local, remote } => {
            let file = std::fs::File::open(&local)
                .with_context(|| format!("opening {}", local.display()))?;
            client.upload_file(&remote, file)?;
        }
        Commands::Rm { path } => client.delete(&path)?,
    }

    client.close()?;
    Ok(())
}
