//! Daemon lifecycle utilities
//!
//! Pieces shared by both vxfld daemons: single-instance locking through a
//! pidfile, logging initialization, and a cooperative shutdown signal.
//! Daemonization itself (fork, setsid, umask) is the host's business.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, error, info, Level};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogDest};
use crate::error::DaemonError;

/// Exclusive pidfile lock guarding against duplicate daemon instances
///
/// The lock is tied to the open descriptor, which lives inside this guard;
/// dropping the guard releases the lock and removes the file, on every exit
/// path including signal-triggered shutdown (as long as the stack unwinds).
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    file: File,
}

impl PidFile {
    /// Acquire the pidfile at `path` and record our pid in it
    ///
    /// The file is opened in append mode so it is not truncated before the
    /// lock is held; once locked it is truncated and rewritten.
    ///
    /// # Errors
    ///
    /// Returns `DaemonError::PidFileOpen` if the file cannot be opened, or
    /// `DaemonError::PidFileLocked` if another instance holds the lock.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, DaemonError> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| DaemonError::PidFileOpen {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc != 0 {
            return Err(DaemonError::PidFileLocked {
                path: path.display().to_string(),
            });
        }

        debug!("Locked pid file {:?}", path);

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.flush()?;

        Ok(Self { path, file })
    }

    /// Path of the pidfile
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pid recorded in the file
    #[must_use]
    pub fn pid(&self) -> u32 {
        std::process::id()
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
        if let Err(e) = fs::remove_file(&self.path) {
            error!("Unable to remove pid file on exit: {e}");
        }
    }
}

/// Initialize logging per the configured level and destination
///
/// # Errors
///
/// Returns `DaemonError::LoggingInit` if the destination cannot be opened
/// or a global subscriber is already installed.
pub fn init_logging(config: &Config) -> Result<(), DaemonError> {
    let filter = EnvFilter::from_default_env().add_directive(level_for(&config.loglevel).into());

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match &config.logdest {
        LogDest::Stdout => builder.try_init(),
        LogDest::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogDest::File(path) => {
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .map_err(|e| {
                    DaemonError::LoggingInit(format!("cannot open {}: {e}", path.display()))
                })?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
    };

    result.map_err(|e| DaemonError::LoggingInit(e.to_string()))
}

/// Map a configured log level to a tracing level
fn level_for(loglevel: &str) -> Level {
    match loglevel {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Wait for a termination signal (SIGINT, SIGTERM, or SIGHUP)
///
/// Host daemons `select!` this against their main loops and unwind when it
/// resolves, so pidfile and socket guards run their cleanup.
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
    let mut sighup = signal(SignalKind::hangup()).expect("Failed to register SIGHUP handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received SIGINT, terminating"),
        _ = sigterm.recv() => info!("Received SIGTERM, terminating"),
        _ = sighup.recv() => info!("Received SIGHUP, terminating"),
    }
}
