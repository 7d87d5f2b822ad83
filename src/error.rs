//! Error types for vxfld
//!
//! This module defines the error hierarchy for the flood-and-learn substrate.
//! Errors are categorized by subsystem: wire codec, management channel,
//! configuration, and daemon lifecycle.

use std::io;

use thiserror::Error;

/// Top-level error type for vxfld
#[derive(Debug, Error)]
pub enum VxfldError {
    /// Refresh packet encode/decode errors
    #[error("Packet error: {0}")]
    Pkt(#[from] PktError),

    /// Management channel errors
    #[error("Management channel error: {0}")]
    Mgmt(#[from] MgmtError),

    /// Configuration errors (file parsing, validation)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Daemon lifecycle errors (pidfile, logging)
    #[error("Daemon error: {0}")]
    Daemon(#[from] DaemonError),

    /// I/O errors not covered by other categories
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VxfldError {
    /// Check if this error is recoverable (can retry operation)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Pkt(_) | Self::Config(_) | Self::Daemon(_) => false,
            Self::Mgmt(e) => e.is_recoverable(),
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::ConnectionReset
            ),
        }
    }
}

/// Refresh packet errors
///
/// A malformed message is always reported to the caller; whether to drop it
/// or tear down the peer is the caller's judgment, not the codec's.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PktError {
    /// Header version byte does not match the supported protocol version
    #[error("Wrong protocol version: expected {expected}, found {found}")]
    VersionMismatch { expected: u8, found: u8 },

    /// A declared element count requires more bytes than the buffer holds
    #[error("Short packet: need {needed} bytes at offset {offset}, {remaining} remain")]
    ShortPacket {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// Message type byte outside the known range
    #[error("Invalid message type: {0:#04x}")]
    InvalidMsgType(u8),
}

impl PktError {
    /// Packet errors are never recoverable: accepting a malformed message
    /// risks corrupting flood state.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        false
    }

    /// Create a short-packet error
    #[must_use]
    pub const fn short(offset: usize, needed: usize, remaining: usize) -> Self {
        Self::ShortPacket {
            offset,
            needed,
            remaining,
        }
    }
}

/// Management channel errors
#[derive(Debug, Error)]
pub enum MgmtError {
    /// Failed to remove a pre-existing filesystem object at the socket path
    #[error("Failed to remove stale socket {path}: {reason}")]
    SocketCleanup { path: String, reason: String },

    /// Failed to create or bind the listening socket
    #[error("Unable to bind to mgmt socket {path}: {reason}")]
    BindError { path: String, reason: String },

    /// Failed to connect to the daemon's socket
    #[error("Unable to connect to daemon on socket {path}: {reason}")]
    ConnectionError { path: String, reason: String },

    /// Malformed frame or payload
    #[error("Mgmt protocol error: {0}")]
    ProtocolError(String),

    /// Declared frame length exceeds the maximum message size
    #[error("Mgmt message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Payload serialization failure
    #[error("Mgmt serialization error: {0}")]
    SerializationError(String),

    /// I/O error
    #[error("Mgmt I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl MgmtError {
    /// Check if this error is recoverable
    ///
    /// Construction-time failures (cleanup, bind) are fatal to the
    /// component; connection-scoped failures affect one client only.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::SocketCleanup { .. } | Self::BindError { .. } => false,
            Self::ConnectionError { .. }
            | Self::ProtocolError(_)
            | Self::MessageTooLarge { .. } => true,
            Self::SerializationError(_) => false,
            Self::IoError(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::BrokenPipe
            ),
        }
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolError(msg.into())
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a bind error
    pub fn bind(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BindError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a connection error
    pub fn connection(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectionError {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found or inaccessible
    #[error("Cannot open config file {path}: {reason}")]
    FileNotFound { path: String, reason: String },

    /// Parameter name not in the schema
    #[error("Unknown variable \"{name}\" in configuration")]
    UnknownParameter { name: String },

    /// Value failed its typed parse/validation
    #[error("Invalid value for {name}: \"{value}\": {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    /// Cross-field validation error
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// I/O error while reading config
    #[error("I/O error reading configuration: {0}")]
    IoError(#[from] io::Error),
}

impl ConfigError {
    /// Config errors are not recoverable without user intervention
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        false
    }

    /// Create an invalid-value error
    pub fn invalid(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Daemon lifecycle errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Cannot open the pidfile
    #[error("Cannot open pid file {path}: {reason}")]
    PidFileOpen { path: String, reason: String },

    /// Another instance holds the pidfile lock
    #[error("Unable to lock pid file {path}: another instance is running?")]
    PidFileLocked { path: String },

    /// Logging initialization failed
    #[error("Unable to set up logging: {0}")]
    LoggingInit(String),

    /// I/O error
    #[error("Daemon I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl DaemonError {
    /// Lifecycle errors are fatal to daemon startup
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        false
    }
}

/// Type alias for Result with `VxfldError`
pub type Result<T> = std::result::Result<T, VxfldError>;
