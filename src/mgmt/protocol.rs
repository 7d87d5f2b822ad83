//! Management protocol definitions
//!
//! Requests and responses are serialized as JSON and framed with a 4-byte
//! big-endian length prefix, in both directions:
//!
//! ```text
//! +----------------+-----------------+
//! | Length (u32 BE)|  JSON payload   |
//! +----------------+-----------------+
//! ```
//!
//! The request type is whatever the host daemon defines; the transport only
//! requires it to serialize. Every response is a `(result, error)` pair:
//! an absent error means the result is authoritative, a present error means
//! the result is to be ignored. The transport does not enforce the
//! exactly-one convention.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Length prefix size in bytes
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Maximum payload size accepted on either side
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024; // 1 MiB

/// Error half of a management response
///
/// Produced by the daemon's handler; carried as payload, not as a transport
/// fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
}

impl RemoteError {
    /// Create a new remote error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for RemoteError {}

/// Error codes for management responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Unknown error
    Unknown,
    /// Request could not be deserialized
    InvalidRequest,
    /// Requested entity does not exist
    NotFound,
    /// Operation failed
    OperationFailed,
    /// Internal daemon error
    InternalError,
}

/// Management response: the `(result, error)` pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MgmtResponse<T> {
    /// Result payload; authoritative when `error` is absent
    pub result: Option<T>,

    /// Error payload; when present, `result` is to be ignored
    pub error: Option<RemoteError>,
}

impl<T> MgmtResponse<T> {
    /// Create a successful response
    #[must_use]
    pub fn ok(result: T) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    #[must_use]
    pub fn err(error: RemoteError) -> Self {
        Self {
            result: None,
            error: Some(error),
        }
    }

    /// Create an empty response (no result, no error)
    #[must_use]
    pub fn none() -> Self {
        Self {
            result: None,
            error: None,
        }
    }

    /// Check if this is an error response
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Collapse the pair into a `Result`
    ///
    /// # Errors
    ///
    /// Returns the `RemoteError` half if present.
    pub fn into_result(self) -> Result<Option<T>, RemoteError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.result),
        }
    }
}

/// Encode a message with its length prefix
///
/// # Errors
///
/// Returns a `serde_json::Error` if serialization fails.
pub fn encode_frame<T: Serialize + ?Sized>(msg: &T) -> Result<Vec<u8>, serde_json::Error> {
    let json = serde_json::to_vec(msg)?;
    #[allow(clippy::cast_possible_truncation)]
    let len = json.len() as u32;

    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + json.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&json);

    Ok(buf)
}

/// Decode a frame payload (length prefix already stripped)
///
/// # Errors
///
/// Returns a `serde_json::Error` if deserialization fails.
pub fn decode_payload<T: DeserializeOwned>(data: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(data)
}
