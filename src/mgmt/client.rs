//! Management client
//!
//! Administrative utilities use [`MgmtClient`] to query or mutate a running
//! daemon through its management socket. One request, one framed response;
//! no retries and no timeouts — a hung daemon blocks the caller.

use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use super::protocol::{
    decode_payload, encode_frame, MgmtResponse, LENGTH_PREFIX_SIZE, MAX_MESSAGE_SIZE,
};
use crate::error::MgmtError;

/// Client side of the management channel
#[derive(Debug)]
pub struct MgmtClient {
    stream: UnixStream,
}

impl MgmtClient {
    /// Connect to a daemon's management socket
    ///
    /// # Errors
    ///
    /// Returns `MgmtError::ConnectionError` with the path and OS error text
    /// if the connection fails. There is no built-in retry.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, MgmtError> {
        let path = path.as_ref();

        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| MgmtError::connection(path.display().to_string(), e.to_string()))?;

        Ok(Self { stream })
    }

    /// Send one request and read its `(result, error)` response pair
    ///
    /// # Errors
    ///
    /// Returns `MgmtError::ProtocolError` if the peer closes before or
    /// during the response, `MgmtError::MessageTooLarge` if the declared
    /// response length exceeds [`MAX_MESSAGE_SIZE`], and I/O or
    /// serialization errors otherwise. All failures are fatal to the call.
    pub async fn send<Q, R>(&mut self, request: &Q) -> Result<MgmtResponse<R>, MgmtError>
    where
        Q: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let frame = encode_frame(request).map_err(|e| MgmtError::serialization(e.to_string()))?;
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;

        // Length prefix
        let mut len_buf = [0u8; LENGTH_PREFIX_SIZE];
        self.stream.read_exact(&mut len_buf).await.map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                MgmtError::protocol("Connection closed before response")
            } else {
                MgmtError::from(e)
            }
        })?;

        let msg_len = u32::from_be_bytes(len_buf) as usize;
        if msg_len > MAX_MESSAGE_SIZE {
            return Err(MgmtError::MessageTooLarge {
                size: msg_len,
                max: MAX_MESSAGE_SIZE,
            });
        }

        // Payload; a peer close mid-payload is a protocol error
        let mut msg_buf = vec![0u8; msg_len];
        self.stream.read_exact(&mut msg_buf).await.map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                MgmtError::protocol(format!(
                    "Response truncated: expected {msg_len} payload bytes"
                ))
            } else {
                MgmtError::from(e)
            }
        })?;

        decode_payload(&msg_buf).map_err(|e| MgmtError::protocol(e.to_string()))
    }
}
