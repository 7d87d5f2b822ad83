//! Management server
//!
//! A daemon runs one [`MgmtServer`] on a Unix domain socket and answers
//! administrative requests through an injected [`MgmtHandler`]. The
//! accept/dispatch loop lives on its own task; each accepted connection is
//! served sequentially, so requests on one connection are processed in
//! arrival order. Connection-scoped failures (EOF, read error, send error)
//! close that connection only; the loop itself runs for the life of the
//! process unless explicitly shut down.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use socket2::{Domain, SockAddr, Socket, Type};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::protocol::{
    decode_payload, encode_frame, ErrorCode, MgmtResponse, RemoteError, LENGTH_PREFIX_SIZE,
    MAX_MESSAGE_SIZE,
};
use crate::error::MgmtError;

/// Listen backlog for the management socket
pub const LISTEN_BACKLOG: i32 = 5;

/// Extension point answering administrative requests
///
/// `process` executes on the server's task context. It must not block for
/// unbounded time, and the server provides no synchronization of its own:
/// state shared with the rest of the daemon must be protected by the host.
#[async_trait]
pub trait MgmtHandler: Send + Sync + 'static {
    /// Request type the host daemon defines
    type Request: DeserializeOwned + Send;

    /// Result half of the response pair
    type Reply: Serialize + Send + Sync;

    /// Answer one request with a `(result, error)` pair
    async fn process(&self, request: Self::Request) -> MgmtResponse<Self::Reply>;
}

/// Handler that acknowledges every request with an empty response
///
/// Stands in where a daemon has not wired a real handler yet; also useful
/// in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHandler;

#[async_trait]
impl MgmtHandler for NullHandler {
    type Request = serde_json::Value;
    type Reply = serde_json::Value;

    async fn process(&self, request: serde_json::Value) -> MgmtResponse<serde_json::Value> {
        debug!("Unhandled mgmt request: {request}");
        MgmtResponse::none()
    }
}

/// Management server bound to a Unix domain socket
#[derive(Debug)]
pub struct MgmtServer<H: MgmtHandler> {
    /// Socket path, removed again when the run loop exits
    path: PathBuf,

    /// Bound, listening socket; converted to a tokio listener in `run`
    listener: std::os::unix::net::UnixListener,

    /// Request handler
    handler: Arc<H>,

    /// Shutdown signal sender
    shutdown_tx: broadcast::Sender<()>,
}

impl<H: MgmtHandler> MgmtServer<H> {
    /// Bind a management server to `path`
    ///
    /// A pre-existing filesystem object at `path` is removed first; a
    /// missing one is not an error. The socket listens with a backlog of
    /// [`LISTEN_BACKLOG`].
    ///
    /// # Errors
    ///
    /// Returns `MgmtError::SocketCleanup` if a stale object cannot be
    /// removed, or `MgmtError::BindError` (with path and OS error text) if
    /// socket creation, bind, or listen fails.
    pub fn bind(path: impl AsRef<Path>, handler: Arc<H>) -> Result<Self, MgmtError> {
        let path = path.as_ref().to_path_buf();

        match fs::remove_file(&path) {
            Ok(()) => debug!("Removed stale socket {:?}", path),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(MgmtError::SocketCleanup {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        }

        let bind_err = |e: std::io::Error| MgmtError::bind(path.display().to_string(), e.to_string());

        // tokio's UnixListener::bind does not expose the backlog, so the
        // socket is built by hand and handed over non-blocking.
        let socket = Socket::new(Domain::UNIX, Type::STREAM, None).map_err(bind_err)?;
        let addr = SockAddr::unix(&path).map_err(bind_err)?;
        socket.bind(&addr).map_err(bind_err)?;
        socket.listen(LISTEN_BACKLOG).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            path,
            listener: socket.into(),
            handler,
            shutdown_tx,
        })
    }

    /// Socket path this server is bound to
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a shutdown signal sender
    #[must_use]
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Initiate shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run the accept/dispatch loop until shut down
    ///
    /// Accept failures are logged and do not stop the loop; per-connection
    /// failures never reach it at all. The socket file is removed when the
    /// loop exits.
    ///
    /// # Errors
    ///
    /// Returns `MgmtError` only if the listener cannot be registered with
    /// the runtime.
    pub async fn run(&self) -> Result<(), MgmtError> {
        let listener = UnixListener::from_std(self.listener.try_clone()?)?;

        info!("Mgmt server listening on {:?}", self.path);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _addr)) => {
                            let handler = Arc::clone(&self.handler);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, handler).await {
                                    debug!("Mgmt connection closed: {e}");
                                }
                            });
                        }
                        Err(e) => {
                            error!("Mgmt accept error: {e}");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Mgmt server shutting down");
                    break;
                }
            }
        }

        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to remove mgmt socket {:?}: {e}", self.path);
            }
        }

        Ok(())
    }

    /// Launch the run loop on its own task
    ///
    /// The caller does not block. The returned handle can trigger shutdown
    /// or await termination; dropping it detaches the server, leaving it to
    /// run for the life of the process.
    pub fn start(self) -> MgmtServerHandle {
        let shutdown_tx = self.shutdown_tx.clone();

        let task = tokio::spawn(async move {
            if let Err(e) = self.run().await {
                error!("Mgmt server error: {e}");
            }
        });

        MgmtServerHandle { shutdown_tx, task }
    }
}

/// Handle to a started management server
pub struct MgmtServerHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl MgmtServerHandle {
    /// Signal the server to stop accepting and exit its loop
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get a shutdown signal sender
    #[must_use]
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Wait for the server task to finish
    pub async fn stopped(self) {
        let _ = self.task.await;
    }
}

/// Serve a single management connection
///
/// One read, one dispatch, one response write, in order, until EOF or a
/// connection-scoped error.
async fn handle_connection<H: MgmtHandler>(
    mut stream: UnixStream,
    handler: Arc<H>,
) -> Result<(), MgmtError> {
    debug!("New mgmt connection");

    loop {
        // Read length prefix
        let mut len_buf = [0u8; LENGTH_PREFIX_SIZE];
        match stream.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!("Mgmt client disconnected");
                return Ok(());
            }
            Err(e) => return Err(MgmtError::from(e)),
        }

        let msg_len = u32::from_be_bytes(len_buf) as usize;

        if msg_len > MAX_MESSAGE_SIZE {
            // The stream cannot be resynchronized past a frame we refuse
            // to read; tell the client why, then close.
            warn!("Mgmt request too large: {msg_len} bytes (max {MAX_MESSAGE_SIZE})");
            let response = MgmtResponse::<H::Reply>::err(RemoteError::new(
                ErrorCode::InvalidRequest,
                format!("Request too large: {msg_len} bytes"),
            ));
            send_response(&mut stream, &response).await?;
            return Err(MgmtError::MessageTooLarge {
                size: msg_len,
                max: MAX_MESSAGE_SIZE,
            });
        }

        // Read request payload; EOF mid-payload is a connection error
        let mut msg_buf = vec![0u8; msg_len];
        stream.read_exact(&mut msg_buf).await?;

        // A request that fails to deserialize gets an error response and
        // the connection stays up.
        let response = match decode_payload::<H::Request>(&msg_buf) {
            Ok(request) => handler.process(request).await,
            Err(e) => {
                warn!("Invalid mgmt request: {e}");
                MgmtResponse::err(RemoteError::new(
                    ErrorCode::InvalidRequest,
                    format!("Invalid request format: {e}"),
                ))
            }
        };

        send_response(&mut stream, &response).await?;
    }
}

/// Frame and send one response; any failure closes the connection
async fn send_response<T: Serialize>(
    stream: &mut UnixStream,
    response: &MgmtResponse<T>,
) -> Result<(), MgmtError> {
    let frame = encode_frame(response).map_err(|e| MgmtError::serialization(e.to_string()))?;

    stream.write_all(&frame).await?;
    stream.flush().await?;

    Ok(())
}
