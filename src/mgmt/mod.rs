//! Management channel
//!
//! A length-framed request/response protocol over a local Unix domain
//! socket. An administrative utility uses [`MgmtClient`] to send a request
//! to the daemon; the daemon runs a [`MgmtServer`] on its own task and
//! answers through an injected [`MgmtHandler`]. Every response is a
//! `(result, error)` pair — one of the two is meaningful at a time.
//!
//! See the `server` module tests for typical usage.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::MgmtClient;
pub use protocol::{
    decode_payload, encode_frame, ErrorCode, MgmtResponse, RemoteError, LENGTH_PREFIX_SIZE,
    MAX_MESSAGE_SIZE,
};
pub use server::{MgmtHandler, MgmtServer, MgmtServerHandle, NullHandler, LISTEN_BACKLOG};
