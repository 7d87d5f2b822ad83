//! vxfld: control/data-plane substrate for VXLAN flood-and-learn daemons
//!
//! VXLAN tunnel endpoints (VTEPs) need each other's addresses to replicate
//! flooded traffic when the underlay offers no IP multicast. The vxfld
//! daemons solve that with two small protocols, and this crate is the
//! substrate they are built on:
//!
//! - **Refresh wire codec** ([`pkt`]): a compact binary message carrying a
//!   VNI → VTEP-list mapping between cooperating service nodes. Pure and
//!   stateless.
//! - **Management channel** ([`mgmt`]): a length-framed request/response
//!   protocol over a local Unix domain socket. The server multiplexes many
//!   administrative clients on one task and dispatches to a handler the
//!   host daemon supplies.
//!
//! Neither component depends on the other. The [`config`] and [`daemon`]
//! modules carry the surrounding daemon plumbing: a typed key/value
//! configuration schema, pidfile locking, and logging setup.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use vxfld::mgmt::{MgmtServer, NullHandler};
//! use vxfld::pkt::Refresh;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Encode a membership refresh for VNI 100
//! let mut msg = Refresh::refresh(90);
//! msg.add_vteps(100, ["10.0.0.1".parse()?, "10.0.0.2".parse()?]);
//! let wire = msg.encode();
//!
//! // Serve administrative requests on the daemon's socket
//! let server = MgmtServer::bind("/var/run/vxfld.sock", Arc::new(NullHandler))?;
//! let handle = server.start();
//! # let _ = (wire, handle);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration schema and loading
//! - [`daemon`]: Pidfile, logging, shutdown signal
//! - [`error`]: Error types
//! - [`mgmt`]: Management server and client
//! - [`pkt`]: Refresh message wire codec

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod daemon;
pub mod error;
pub mod mgmt;
pub mod pkt;

// Re-export commonly used types at the crate root
pub use config::{load_config, Config, LogDest};
pub use daemon::PidFile;
pub use error::{ConfigError, DaemonError, MgmtError, PktError, VxfldError};
pub use mgmt::{MgmtClient, MgmtHandler, MgmtResponse, MgmtServer, RemoteError};
pub use pkt::{MsgType, Refresh};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
