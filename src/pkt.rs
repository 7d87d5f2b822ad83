//! Refresh message wire codec
//!
//! Service-node daemons exchange Refresh messages to synchronize
//! per-VNI VTEP membership lists without IP multicast. The codec is pure
//! and stateless: one buffer in, one message out, no partial state on error.
//!
//! # Wire Protocol
//!
//! ```text
//! +---------+------+------------+----------+
//! | Version | Type | Originator | Holdtime |
//! +---------+------+------------+----------+
//! |   1B    |  1B  |   2B BE    |  2B BE   |
//! +---------+------+------------+----------+
//! ```
//!
//! followed by zero or more VNI blocks:
//!
//! ```text
//! +----------+----------+------------------+
//! |   VNI    |  Count   | Count × Address  |
//! +----------+----------+------------------+
//! |  4B BE   |  2B BE   |  4B each (IPv4)  |
//! +----------+----------+------------------+
//! ```
//!
//! There is no trailing record count: end of buffer terminates the block
//! list, so the payload must be exactly consumed by whole blocks. Integrity
//! is the transport's job (one datagram per message), not the codec's.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use crate::error::PktError;

/// Supported protocol version
pub const PKT_VERSION: u8 = 1;

/// Fixed header length in bytes
pub const HDR_LEN: usize = 6;

/// Per-VNI block overhead: 4-byte VNI + 2-byte count
const BLOCK_HDR_LEN: usize = 6;

/// Length of one encoded VTEP address
const ADDR_LEN: usize = 4;

/// Refresh message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType {
    /// Never legitimately sent
    Unknown = 0,
    /// Periodic membership refresh
    Refresh = 1,
    /// Request that the peer resend its state
    Resend = 2,
}

impl MsgType {
    /// Create a message type from a byte value
    ///
    /// # Errors
    ///
    /// Returns `PktError::InvalidMsgType` if the byte is out of range.
    pub fn from_byte(b: u8) -> Result<Self, PktError> {
        match b {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Refresh),
            2 => Ok(Self::Resend),
            _ => Err(PktError::InvalidMsgType(b)),
        }
    }

    /// Convert message type to byte value
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for MsgType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Refresh => write!(f, "refresh"),
            Self::Resend => write!(f, "resend"),
        }
    }
}

/// Mapping from VNI to its VTEP replication list
///
/// `BTreeMap` keeps encode order deterministic; each list preserves
/// insertion order.
pub type VniVteps = BTreeMap<u32, Vec<Ipv4Addr>>;

/// Refresh message: header plus a VNI → VTEP-list mapping
///
/// Constructed fresh per message sent or received. Immutable once decoded
/// except through [`Refresh::add_vni_vteps`], used when aggregating state
/// from multiple sources before re-encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refresh {
    /// Message type
    pub msg_type: MsgType,

    /// Flag set identifying the sending node (opaque to the codec)
    pub originator: u16,

    /// Seconds the receiver should consider the membership valid
    pub holdtime: u16,

    vni_vteps: VniVteps,
}

impl Refresh {
    /// Create an empty message of the given type
    #[must_use]
    pub fn new(msg_type: MsgType, holdtime: u16) -> Self {
        Self {
            msg_type,
            originator: 0,
            holdtime,
            vni_vteps: VniVteps::new(),
        }
    }

    /// Create an empty refresh message
    #[must_use]
    pub fn refresh(holdtime: u16) -> Self {
        Self::new(MsgType::Refresh, holdtime)
    }

    /// Create a resend request
    #[must_use]
    pub fn resend() -> Self {
        Self::new(MsgType::Resend, 0)
    }

    /// Set the originator flags
    #[must_use]
    pub fn with_originator(mut self, originator: u16) -> Self {
        self.originator = originator;
        self
    }

    /// Borrow the VNI → VTEP mapping
    #[must_use]
    pub const fn vni_vteps(&self) -> &VniVteps {
        &self.vni_vteps
    }

    /// Number of VNIs carried
    #[must_use]
    pub fn vni_count(&self) -> usize {
        self.vni_vteps.len()
    }

    /// Append VTEP addresses to a VNI's list, creating the VNI if absent
    pub fn add_vteps(&mut self, vni: u32, addrs: impl IntoIterator<Item = Ipv4Addr>) {
        self.vni_vteps.entry(vni).or_default().extend(addrs);
    }

    /// Fold a source mapping into this message
    ///
    /// Existing VNIs have their lists extended; new VNIs are inserted. The
    /// source lists are copied, never aliased. Duplicate addresses are
    /// preserved; a consumer that needs set semantics must dedup itself.
    pub fn add_vni_vteps(&mut self, src: &VniVteps) {
        for (vni, addrs) in src {
            self.add_vteps(*vni, addrs.iter().copied());
        }
    }

    /// Fold another message's mapping into this one
    pub fn merge(&mut self, other: &Refresh) {
        self.add_vni_vteps(&other.vni_vteps);
    }

    /// Total encoded length in bytes
    ///
    /// Computable without materializing the buffer; callers use this to
    /// pre-allocate or to validate against a transport datagram limit.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        HDR_LEN
            + self
                .vni_vteps
                .values()
                .map(|addrs| BLOCK_HDR_LEN + ADDR_LEN * addrs.len())
                .sum::<usize>()
    }

    /// Encode the message to its wire representation
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());

        buf.push(PKT_VERSION);
        buf.push(self.msg_type.as_byte());
        buf.extend_from_slice(&self.originator.to_be_bytes());
        buf.extend_from_slice(&self.holdtime.to_be_bytes());

        for (vni, addrs) in &self.vni_vteps {
            buf.extend_from_slice(&vni.to_be_bytes());
            #[allow(clippy::cast_possible_truncation)]
            buf.extend_from_slice(&(addrs.len() as u16).to_be_bytes());
            for addr in addrs {
                buf.extend_from_slice(&addr.octets());
            }
        }

        buf
    }

    /// Decode a message from its wire representation
    ///
    /// The version byte is checked before any payload parsing. The block
    /// list is terminated by end of buffer only; a buffer ending mid-block
    /// is rejected.
    ///
    /// # Errors
    ///
    /// - `PktError::VersionMismatch` if the version byte is not [`PKT_VERSION`]
    /// - `PktError::InvalidMsgType` if the type byte is out of range
    /// - `PktError::ShortPacket` if the header or any VNI block is truncated
    pub fn decode(buf: &[u8]) -> Result<Self, PktError> {
        if buf.len() < HDR_LEN {
            return Err(PktError::short(0, HDR_LEN, buf.len()));
        }

        let version = buf[0];
        if version != PKT_VERSION {
            return Err(PktError::VersionMismatch {
                expected: PKT_VERSION,
                found: version,
            });
        }

        let msg_type = MsgType::from_byte(buf[1])?;
        let originator = u16::from_be_bytes([buf[2], buf[3]]);
        let holdtime = u16::from_be_bytes([buf[4], buf[5]]);

        let mut vni_vteps = VniVteps::new();
        let mut pos = HDR_LEN;

        while pos < buf.len() {
            let remaining = buf.len() - pos;
            if remaining < BLOCK_HDR_LEN {
                return Err(PktError::short(pos, BLOCK_HDR_LEN, remaining));
            }

            let vni = u32::from_be_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]]);
            let cnt = u16::from_be_bytes([buf[pos + 4], buf[pos + 5]]) as usize;
            pos += BLOCK_HDR_LEN;

            let addrs_len = cnt * ADDR_LEN;
            if buf.len() - pos < addrs_len {
                return Err(PktError::short(pos, addrs_len, buf.len() - pos));
            }

            let list = vni_vteps.entry(vni).or_default();
            list.reserve(cnt);
            for _ in 0..cnt {
                list.push(Ipv4Addr::new(
                    buf[pos],
                    buf[pos + 1],
                    buf[pos + 2],
                    buf[pos + 3],
                ));
                pos += ADDR_LEN;
            }
        }

        Ok(Self {
            msg_type,
            originator,
            holdtime,
            vni_vteps,
        })
    }
}
