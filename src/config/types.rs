//! Configuration schema
//!
//! One typed struct covers both daemons; fields a given daemon does not use
//! are simply ignored by it. Parameters are set by name through
//! [`Config::set_param`], which maps each name to its typed parse and
//! validation logic at compile time.

use std::collections::BTreeSet;
use std::fmt;
use std::net::{Ipv4Addr, ToSocketAddrs};
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use crate::error::ConfigError;

/// Configuration protocol version tag
pub const PROTOCOL_VERSION: &str = "0.1";

/// Accepted log levels, in order of severity
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Destination for log records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDest {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
    /// Append to the named file
    File(PathBuf),
}

impl From<&str> for LogDest {
    fn from(s: &str) -> Self {
        match s {
            "stdout" => Self::Stdout,
            "stderr" => Self::Stderr,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

impl FromStr for LogDest {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for LogDest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Daemon configuration
///
/// Defaults match the shipped `/etc/vxfld.conf` values; a config file and
/// the host daemon's command line override them in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Severity threshold for log records
    pub loglevel: String,

    /// Where log records go
    pub logdest: LogDest,

    /// Path of the pidfile guarding against duplicate instances
    pub pidfile: PathBuf,

    /// Path of the management socket
    pub udsfile: PathBuf,

    /// Whether the host monitors this daemon externally
    pub monitor: bool,

    /// UDP port for VXLAN tunnel packets
    pub vxlan_port: u16,

    /// UDP port for vxfld refresh messages
    pub vxfld_port: u16,

    /// Seconds to hold soft state carried in refresh messages
    pub holdtime: u16,

    // Service-node daemon
    /// Local address to bind for flood traffic
    pub address: Option<Ipv4Addr>,

    /// Install `address` on the loopback interface
    pub install_addr: bool,

    /// Peer service nodes to share state with
    pub servers: BTreeSet<Ipv4Addr>,

    /// Seconds between aging passes over stale forwarding entries
    pub age_check: u64,

    // Registration daemon
    /// Local VTEP address, used when none is configured on the VXLAN device
    pub local_addr: Option<Ipv4Addr>,

    /// Service-node address, used when none is configured on the VXLAN device
    pub svcnode: Option<Ipv4Addr>,

    /// How many times to refresh within each holdtime
    pub refresh_rate: u32,

    /// Seconds between checks for device configuration changes
    pub config_check_rate: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loglevel: "info".into(),
            logdest: LogDest::Stdout,
            pidfile: "/var/run/vxfld.pid".into(),
            udsfile: "/var/run/vxfld.sock".into(),
            monitor: false,
            vxlan_port: 4789,
            vxfld_port: 10001,
            holdtime: 90,
            address: None,
            install_addr: false,
            servers: BTreeSet::new(),
            age_check: 90,
            local_addr: None,
            svcnode: None,
            refresh_rate: 3,
            config_check_rate: 30,
        }
    }
}

impl Config {
    /// Set a parameter by name from its string representation
    ///
    /// Each known name dispatches to its typed parse/validation logic;
    /// unknown names are rejected.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownParameter` for a name outside the
    /// schema, or `ConfigError::InvalidValue` if the value fails its parse.
    pub fn set_param(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        match name {
            "loglevel" => {
                let level = value.to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(ConfigError::invalid(
                        name,
                        value,
                        format!("expected one of {LOG_LEVELS:?}"),
                    ));
                }
                self.loglevel = level;
            }
            // Anything that is not a known sink is a file path
            "logdest" => self.logdest = LogDest::from(value),
            "pidfile" => self.pidfile = PathBuf::from(value),
            "udsfile" => self.udsfile = PathBuf::from(value),
            "monitor" => self.monitor = parse_bool(name, value)?,
            "vxlan_port" => self.vxlan_port = parse_int(name, value)?,
            "vxfld_port" => self.vxfld_port = parse_int(name, value)?,
            "holdtime" => self.holdtime = parse_int(name, value)?,
            "address" => self.address = Some(resolve_addr(name, value)?),
            "install_addr" => self.install_addr = parse_bool(name, value)?,
            "servers" => self.servers = resolve_servers(value),
            "age_check" => self.age_check = parse_int(name, value)?,
            "local_addr" => self.local_addr = Some(resolve_addr(name, value)?),
            "svcnode" => self.svcnode = Some(resolve_addr(name, value)?),
            "refresh_rate" => self.refresh_rate = parse_int(name, value)?,
            "config_check_rate" => self.config_check_rate = parse_int(name, value)?,
            _ => {
                return Err(ConfigError::UnknownParameter { name: name.into() });
            }
        }
        Ok(())
    }

    /// Apply a sequence of `(name, value)` overrides, e.g. from a daemon's
    /// command line
    ///
    /// # Errors
    ///
    /// Propagates the first `set_param` failure.
    pub fn apply_overrides<'a>(
        &mut self,
        overrides: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<(), ConfigError> {
        for (name, value) in overrides {
            self.set_param(name, value)?;
        }
        Ok(())
    }

    /// Validate cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vxlan_port == 0 {
            return Err(ConfigError::ValidationError(
                "vxlan_port must be greater than 0".into(),
            ));
        }

        if self.vxfld_port == 0 {
            return Err(ConfigError::ValidationError(
                "vxfld_port must be greater than 0".into(),
            ));
        }

        if self.holdtime == 0 {
            return Err(ConfigError::ValidationError(
                "holdtime must be greater than 0".into(),
            ));
        }

        if self.refresh_rate == 0 {
            return Err(ConfigError::ValidationError(
                "refresh_rate must be greater than 0".into(),
            ));
        }

        // The interval between refreshes is holdtime / refresh_rate; a rate
        // larger than the holdtime rounds that interval down to zero.
        if self.refresh_rate > u32::from(self.holdtime) {
            return Err(ConfigError::ValidationError(format!(
                "refresh_rate {} does not fit inside holdtime {}s",
                self.refresh_rate, self.holdtime
            )));
        }

        if !LOG_LEVELS.contains(&self.loglevel.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level {}",
                self.loglevel
            )));
        }

        Ok(())
    }

    /// Protocol version tag
    #[must_use]
    pub const fn protocol_version(&self) -> &'static str {
        PROTOCOL_VERSION
    }
}

/// Parse an integer-valued parameter
fn parse_int<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::invalid(name, value, "invalid integer value"))
}

/// Parse a boolean-valued parameter (strict: `true` or `false`)
fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::invalid(name, value, "expected true or false")),
    }
}

/// Resolve a hostname or dotted-decimal string to an IPv4 address
fn resolve_addr(name: &str, value: &str) -> Result<Ipv4Addr, ConfigError> {
    // Fast path: already dotted decimal
    if let Ok(addr) = value.parse::<Ipv4Addr>() {
        return Ok(addr);
    }

    (value, 0u16)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| {
            addrs.find_map(|a| match a {
                std::net::SocketAddr::V4(v4) => Some(*v4.ip()),
                std::net::SocketAddr::V6(_) => None,
            })
        })
        .ok_or_else(|| ConfigError::invalid(name, value, "cannot resolve address"))
}

/// Resolve a whitespace-separated server list
///
/// Unresolvable entries are logged and skipped so one bad peer cannot keep
/// a daemon from starting.
fn resolve_servers(value: &str) -> BTreeSet<Ipv4Addr> {
    let mut result = BTreeSet::new();
    for token in value.split_whitespace() {
        match resolve_addr("servers", token) {
            Ok(addr) => {
                result.insert(addr);
            }
            Err(_) => {
                warn!("Cannot resolve address for server {token}");
            }
        }
    }
    result
}
