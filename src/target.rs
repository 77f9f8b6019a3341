use std::fmt;

use crate::error::{Error, InvalidTarget, Result};

/// A `host:port` pair the load generator connects to.
///
/// Immutable once parsed; a non-empty set of these is handed to the pool at
/// startup and each connection keeps its own copy for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetAddress {
    host: String,
    port: u16,
}

impl TargetAddress {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse a `host:port` string, e.g. `127.0.0.1:8080` or `web-1:80`.
    ///
    /// IPv6 literals use the usual bracket form, `[::1]:8080`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (host, port) = match s.rfind(':') {
            Some(idx) => (&s[..idx], &s[idx + 1..]),
            None => return Err(Error::from(InvalidTarget::new("missing ':port' suffix"))),
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(Error::from(InvalidTarget::new("empty host")));
        }
        let port = port.parse::<u16>()?;
        Ok(Self::new(host, port))
    }

    pub fn host(&self) -> &str {
        self.host.as_str()
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
