//! Address → hostname resolution.
//!
//! [`resolve_hostname`] is total: every failure (bad address text, failed or
//! skipped lookup) yields [`Resolution::Fallback`] carrying the raw address as
//! the hostname. Nothing here panics or returns an error to the caller.

use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Address parsing
// ---------------------------------------------------------------------------

/// Why an address string is not four dot-separated decimal octets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddressParseError {
    WrongSegmentCount { found: usize },
    EmptyOctet { index: usize },
    NonNumericOctet { index: usize, raw: String },
    OctetOutOfRange { index: usize, raw: String },
}

impl fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressParseError::WrongSegmentCount { found } => {
                write!(f, "expected 4 octets, found {found}")
            }
            AddressParseError::EmptyOctet { index } => write!(f, "octet {index} is empty"),
            AddressParseError::NonNumericOctet { index, raw } => {
                write!(f, "octet {index} is not decimal: '{raw}'")
            }
            AddressParseError::OctetOutOfRange { index, raw } => {
                write!(f, "octet {index} is outside 0-255: '{raw}'")
            }
        }
    }
}

impl std::error::Error for AddressParseError {}

/// Parse dotted-decimal IPv4 text. Leading zeros are read as decimal.
pub fn parse_ipv4(s: &str) -> Result<Ipv4Addr, AddressParseError> {
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 4 {
        return Err(AddressParseError::WrongSegmentCount { found: parts.len() });
    }

    let mut octets = [0u8; 4];
    for (index, part) in parts.iter().enumerate() {
        if part.is_empty() {
            return Err(AddressParseError::EmptyOctet { index });
        }
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddressParseError::NonNumericOctet {
                index,
                raw: part.to_string(),
            });
        }
        // All digits, so the only failure left is overflow.
        octets[index] = part
            .parse::<u8>()
            .map_err(|_| AddressParseError::OctetOutOfRange {
                index,
                raw: part.to_string(),
            })?;
    }

    Ok(Ipv4Addr::from(octets))
}

// ---------------------------------------------------------------------------
// Resolvers
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// The system resolver returned an error.
    Lookup { message: String },
    /// A table-backed resolver has no entry for the address.
    NoEntry,
    /// The lookup did not finish within the caller's deadline.
    TimedOut,
    /// The caller chose not to look this address up (e.g. over its per-call cap).
    Skipped,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Lookup { message } => write!(f, "reverse lookup failed: {message}"),
            ResolveError::NoEntry => f.write_str("no hostname entry for address"),
            ResolveError::TimedOut => f.write_str("reverse lookup timed out"),
            ResolveError::Skipped => f.write_str("reverse lookup skipped"),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Reverse address lookup. Implementations may block.
pub trait HostResolver {
    fn resolve(&self, addr: Ipv4Addr) -> Result<String, ResolveError>;
}

impl<R: HostResolver + ?Sized> HostResolver for &R {
    fn resolve(&self, addr: Ipv4Addr) -> Result<String, ResolveError> {
        (**self).resolve(addr)
    }
}

impl<R: HostResolver + ?Sized> HostResolver for Arc<R> {
    fn resolve(&self, addr: Ipv4Addr) -> Result<String, ResolveError> {
        (**self).resolve(addr)
    }
}

/// PTR lookup through the platform resolver (`getnameinfo`). Blocking.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn resolve(&self, addr: Ipv4Addr) -> Result<String, ResolveError> {
        dns_lookup::lookup_addr(&IpAddr::V4(addr)).map_err(|e| ResolveError::Lookup {
            message: e.to_string(),
        })
    }
}

/// Fixed table of address → outcome. Also used to replay lookups that were
/// performed ahead of time.
#[derive(Clone, Debug, Default)]
pub struct StaticResolver {
    entries: BTreeMap<Ipv4Addr, Result<String, ResolveError>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, addr: Ipv4Addr, hostname: impl Into<String>) -> Self {
        self.entries.insert(addr, Ok(hostname.into()));
        self
    }

    pub fn insert(&mut self, addr: Ipv4Addr, outcome: Result<String, ResolveError>) {
        self.entries.insert(addr, outcome);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HostResolver for StaticResolver {
    fn resolve(&self, addr: Ipv4Addr) -> Result<String, ResolveError> {
        self.entries
            .get(&addr)
            .cloned()
            .unwrap_or(Err(ResolveError::NoEntry))
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FallbackCause {
    Parse(AddressParseError),
    Resolve(ResolveError),
}

impl fmt::Display for FallbackCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackCause::Parse(e) => write!(f, "invalid address: {e}"),
            FallbackCause::Resolve(e) => e.fmt(f),
        }
    }
}

/// Outcome of [`resolve_hostname`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Suffix-stripped resolved name.
    Resolved(String),
    /// Hostname is the raw address text.
    Fallback { address: String, cause: FallbackCause },
}

impl Resolution {
    pub fn hostname(&self) -> &str {
        match self {
            Resolution::Resolved(name) => name,
            Resolution::Fallback { address, .. } => address,
        }
    }

    pub fn into_hostname(self) -> String {
        match self {
            Resolution::Resolved(name) => name,
            Resolution::Fallback { address, .. } => address,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::Fallback { .. })
    }
}

/// Resolve `address` to a display hostname, stripping `broker_host_suffix`
/// from a successful lookup.
pub fn resolve_hostname<R: HostResolver + ?Sized>(
    address: &str,
    resolver: &R,
    broker_host_suffix: &str,
) -> Resolution {
    let addr = match parse_ipv4(address) {
        Ok(a) => a,
        Err(e) => {
            return Resolution::Fallback {
                address: address.to_string(),
                cause: FallbackCause::Parse(e),
            }
        }
    };

    match resolver.resolve(addr) {
        Ok(name) => Resolution::Resolved(strip_host_suffix(name, broker_host_suffix)),
        Err(e) => Resolution::Fallback {
            address: address.to_string(),
            cause: FallbackCause::Resolve(e),
        },
    }
}

fn strip_host_suffix(name: String, suffix: &str) -> String {
    if suffix.is_empty() || name.len() <= suffix.len() {
        return name;
    }
    match name.strip_suffix(suffix) {
        Some(short) => short.to_string(),
        None => name,
    }
}
