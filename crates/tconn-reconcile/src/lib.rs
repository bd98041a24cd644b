//! tconn-reconcile
//!
//! Topic connection reconciliation.
//!
//! Turns raw per-time-bucket connection rows into the deduplicated,
//! display-ready connection list:
//! - Records merge only within one identity key (cluster, topic, app, direction, ip)
//! - An unknown-version record is a placeholder, superseded by any known version
//! - At most one placeholder survives per key, and only when nothing better exists
//! - Connections from the cluster's own broker machines are excluded
//!
//! Deterministic, pure logic. No logging. The only IO is the reverse lookup
//! behind [`HostResolver`], and its failures degrade to the raw address.

mod engine;
mod normalize;
mod resolve;
mod shard;
mod types;

pub use engine::{reconcile, reconcile_with_report, Admission, KeyState};
pub use normalize::{client_role_for, Normalizer};
pub use resolve::{
    parse_ipv4, resolve_hostname, AddressParseError, FallbackCause, HostResolver, ResolveError,
    Resolution, StaticResolver, SystemResolver,
};
pub use shard::{reconcile_sharded, reconcile_sharded_with_report};
pub use types::*;
