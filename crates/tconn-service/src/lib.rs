//! tconn-service
//!
//! Read and write paths for topic connections.
//!
//! Reads: fetch raw rows → look up hostnames (bounded, timed out) →
//! reconcile against the cluster's broker snapshot. Every upstream failure
//! degrades to an empty list; callers always get a list back.
//!
//! Writes: each record is upserted on its own; failures are logged and
//! counted, never propagated.

pub mod brokers;
pub mod hostnames;
pub mod service;

pub use brokers::BrokerRegistry;
pub use hostnames::prefetch_hostnames;
pub use service::TopicConnectionService;
