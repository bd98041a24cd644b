//! Hostname lookups done ahead of reconciliation.
//!
//! Reverse lookups block, so each one runs on the blocking pool under a
//! deadline. The results are replayed to the engine through a
//! [`StaticResolver`], which keeps reconciliation itself synchronous.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tconn_config::ResolverSettings;
use tconn_reconcile::{parse_ipv4, HostResolver, ResolveError, StaticResolver};
use tconn_schemas::RawConnectionRecord;
use tracing::debug;

/// Lookups in flight at once.
const LOOKUP_CONCURRENCY: usize = 32;

/// Distinct parseable addresses, most recent first. Stores return rows
/// oldest first, so the walk runs from the back.
fn distinct_addresses(records: &[RawConnectionRecord]) -> Vec<Ipv4Addr> {
    let mut seen = BTreeSet::new();
    records
        .iter()
        .rev()
        .filter_map(|r| parse_ipv4(&r.ip).ok())
        .filter(|addr| seen.insert(*addr))
        .collect()
}

async fn lookup_one(
    resolver: Arc<dyn HostResolver + Send + Sync>,
    addr: Ipv4Addr,
    deadline: Duration,
) -> Result<String, ResolveError> {
    let task = tokio::task::spawn_blocking(move || resolver.resolve(addr));
    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_err)) => Err(ResolveError::Lookup {
            message: join_err.to_string(),
        }),
        // The blocking call keeps running; its answer is dropped.
        Err(_) => Err(ResolveError::TimedOut),
    }
}

/// Look up every distinct address in `records` once.
///
/// Addresses past `max_distinct_addresses`, counted from the most recent row
/// backwards, are recorded as [`ResolveError::Skipped`]; lookups past
/// `timeout_ms` as [`ResolveError::TimedOut`]. Either way the engine falls
/// back to the raw address for them.
pub async fn prefetch_hostnames(
    records: &[RawConnectionRecord],
    resolver: Arc<dyn HostResolver + Send + Sync>,
    settings: &ResolverSettings,
) -> StaticResolver {
    let addresses = distinct_addresses(records);
    let cap = settings.max_distinct_addresses.min(addresses.len());
    let (to_lookup, skipped) = addresses.split_at(cap);
    let deadline = Duration::from_millis(settings.timeout_ms);

    let mut table = StaticResolver::new();
    for addr in skipped {
        table.insert(*addr, Err(ResolveError::Skipped));
    }

    let outcomes: Vec<(Ipv4Addr, Result<String, ResolveError>)> =
        stream::iter(to_lookup.iter().copied())
            .map(|addr| {
                let resolver = Arc::clone(&resolver);
                async move { (addr, lookup_one(resolver, addr, deadline).await) }
            })
            .buffer_unordered(LOOKUP_CONCURRENCY)
            .collect()
            .await;

    for (addr, outcome) in outcomes {
        table.insert(addr, outcome);
    }

    debug!(
        looked_up = to_lookup.len(),
        skipped = skipped.len(),
        "hostname prefetch done"
    );
    table
}
