//! Key-sharded reconciliation.
//!
//! Records are grouped by identity key up front (arrival order kept inside
//! each group), then every group is folded by exactly one rayon worker.
//! Output matches [`crate::reconcile`] element for element.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tconn_schemas::RawConnectionRecord;

use crate::engine::Bucket;
use crate::normalize::Normalizer;
use crate::resolve::HostResolver;
use crate::{BrokerAddressSet, IdentityKey, NormalizedConnection, ReconcileReport, ReconcileStats};

pub fn reconcile_sharded<R: HostResolver + Sync>(
    records: &[RawConnectionRecord],
    brokers: &BrokerAddressSet,
    normalizer: &Normalizer<R>,
) -> Vec<NormalizedConnection> {
    reconcile_sharded_with_report(records, brokers, normalizer).connections
}

pub fn reconcile_sharded_with_report<R: HostResolver + Sync>(
    records: &[RawConnectionRecord],
    brokers: &BrokerAddressSet,
    normalizer: &Normalizer<R>,
) -> ReconcileReport {
    if records.is_empty() {
        return ReconcileReport::empty();
    }

    let mut shards: BTreeMap<IdentityKey, Vec<&RawConnectionRecord>> = BTreeMap::new();
    for raw in records {
        shards.entry(IdentityKey::of(raw)).or_default().push(raw);
    }
    let shards: Vec<Vec<&RawConnectionRecord>> = shards.into_values().collect();

    let folded: Vec<(Vec<NormalizedConnection>, ReconcileStats)> = shards
        .into_par_iter()
        .map(|group| {
            let mut bucket = Bucket::new();
            let mut stats = ReconcileStats::default();
            for raw in group {
                bucket.offer(raw, normalizer, brokers, &mut stats);
            }
            (bucket.into_entries(), stats)
        })
        .collect();

    let mut report = ReconcileReport::empty();
    for (entries, stats) in folded {
        report.connections.extend(entries);
        report.stats.merge(stats);
    }
    report
}
