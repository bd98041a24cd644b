use tconn_schemas::RawConnectionRecord;

use crate::resolve::{resolve_hostname, HostResolver, Resolution};
use crate::{ClientRole, ClientVersion, NormalizedConnection, DEFAULT_BROKER_HOST_SUFFIX};

/// Map a traffic direction code to the client role.
pub fn client_role_for(direction: &str) -> ClientRole {
    match direction {
        "produce" => ClientRole::Producer,
        "fetch" => ClientRole::Consumer,
        _ => ClientRole::Unrecognized,
    }
}

/// Raw record → display entity.
///
/// Holds no state besides its resolver; normalizing the same record twice
/// gives the same result whenever the resolver answers the same way.
#[derive(Clone, Debug)]
pub struct Normalizer<R> {
    resolver: R,
    broker_host_suffix: String,
}

impl<R: HostResolver> Normalizer<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            broker_host_suffix: DEFAULT_BROKER_HOST_SUFFIX.to_string(),
        }
    }

    pub fn with_broker_host_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.broker_host_suffix = suffix.into();
        self
    }

    pub fn broker_host_suffix(&self) -> &str {
        &self.broker_host_suffix
    }

    pub fn normalize(&self, raw: &RawConnectionRecord) -> NormalizedConnection {
        self.normalize_with_resolution(raw).0
    }

    /// Like [`Normalizer::normalize`], also returning how the hostname was obtained.
    pub fn normalize_with_resolution(
        &self,
        raw: &RawConnectionRecord,
    ) -> (NormalizedConnection, Resolution) {
        let resolution = resolve_hostname(&raw.ip, &self.resolver, &self.broker_host_suffix);
        let conn = NormalizedConnection {
            cluster_id: raw.cluster_id,
            topic_name: raw.topic_name.clone(),
            client_role: client_role_for(&raw.client_type),
            app_id: raw.app_id.clone(),
            client_version: ClientVersion::parse(&raw.client_version),
            ip: raw.ip.clone(),
            hostname: resolution.hostname().to_string(),
        };
        (conn, resolution)
    }
}
