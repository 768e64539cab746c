//! Client-side handling of server-pushed topology updates.
//!
//! A clustered server tells its clients about every member's address. Inside
//! a container those addresses are container-internal and unreachable from
//! the test host, so a fixture exposing a single port wants the client to
//! stay pinned to the mapped address instead.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use log::{debug, info};

/// What to do with a topology update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopologyDecision {
    /// Replace the routing list with the pushed addresses.
    Accept,
    /// Keep routing to the current addresses.
    Discard,
}

/// The single hook a remote cache client consults when the server pushes a
/// new member list.
pub trait TopologyPolicy {
    /// Called with the addresses announced by the server.
    fn on_topology_update(&self, new_addresses: &[String]) -> TopologyDecision;
}

/// Policy injected into the remote cache client at connect time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransportStrategy {
    /// Accept pushed member lists and route subsequent requests with them.
    #[default]
    Default,
    /// Drop pushed member lists and keep routing to the initial addresses.
    SuppressTopologyUpdates,
}

impl TopologyPolicy for TransportStrategy {
    fn on_topology_update(&self, new_addresses: &[String]) -> TopologyDecision {
        match self {
            TransportStrategy::Default => TopologyDecision::Accept,
            TransportStrategy::SuppressTopologyUpdates => {
                info!("Receiving new servers: {new_addresses:?}. Ignoring...");
                TopologyDecision::Discard
            }
        }
    }
}

/// Addresses a client routes requests to, updated through a [`TopologyPolicy`].
#[derive(Clone, Debug)]
pub struct ServerList<P = TransportStrategy> {
    policy: P,
    servers: Vec<String>,
}

impl<P: TopologyPolicy> ServerList<P> {
    /// Creates a list routing to `initial` until the policy accepts an update.
    pub fn new(initial: Vec<String>, policy: P) -> Self {
        ServerList {
            policy,
            servers: initial,
        }
    }

    /// The addresses currently used for routing.
    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// The policy this list was created with.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Offers a pushed member list to the policy. Returns whether the routing
    /// list changed.
    pub fn apply_topology_update(&mut self, new_addresses: Vec<String>) -> bool {
        match self.policy.on_topology_update(&new_addresses) {
            TopologyDecision::Accept if !new_addresses.is_empty() => {
                debug!("Routing to updated servers: {new_addresses:?}");
                self.servers = new_addresses;
                true
            }
            TopologyDecision::Accept | TopologyDecision::Discard => false,
        }
    }

    /// Picks the server a request for `key` is routed to.
    pub fn route(&self, key: &[u8]) -> Option<&str> {
        if self.servers.is_empty() {
            return None;
        }
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() % self.servers.len() as u64) as usize;
        Some(self.servers[index].as_str())
    }
}
