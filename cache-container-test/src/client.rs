use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use cache_container::{
    CacheConnector, ErrorKind, FixtureError, FixtureResult, ProtocolVersion, RemoteCacheClient,
    ServerList, TransportStrategy,
};
use log::debug;

/// A connection made through a [`MockConnector`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionRecord {
    /// Addresses handed to `connect`.
    pub addresses: Vec<String>,
    /// Protocol version handed to `connect`.
    pub protocol_version: ProtocolVersion,
    /// Transport strategy handed to `connect`.
    pub transport: TransportStrategy,
    /// Number of `close` calls.
    pub close_calls: usize,
}

#[derive(Default)]
struct ConnectorState {
    fail_connect: bool,
    fail_close: bool,
    rejected_caches: HashSet<String>,
    connections: Vec<Arc<Mutex<ConnectionRecord>>>,
}

/// A [`CacheConnector`] producing in-memory clients.
///
/// Clones share their state.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl MockConnector {
    /// Accepts every connection and cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The server rejects creating `name`.
    pub fn reject_cache(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .rejected_caches
            .insert(name.to_string());
        self
    }

    /// Makes `connect` fail.
    pub fn fail_connect(self) -> Self {
        self.state.lock().unwrap().fail_connect = true;
        self
    }

    /// Makes `close` fail on every client.
    pub fn fail_close(self) -> Self {
        self.state.lock().unwrap().fail_close = true;
        self
    }

    /// Snapshot of every connection made so far.
    pub fn connections(&self) -> Vec<ConnectionRecord> {
        self.state
            .lock()
            .unwrap()
            .connections
            .iter()
            .map(|c| c.lock().unwrap().clone())
            .collect()
    }
}

impl CacheConnector for MockConnector {
    type Client = MockCacheClient;

    fn connect(
        &self,
        addresses: &[String],
        protocol_version: ProtocolVersion,
        transport: TransportStrategy,
    ) -> FixtureResult<MockCacheClient> {
        let mut state = self.state.lock().unwrap();
        if state.fail_connect {
            return Err(FixtureError::from((
                ErrorKind::ClientError,
                "Connection refused",
                format!("{addresses:?}"),
            )));
        }
        debug!("Mock client connecting to {addresses:?} with protocol {protocol_version}");
        let record = Arc::new(Mutex::new(ConnectionRecord {
            addresses: addresses.to_vec(),
            protocol_version,
            transport,
            close_calls: 0,
        }));
        state.connections.push(record.clone());
        Ok(MockCacheClient {
            record,
            fail_close: state.fail_close,
            rejected_caches: state.rejected_caches.clone(),
            servers: Mutex::new(ServerList::new(addresses.to_vec(), transport)),
            caches: Mutex::new(HashMap::new()),
        })
    }
}

/// In-memory remote cache client.
#[derive(Debug)]
pub struct MockCacheClient {
    record: Arc<Mutex<ConnectionRecord>>,
    fail_close: bool,
    rejected_caches: HashSet<String>,
    servers: Mutex<ServerList>,
    caches: Mutex<HashMap<String, MockCache>>,
}

impl MockCacheClient {
    /// Simulates the server pushing a new member list. Returns whether the
    /// client now routes to it.
    pub fn push_topology(&self, addresses: &[&str]) -> bool {
        self.servers
            .lock()
            .unwrap()
            .apply_topology_update(addresses.iter().map(|a| a.to_string()).collect())
    }

    /// Addresses requests are currently routed to.
    pub fn servers(&self) -> Vec<String> {
        self.servers.lock().unwrap().servers().to_vec()
    }

    /// Server a request for `key` goes to.
    pub fn route(&self, key: &str) -> Option<String> {
        self.servers
            .lock()
            .unwrap()
            .route(key.as_bytes())
            .map(str::to_string)
    }

    /// Names of the caches on the server.
    pub fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

impl RemoteCacheClient for MockCacheClient {
    type Cache = MockCache;

    fn create_cache(&self, name: &str) -> FixtureResult<()> {
        if self.rejected_caches.contains(name) {
            return Err(FixtureError::from((
                ErrorKind::ClientError,
                "Server rejected cache creation",
                name.to_string(),
            )));
        }
        self.caches
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_insert_with(|| MockCache {
                name: name.to_string(),
                entries: Arc::default(),
            });
        Ok(())
    }

    fn get_cache(&self, name: &str) -> Option<MockCache> {
        self.caches.lock().unwrap().get(name).cloned()
    }

    fn close(&mut self) -> FixtureResult<()> {
        self.record.lock().unwrap().close_calls += 1;
        if self.fail_close {
            return Err(FixtureError::from((
                ErrorKind::ClientError,
                "Mock client failed to close",
            )));
        }
        Ok(())
    }
}

/// Handle to a cache of a [`MockCacheClient`]. Clones see the same entries.
#[derive(Clone, Debug)]
pub struct MockCache {
    name: String,
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MockCache {
    /// The cache name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stores `value` under `key`, returning the previous value.
    pub fn put(&self, key: &str, value: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string())
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}
