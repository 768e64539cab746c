//! Interface to the remote cache client talking to the server.

use crate::errors::FixtureResult;
use crate::protocol::ProtocolVersion;
use crate::transport::TransportStrategy;

/// Opens remote cache client connections.
pub trait CacheConnector {
    /// The client type produced by this connector.
    type Client: RemoteCacheClient;

    /// Connects to `addresses` (`host:port`) with the given protocol version,
    /// handing `transport` to the client's topology handling.
    fn connect(
        &self,
        addresses: &[String],
        protocol_version: ProtocolVersion,
        transport: TransportStrategy,
    ) -> FixtureResult<Self::Client>;
}

/// A connected remote cache client.
///
/// Implementations are expected to be usable from several threads through a
/// shared reference.
pub trait RemoteCacheClient {
    /// Handle to a single remote cache.
    type Cache;

    /// Creates a cache with the server's default configuration.
    fn create_cache(&self, name: &str) -> FixtureResult<()>;

    /// Returns the named cache, or `None` if the server does not know it.
    fn get_cache(&self, name: &str) -> Option<Self::Cache>;

    /// Releases the connection.
    fn close(&mut self) -> FixtureResult<()>;
}
