//! Ready-made specs for the Infinispan server image, plus a fluent factory
//! over [`ContainerSpecBuilder`].
//!
//! ```rust,no_run
//! use cache_container::presets;
//!
//! # fn main() -> cache_container::FixtureResult<()> {
//! let spec = presets::factory("9.1.3.Final")
//!     .configuration_file("infinispan-standalone.xml")?
//!     .expose()
//!     .hotrod()
//!     .build()?;
//! # Ok(()) }
//! ```

use std::time::Duration;

use crate::errors::FixtureResult;
use crate::protocol::ProtocolVersion;
use crate::resources::ResourceLocator;
use crate::spec::{
    ContainerSpec, ContainerSpecBuilder, MountMode, ReadinessCondition, CACHE_PROTOCOL_ENDPOINT,
    DEFAULT_CACHE_PROTOCOL_PORT,
};
use crate::transport::TransportStrategy;

/// Server image name.
pub const IMAGE_NAME: &str = "jboss/infinispan-server";

/// Version used by [`default_standalone`] and [`default_factory`].
pub const DEFAULT_VERSION: &str = "9.1.3.Final";

/// Name of the REST endpoint.
pub const REST_ENDPOINT: &str = "rest";

/// Default container port of the REST endpoint.
pub const DEFAULT_REST_PORT: u16 = 8080;

/// Log line printed once the server accepts requests.
pub const STARTED_LOG_PATTERN: &str = r".*Infinispan Server.*started in.*\s";

/// Container path of the standalone server configuration.
pub const STANDALONE_CONFIGURATION_PATH: &str =
    "/opt/jboss/infinispan-server/standalone/configuration/standalone.xml";

/// Container path of the clustered server configuration.
pub const CLUSTERED_CONFIGURATION_PATH: &str =
    "/opt/jboss/infinispan-server/standalone/configuration/clustered.xml";

const STARTUP_TIMEOUT: Duration = Duration::from_secs(20);

/// Waits for the server's "started in" log line to appear once. A single
/// match is enough; a standalone server prints it once per boot.
pub fn started_log_condition() -> ReadinessCondition {
    ReadinessCondition::log_message(STARTED_LOG_PATTERN, 1, STARTUP_TIMEOUT)
}

fn image_builder(version: &str) -> ContainerSpecBuilder {
    ContainerSpecBuilder::new(&format!("{IMAGE_NAME}:{version}"))
        .with_readiness_condition(started_log_condition())
}

/// Standalone server exposing the Hot Rod endpoint.
pub fn standalone(version: &str) -> ContainerSpecBuilder {
    image_builder(version).with_exposed_endpoint(CACHE_PROTOCOL_ENDPOINT, DEFAULT_CACHE_PROTOCOL_PORT)
}

/// [`standalone`] with [`DEFAULT_VERSION`].
pub fn default_standalone() -> ContainerSpecBuilder {
    standalone(DEFAULT_VERSION)
}

/// Clustered server. Topology updates are suppressed because the member
/// addresses it announces are only reachable inside the container network.
pub fn clustered(version: &str) -> ContainerSpecBuilder {
    standalone(version).with_transport_strategy(TransportStrategy::SuppressTopologyUpdates)
}

impl ContainerSpecBuilder {
    /// Mounts a standalone server configuration resolved through `locator`.
    pub fn with_standalone_configuration(
        self,
        locator: &ResourceLocator,
        resource: &str,
    ) -> FixtureResult<ContainerSpecBuilder> {
        self.with_resource_mount(
            locator,
            resource,
            STANDALONE_CONFIGURATION_PATH,
            MountMode::ReadOnly,
        )
    }

    /// Mounts a clustered server configuration resolved through `locator`.
    pub fn with_clustered_configuration(
        self,
        locator: &ResourceLocator,
        resource: &str,
    ) -> FixtureResult<ContainerSpecBuilder> {
        self.with_resource_mount(
            locator,
            resource,
            CLUSTERED_CONFIGURATION_PATH,
            MountMode::ReadOnly,
        )
    }
}

/// Starts a fluent [`SpecFactory`] for a standalone server of `version`.
/// Nothing is exposed until [`SpecFactory::expose`] is used. Configuration
/// files are looked up through [`ResourceLocator::default`].
pub fn factory(version: &str) -> SpecFactory {
    SpecFactory {
        builder: image_builder(version),
        locator: ResourceLocator::default(),
    }
}

/// [`factory`] with [`DEFAULT_VERSION`].
pub fn default_factory() -> SpecFactory {
    factory(DEFAULT_VERSION)
}

/// Fluent wrapper around [`ContainerSpecBuilder`].
#[derive(Clone, Debug)]
pub struct SpecFactory {
    builder: ContainerSpecBuilder,
    locator: ResourceLocator,
}

impl SpecFactory {
    /// Resolves configuration resources through `locator`.
    pub fn with_locator(mut self, locator: ResourceLocator) -> SpecFactory {
        self.locator = locator;
        self
    }

    /// Mounts the named standalone configuration file.
    pub fn configuration_file(mut self, resource: &str) -> FixtureResult<SpecFactory> {
        self.builder = self
            .builder
            .with_standalone_configuration(&self.locator, resource)?;
        Ok(self)
    }

    /// Sets the protocol version.
    pub fn protocol_version(mut self, version: ProtocolVersion) -> SpecFactory {
        self.builder = self.builder.with_protocol_version(version);
        self
    }

    /// Requests caches, see [`ContainerSpecBuilder::with_caches`].
    pub fn caches<I, S>(mut self, names: I) -> FixtureResult<SpecFactory>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.builder = self.builder.with_caches(names)?;
        Ok(self)
    }

    /// Continues with port selection.
    pub fn expose(self) -> ExposedPorts {
        ExposedPorts { factory: self }
    }

    /// Same as [`expose`](Self::expose), reads better after a port.
    pub fn and(self) -> ExposedPorts {
        self.expose()
    }

    /// The underlying builder, for settings the factory does not cover.
    pub fn into_builder(self) -> ContainerSpecBuilder {
        self.builder
    }

    /// Freezes the spec.
    pub fn build(self) -> FixtureResult<ContainerSpec> {
        self.builder.build()
    }
}

/// Port selection step of [`SpecFactory`].
#[derive(Clone, Debug)]
pub struct ExposedPorts {
    factory: SpecFactory,
}

impl ExposedPorts {
    fn expose(mut self, name: &str, port: u16) -> SpecFactory {
        self.factory.builder = self.factory.builder.with_exposed_endpoint(name, port);
        self.factory
    }

    /// Exposes Hot Rod on its default port.
    pub fn hotrod(self) -> SpecFactory {
        self.hotrod_on(DEFAULT_CACHE_PROTOCOL_PORT)
    }

    /// Exposes Hot Rod on `port`.
    pub fn hotrod_on(self, port: u16) -> SpecFactory {
        self.expose(CACHE_PROTOCOL_ENDPOINT, port)
    }

    /// Exposes REST on its default port.
    pub fn rest(self) -> SpecFactory {
        self.rest_on(DEFAULT_REST_PORT)
    }

    /// Exposes REST on `port`.
    pub fn rest_on(self, port: u16) -> SpecFactory {
        self.expose(REST_ENDPOINT, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::spec::{Endpoint, STARTUP_MODE_TOKEN};
    use std::fs;

    #[test]
    fn standalone_defaults() {
        let spec = default_standalone().build().unwrap();
        assert_eq!(spec.image(), IMAGE_NAME);
        assert_eq!(spec.version(), DEFAULT_VERSION);
        assert_eq!(spec.command(), &[STARTUP_MODE_TOKEN.to_string()]);
        assert_eq!(spec.cache_endpoint().port, 11222);
        assert_eq!(spec.transport_strategy(), TransportStrategy::Default);
        assert_eq!(spec.readiness(), &started_log_condition());
    }

    #[test]
    fn started_line_is_awaited_once() {
        match started_log_condition() {
            ReadinessCondition::LogMessage {
                pattern,
                times,
                timeout,
            } => {
                assert_eq!(pattern, STARTED_LOG_PATTERN);
                assert_eq!(times, 1);
                assert_eq!(timeout, Duration::from_secs(20));
            }
            other => panic!("unexpected readiness {other:?}"),
        }
    }

    #[test]
    fn clustered_suppresses_topology() {
        let spec = clustered("9.1.4.Final").build().unwrap();
        assert_eq!(
            spec.transport_strategy(),
            TransportStrategy::SuppressTopologyUpdates
        );
    }

    #[test]
    fn factory_requires_exposed_hotrod() {
        let err = default_factory().build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingEndpoint);

        let spec = default_factory().expose().rest().and().hotrod().build().unwrap();
        assert_eq!(
            spec.endpoints(),
            &[
                Endpoint { name: REST_ENDPOINT.into(), port: 8080 },
                Endpoint { name: CACHE_PROTOCOL_ENDPOINT.into(), port: 11222 },
            ]
        );
    }

    #[test]
    fn factory_mounts_configuration_file() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("infinispan-standalone.xml"), "<server/>").unwrap();

        let spec = factory("9.1.3.Final")
            .with_locator(ResourceLocator::new([root.path()]))
            .configuration_file("infinispan-standalone.xml")
            .unwrap()
            .expose()
            .hotrod()
            .build()
            .unwrap();
        assert_eq!(spec.mounts().len(), 1);
        assert_eq!(spec.mounts()[0].destination, STANDALONE_CONFIGURATION_PATH);
        assert_eq!(spec.mounts()[0].mode, MountMode::ReadOnly);

        let err = factory("9.1.3.Final")
            .with_locator(ResourceLocator::new([root.path()]))
            .configuration_file("missing.xml")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
    }

    #[test]
    fn nine_zero_server_needs_configuration_file() {
        let err = standalone("9.0.3.Final")
            .with_protocol_version(ProtocolVersion::V2_6)
            .with_caches(["testCache"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServerTooOld);

        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("infinispan-90x-standalone.xml"), "<server/>").unwrap();
        let spec = standalone("9.0.3.Final")
            .with_standalone_configuration(
                &ResourceLocator::new([root.path()]),
                "infinispan-90x-standalone.xml",
            )
            .unwrap()
            .with_protocol_version(ProtocolVersion::V2_6)
            .build()
            .unwrap();
        assert!(spec.caches().is_empty());
    }
}
