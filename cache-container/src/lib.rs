//! cache-container runs a containerized cache server for the duration of a
//! test, connects a remote cache client to it and creates the caches the
//! test asks for.
//!
//! The crate is called `cache-container` and you can depend on it via cargo:
//!
//! ```ini
//! [dev-dependencies.cache-container]
//! version = "*"
//! ```
//!
//! # Basic Operation
//!
//! A fixture is described by a [`ContainerSpec`], handed to a
//! [`LifecycleOrchestrator`] and driven through the states of a
//! [`RuntimeHandle`]:
//!
//! ```text
//! Created -> Starting -> Ready -> Provisioned -> Stopped
//! ```
//!
//! The orchestrator is generic over the container engine
//! ([`ContainerRuntime`]) and the remote cache client ([`CacheConnector`]).
//! [`DockerCli`] drives a local Docker daemon; the client side is supplied by
//! the test suite.
//!
//! ```rust,no_run
//! use cache_container::{presets, DockerCli, LifecycleOrchestrator};
//! # use cache_container::{CacheConnector, FixtureResult};
//!
//! # fn run<K: CacheConnector>(connector: K) -> FixtureResult<()> {
//! let spec = presets::standalone("9.1.4.Final")
//!     .with_caches(["testCache"])?
//!     .build()?;
//! let orchestrator = LifecycleOrchestrator::new(DockerCli::default(), connector);
//! let mut handle = orchestrator.launch(spec)?;
//!
//! let client = handle.client()?;
//! /* talk to the server */
//!
//! handle.stop()?;
//! # Ok(()) }
//! ```
//!
//! ## Compatibility
//!
//! Creating caches needs both a recent enough protocol version and a recent
//! enough server. [`compat::evaluate`] decides this and
//! [`ContainerSpecBuilder::with_caches`] refuses incompatible combinations
//! before any container exists.
//!
//! ## Clustered servers
//!
//! Cluster members announce addresses that only resolve inside the container
//! network. [`TransportStrategy::SuppressTopologyUpdates`] tells the client to
//! keep talking to the address it was given.
//!
//! ## Optional Features
//!
//! * `docker`: enables the [`DockerCli`] runtime (enabled by default)
//!
//! ## Environment
//!
//! [`FixtureConfig::from_env`] reads `CACHE_CONTAINER_DOCKER`,
//! `CACHE_CONTAINER_RESOURCES`, `CACHE_CONTAINER_STARTUP_TIMEOUT` and
//! `CACHE_CONTAINER_POLL_INTERVAL_MS`.

#![deny(non_camel_case_types)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod client;
pub mod compat;
pub mod config;
pub mod container;
#[cfg(feature = "docker")]
pub mod docker;
mod errors;
pub mod lifecycle;
pub mod presets;
pub mod protocol;
pub mod provision;
pub mod readiness;
pub mod resources;
pub mod spec;
pub mod transport;

pub use crate::client::{CacheConnector, RemoteCacheClient};
pub use crate::compat::{check_cache_creation, evaluate, CompatibilityResult};
pub use crate::config::FixtureConfig;
pub use crate::container::{BackingContainer, ContainerRequest, ContainerRuntime};
#[cfg(feature = "docker")]
pub use crate::docker::{DockerCli, DockerContainer};
pub use crate::errors::{ErrorKind, FixtureError, FixtureResult};
pub use crate::lifecycle::{
    HandleOf, LifecycleOrchestrator, LifecycleState, RuntimeHandle, StartFailure,
};
pub use crate::protocol::ProtocolVersion;
pub use crate::provision::ProvisionReport;
pub use crate::resources::ResourceLocator;
pub use crate::spec::{
    ContainerSpec, ContainerSpecBuilder, Endpoint, FileMount, MountMode, ReadinessCondition,
};
pub use crate::transport::{ServerList, TopologyDecision, TopologyPolicy, TransportStrategy};
