//! Interface to the container engine running the cache server.

use crate::errors::FixtureResult;
use crate::spec::{ContainerSpec, Endpoint, FileMount};

/// Everything the engine needs to create the container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerRequest {
    /// Image name without tag.
    pub image: String,
    /// Image tag.
    pub version: String,
    /// Ports to publish on the host.
    pub exposed_ports: Vec<u16>,
    /// Command tokens.
    pub command: Vec<String>,
    /// File mounts.
    pub mounts: Vec<FileMount>,
}

impl ContainerRequest {
    /// `image:version`.
    pub fn image_reference(&self) -> String {
        format!("{}:{}", self.image, self.version)
    }
}

impl From<&ContainerSpec> for ContainerRequest {
    fn from(spec: &ContainerSpec) -> Self {
        ContainerRequest {
            image: spec.image().to_string(),
            version: spec.version().to_string(),
            exposed_ports: spec.endpoints().iter().map(|e: &Endpoint| e.port).collect(),
            command: spec.command().to_vec(),
            mounts: spec.mounts().to_vec(),
        }
    }
}

/// Creates backing containers.
pub trait ContainerRuntime {
    /// The container type produced by this runtime.
    type Container: BackingContainer;

    /// Creates, but does not start, a container.
    fn create(&self, request: &ContainerRequest) -> FixtureResult<Self::Container>;
}

/// A single container instance.
pub trait BackingContainer {
    /// Starts the container process.
    fn start(&mut self) -> FixtureResult<()>;

    /// Stops and removes the container. Calling it again must be harmless.
    fn stop(&mut self) -> FixtureResult<()>;

    /// Host port published for `container_port`.
    fn mapped_port(&self, container_port: u16) -> FixtureResult<u16>;

    /// Host name or IP under which published ports are reachable.
    fn host_address(&self) -> String;

    /// Log output accumulated since start.
    fn logs(&self) -> FixtureResult<String>;

    /// Whether the container process is still running.
    fn is_running(&self) -> FixtureResult<bool>;
}
