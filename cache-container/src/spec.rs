//! Declarative description of the cache-server container.
//!
//! [`ContainerSpecBuilder`] accumulates settings and validates them;
//! [`ContainerSpecBuilder::build`] freezes them into a [`ContainerSpec`].

use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;

use crate::compat::check_cache_creation;
use crate::errors::{ErrorKind, FixtureError, FixtureResult};
use crate::protocol::ProtocolVersion;
use crate::resources::ResourceLocator;
use crate::transport::TransportStrategy;

/// Command-line argument selecting the server's standalone run mode.
pub const STARTUP_MODE_TOKEN: &str = "standalone";

/// Default name of the endpoint speaking the cache protocol.
pub const CACHE_PROTOCOL_ENDPOINT: &str = "hotrod";

/// Default container port of the cache protocol.
pub const DEFAULT_CACHE_PROTOCOL_PORT: u16 = 11222;

/// Tag used when an image reference carries none.
pub const DEFAULT_IMAGE_VERSION: &str = "latest";

const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(60);

/// A named container port.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Name used to look the endpoint up, e.g. `hotrod`.
    pub name: String,
    /// Port inside the container.
    pub port: u16,
}

/// Access mode of a file mount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MountMode {
    /// The container can only read the file.
    ReadOnly,
    /// The container can modify the file.
    ReadWrite,
}

/// A host file made visible inside the container.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileMount {
    /// Path on the host.
    pub source: PathBuf,
    /// Absolute path inside the container.
    pub destination: String,
    /// Access mode.
    pub mode: MountMode,
}

/// Predicate that must hold before the server counts as usable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadinessCondition {
    /// The container log matches `pattern` at least `times` times.
    LogMessage {
        /// Regular expression searched in the accumulated log output.
        pattern: String,
        /// Required number of matches.
        times: usize,
        /// How long to wait.
        timeout: Duration,
    },
    /// The mapped port of `endpoint` accepts TCP connections.
    PortListening {
        /// Endpoint name.
        endpoint: String,
        /// How long to wait.
        timeout: Duration,
    },
}

impl ReadinessCondition {
    /// Waits for `times` log matches of the regular expression `pattern`.
    pub fn log_message(pattern: impl Into<String>, times: usize, timeout: Duration) -> Self {
        ReadinessCondition::LogMessage {
            pattern: pattern.into(),
            times: times.max(1),
            timeout,
        }
    }

    /// Waits until `endpoint` accepts connections.
    pub fn port_listening(endpoint: impl Into<String>, timeout: Duration) -> Self {
        ReadinessCondition::PortListening {
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// How long the orchestrator waits for this condition.
    pub fn timeout(&self) -> Duration {
        match self {
            ReadinessCondition::LogMessage { timeout, .. }
            | ReadinessCondition::PortListening { timeout, .. } => *timeout,
        }
    }

    /// Returns the same condition with a different timeout.
    pub fn with_timeout(mut self, new_timeout: Duration) -> Self {
        match &mut self {
            ReadinessCondition::LogMessage { timeout, .. }
            | ReadinessCondition::PortListening { timeout, .. } => *timeout = new_timeout,
        }
        self
    }
}

/// Compiles a readiness log pattern.
pub(crate) fn compile_log_pattern(pattern: &str) -> FixtureResult<Regex> {
    Regex::new(pattern).map_err(|err| {
        FixtureError::from((
            ErrorKind::InvalidConfig,
            "Invalid readiness log pattern",
            err.to_string(),
        ))
    })
}

/// Frozen container configuration. Build it with [`ContainerSpecBuilder`].
#[derive(Clone, Debug)]
pub struct ContainerSpec {
    image: String,
    version: String,
    endpoints: Vec<Endpoint>,
    cache_endpoint: Endpoint,
    command: Vec<String>,
    mounts: Vec<FileMount>,
    readiness: ReadinessCondition,
    protocol_version: Option<ProtocolVersion>,
    caches: Vec<String>,
    transport_strategy: TransportStrategy,
}

impl ContainerSpec {
    /// Starts a builder for `image_reference` (`name[:tag]`).
    pub fn builder(image_reference: &str) -> ContainerSpecBuilder {
        ContainerSpecBuilder::new(image_reference)
    }

    /// Image name without the tag.
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Image tag, also used as the server version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// `image:version`.
    pub fn image_reference(&self) -> String {
        format!("{}:{}", self.image, self.version)
    }

    /// Exposed endpoints in declaration order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Looks up an endpoint by name.
    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.name == name)
    }

    /// The endpoint the remote cache client connects to.
    pub fn cache_endpoint(&self) -> &Endpoint {
        &self.cache_endpoint
    }

    /// Container command; contains [`STARTUP_MODE_TOKEN`] exactly once.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// File mounts.
    pub fn mounts(&self) -> &[FileMount] {
        &self.mounts
    }

    /// Readiness condition.
    pub fn readiness(&self) -> &ReadinessCondition {
        &self.readiness
    }

    /// The protocol version the client connects with.
    pub fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version.unwrap_or(ProtocolVersion::CURRENT)
    }

    /// The explicitly requested protocol version, if any.
    pub fn requested_protocol_version(&self) -> Option<ProtocolVersion> {
        self.protocol_version
    }

    /// Caches created after startup, in order.
    pub fn caches(&self) -> &[String] {
        &self.caches
    }

    /// Transport strategy handed to the client.
    pub fn transport_strategy(&self) -> TransportStrategy {
        self.transport_strategy
    }
}

/// Accumulates configuration for a [`ContainerSpec`].
#[derive(Clone, Debug)]
pub struct ContainerSpecBuilder {
    image: String,
    version: String,
    endpoints: Vec<Endpoint>,
    cache_endpoint: String,
    command: Vec<String>,
    mounts: Vec<FileMount>,
    readiness: Option<ReadinessCondition>,
    protocol_version: Option<ProtocolVersion>,
    caches: Vec<String>,
    transport_strategy: TransportStrategy,
}

impl ContainerSpecBuilder {
    /// Creates a builder for `image_reference` (`name[:tag]`); a missing tag
    /// means [`DEFAULT_IMAGE_VERSION`].
    pub fn new(image_reference: &str) -> ContainerSpecBuilder {
        let (image, version) = split_image_reference(image_reference);
        ContainerSpecBuilder {
            image,
            version,
            endpoints: Vec::new(),
            cache_endpoint: CACHE_PROTOCOL_ENDPOINT.to_string(),
            command: vec![STARTUP_MODE_TOKEN.to_string()],
            mounts: Vec::new(),
            readiness: None,
            protocol_version: None,
            caches: Vec::new(),
            transport_strategy: TransportStrategy::Default,
        }
    }

    /// The server version known so far.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Replaces the image tag.
    pub fn with_image_version(mut self, version: impl Into<String>) -> ContainerSpecBuilder {
        self.version = version.into();
        self
    }

    /// Exposes `port` under `name`. Declaring a name again replaces its port.
    pub fn with_exposed_endpoint(mut self, name: impl Into<String>, port: u16) -> ContainerSpecBuilder {
        let name = name.into();
        match self.endpoints.iter_mut().find(|e| e.name == name) {
            Some(endpoint) => endpoint.port = port,
            None => self.endpoints.push(Endpoint { name, port }),
        }
        self
    }

    /// Selects which endpoint speaks the cache protocol (default [`CACHE_PROTOCOL_ENDPOINT`]).
    pub fn with_cache_endpoint_name(mut self, name: impl Into<String>) -> ContainerSpecBuilder {
        self.cache_endpoint = name.into();
        self
    }

    /// Replaces the command. [`STARTUP_MODE_TOKEN`] is appended when missing
    /// and duplicates of it are dropped, so applying the same tokens twice
    /// yields the same list.
    pub fn with_command<I, S>(mut self, tokens: I) -> ContainerSpecBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = ensure_startup_mode(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Like [`with_command`](Self::with_command), splitting `command_line` on whitespace.
    pub fn with_command_line(self, command_line: &str) -> ContainerSpecBuilder {
        self.with_command(command_line.split_whitespace())
    }

    /// Mounts `source` at `destination`. Mounting to the same destination
    /// again replaces the earlier mount.
    pub fn with_file_mount(
        mut self,
        source: impl Into<PathBuf>,
        destination: impl Into<String>,
        mode: MountMode,
    ) -> ContainerSpecBuilder {
        let mount = FileMount {
            source: source.into(),
            destination: destination.into(),
            mode,
        };
        self.mounts.retain(|m| m.destination != mount.destination);
        self.mounts.push(mount);
        self
    }

    /// Resolves the named resource through `locator` and mounts it.
    pub fn with_resource_mount(
        self,
        locator: &ResourceLocator,
        resource: &str,
        destination: impl Into<String>,
        mode: MountMode,
    ) -> FixtureResult<ContainerSpecBuilder> {
        let source = locator.resolve(resource)?;
        Ok(self.with_file_mount(source, destination, mode))
    }

    /// Sets the readiness condition.
    pub fn with_readiness_condition(mut self, condition: ReadinessCondition) -> ContainerSpecBuilder {
        self.readiness = Some(condition);
        self
    }

    /// Sets the protocol version; [`ProtocolVersion::CURRENT`] when unset.
    pub fn with_protocol_version(mut self, version: ProtocolVersion) -> ContainerSpecBuilder {
        self.protocol_version = Some(version);
        self
    }

    /// Requests caches to create after startup, replacing earlier requests.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::ProtocolTooOld`] or [`ErrorKind::ServerTooOld`]
    /// when the protocol and server version known at this point cannot
    /// create caches. An empty list is always accepted.
    pub fn with_caches<I, S>(mut self, names: I) -> FixtureResult<ContainerSpecBuilder>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if !names.is_empty() {
            check_cache_creation(&self.version, self.effective_protocol_version())?;
        }
        self.caches = names;
        Ok(self)
    }

    /// Sets the transport strategy.
    pub fn with_transport_strategy(mut self, strategy: TransportStrategy) -> ContainerSpecBuilder {
        self.transport_strategy = strategy;
        self
    }

    fn effective_protocol_version(&self) -> ProtocolVersion {
        self.protocol_version.unwrap_or(ProtocolVersion::CURRENT)
    }

    /// Freezes the configuration.
    ///
    /// # Errors
    ///
    /// Fails when the cache-protocol endpoint was never exposed, when a mount
    /// destination is not absolute, or when requested caches became
    /// incompatible through a later version change.
    pub fn build(self) -> FixtureResult<ContainerSpec> {
        let cache_endpoint = match self.endpoints.iter().find(|e| e.name == self.cache_endpoint) {
            Some(endpoint) => endpoint.clone(),
            None => fail!((
                ErrorKind::MissingEndpoint,
                "No cache-protocol endpoint was exposed",
                self.cache_endpoint
            )),
        };
        if let Some(mount) = self
            .mounts
            .iter()
            .find(|m| !m.destination.starts_with('/'))
        {
            fail!((
                ErrorKind::InvalidConfig,
                "Mount destination must be an absolute container path",
                mount.destination.clone()
            ));
        }
        match &self.readiness {
            Some(ReadinessCondition::PortListening { endpoint, .. }) => {
                if !self.endpoints.iter().any(|e| &e.name == endpoint) {
                    fail!((
                        ErrorKind::UnknownEndpoint,
                        "Readiness probes an endpoint that is not exposed",
                        endpoint.clone()
                    ));
                }
            }
            Some(ReadinessCondition::LogMessage { pattern, .. }) => {
                compile_log_pattern(pattern)?;
            }
            None => {}
        }
        if !self.caches.is_empty() {
            check_cache_creation(&self.version, self.effective_protocol_version())?;
        }

        let readiness = match self.readiness {
            Some(ReadinessCondition::LogMessage {
                pattern,
                times,
                timeout,
            }) => ReadinessCondition::LogMessage {
                pattern,
                times: times.max(1),
                timeout,
            },
            Some(condition) => condition,
            None => ReadinessCondition::port_listening(
                self.cache_endpoint.clone(),
                DEFAULT_READINESS_TIMEOUT,
            ),
        };

        Ok(ContainerSpec {
            image: self.image,
            version: self.version,
            endpoints: self.endpoints,
            cache_endpoint,
            command: self.command,
            mounts: self.mounts,
            readiness,
            protocol_version: self.protocol_version,
            caches: self.caches,
            transport_strategy: self.transport_strategy,
        })
    }
}

fn split_image_reference(reference: &str) -> (String, String) {
    let name_start = reference.rfind('/').map_or(0, |i| i + 1);
    match reference[name_start..].rfind(':') {
        Some(i) => {
            let split = name_start + i;
            (
                reference[..split].to_string(),
                reference[split + 1..].to_string(),
            )
        }
        None => (reference.to_string(), DEFAULT_IMAGE_VERSION.to_string()),
    }
}

fn ensure_startup_mode(tokens: Vec<String>) -> Vec<String> {
    let mut seen = false;
    let mut command: Vec<String> = tokens
        .into_iter()
        .filter(|token| {
            if token == STARTUP_MODE_TOKEN {
                !std::mem::replace(&mut seen, true)
            } else {
                true
            }
        })
        .collect();
    if !seen {
        command.push(STARTUP_MODE_TOKEN.to_string());
    }
    command
}
