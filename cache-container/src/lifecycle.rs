//! Drives a cache-server container from creation to teardown.
//!
//! ```text
//! Created -> Starting -> Ready -> Provisioned -> Stopped
//!               |                                  ^
//!               +--> FailedToStart ----------------+
//! ```
//!
//! Every state can move to `Stopped`; stopping twice is a no-op.

use std::fmt;

use log::{debug, warn};

use crate::client::{CacheConnector, RemoteCacheClient};
use crate::config::FixtureConfig;
use crate::container::{BackingContainer, ContainerRequest, ContainerRuntime};
use crate::errors::{ErrorKind, FixtureError, FixtureResult};
use crate::provision::{provision, ProvisionReport};
use crate::readiness::wait_until_ready;
use crate::spec::ContainerSpec;

/// Lifecycle state of a [`RuntimeHandle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Nothing has been started.
    Created,
    /// The container is being created or is starting up.
    Starting,
    /// The readiness condition holds.
    Ready,
    /// The client is connected and requested caches were processed.
    Provisioned,
    /// Startup failed; resources may still need to be released with `stop`.
    FailedToStart,
    /// Everything was released. Terminal.
    Stopped,
}

/// Owns the backing container and the connected client of one fixture.
///
/// Callers borrow the client through [`RuntimeHandle::client`]. Dropping the
/// handle stops it.
pub struct RuntimeHandle<T: BackingContainer, C: RemoteCacheClient> {
    spec: ContainerSpec,
    state: LifecycleState,
    container: Option<T>,
    client: Option<C>,
    provision_report: ProvisionReport,
}

impl<T: BackingContainer, C: RemoteCacheClient> RuntimeHandle<T, C> {
    fn new(spec: ContainerSpec) -> Self {
        RuntimeHandle {
            spec,
            state: LifecycleState::Created,
            container: None,
            client: None,
            provision_report: ProvisionReport::default(),
        }
    }

    fn transition(&mut self, state: LifecycleState) {
        debug!(
            "{}: {:?} -> {state:?}",
            self.spec.image_reference(),
            self.state
        );
        self.state = state;
    }

    /// The spec this handle was created from.
    pub fn spec(&self) -> &ContainerSpec {
        &self.spec
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The backing container, once created and until stopped.
    pub fn container(&self) -> Option<&T> {
        self.container.as_ref()
    }

    /// Which requested caches were created.
    pub fn provision_report(&self) -> &ProvisionReport {
        &self.provision_report
    }

    /// Borrows the connected client.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NotReady`] unless the handle is [`LifecycleState::Provisioned`].
    pub fn client(&self) -> FixtureResult<&C> {
        match (&self.client, self.state) {
            (Some(client), LifecycleState::Provisioned) => Ok(client),
            (_, state) => Err(FixtureError::from((
                ErrorKind::NotReady,
                "Client is not available",
                format!("handle is {state:?}"),
            ))),
        }
    }

    /// Host port published for the named endpoint.
    pub fn mapped_port(&self, endpoint_name: &str) -> FixtureResult<u16> {
        let endpoint = self.spec.endpoint(endpoint_name).ok_or_else(|| {
            FixtureError::from((
                ErrorKind::UnknownEndpoint,
                "Endpoint was never exposed",
                endpoint_name.to_string(),
            ))
        })?;
        match &self.container {
            Some(container) => container.mapped_port(endpoint.port),
            None => Err(FixtureError::from((
                ErrorKind::NotReady,
                "No running container",
                format!("handle is {:?}", self.state),
            ))),
        }
    }

    /// `host:port` under which the named endpoint is reachable from the test.
    pub fn endpoint_address(&self, endpoint_name: &str) -> FixtureResult<String> {
        let port = self.mapped_port(endpoint_name)?;
        let host = self
            .container
            .as_ref()
            .map(BackingContainer::host_address)
            .unwrap_or_default();
        Ok(format!("{host}:{port}"))
    }

    /// `host:port` of the cache-protocol endpoint.
    pub fn server_address(&self) -> FixtureResult<String> {
        let name = self.spec.cache_endpoint().name.clone();
        self.endpoint_address(&name)
    }

    /// Closes the client, then releases the container.
    ///
    /// Client close errors are logged and swallowed. A container release
    /// error is logged and returned, but the handle is `Stopped` either way.
    /// Calling it again is a no-op.
    pub fn stop(&mut self) -> FixtureResult<()> {
        if self.state == LifecycleState::Stopped {
            return Ok(());
        }
        if let Some(mut client) = self.client.take() {
            if let Err(err) = client.close() {
                warn!(
                    "Failed to close client of {}: {err}",
                    self.spec.image_reference()
                );
            }
        }
        let released = match self.container.take() {
            Some(mut container) => container.stop().map_err(|err| {
                warn!(
                    "Failed to release container {}: {err}",
                    self.spec.image_reference()
                );
                err
            }),
            None => Ok(()),
        };
        self.transition(LifecycleState::Stopped);
        released
    }
}

impl<T: BackingContainer, C: RemoteCacheClient> Drop for RuntimeHandle<T, C> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

impl<T: BackingContainer, C: RemoteCacheClient> fmt::Debug for RuntimeHandle<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("image", &self.spec.image_reference())
            .field("state", &self.state)
            .field("has_container", &self.container.is_some())
            .field("has_client", &self.client.is_some())
            .finish()
    }
}

/// A failed [`LifecycleOrchestrator::start_spec`]. The handle still owns
/// whatever was created and must be stopped (dropping it also stops it).
pub struct StartFailure<T: BackingContainer, C: RemoteCacheClient> {
    /// The handle, in [`LifecycleState::FailedToStart`].
    pub handle: RuntimeHandle<T, C>,
    /// What went wrong.
    pub error: FixtureError,
}

impl<T: BackingContainer, C: RemoteCacheClient> fmt::Debug for StartFailure<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartFailure")
            .field("handle", &self.handle)
            .field("error", &self.error)
            .finish()
    }
}

impl<T: BackingContainer, C: RemoteCacheClient> fmt::Display for StartFailure<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

/// Handle type produced by an orchestrator over `R` and `K`.
pub type HandleOf<R, K> =
    RuntimeHandle<<R as ContainerRuntime>::Container, <K as CacheConnector>::Client>;

/// Starts, provisions and stops cache-server containers.
pub struct LifecycleOrchestrator<R, K> {
    runtime: R,
    connector: K,
    config: FixtureConfig,
}

impl<R: ContainerRuntime, K: CacheConnector> LifecycleOrchestrator<R, K> {
    /// Uses `runtime` for containers and `connector` for clients, with
    /// settings read from the environment.
    pub fn new(runtime: R, connector: K) -> Self {
        LifecycleOrchestrator {
            runtime,
            connector,
            config: FixtureConfig::from_env_or_default(),
        }
    }

    /// Replaces the process-level settings.
    pub fn with_config(mut self, config: FixtureConfig) -> Self {
        self.config = config;
        self
    }

    /// The container runtime.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// The settings in effect.
    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    /// The client connector.
    pub fn connector(&self) -> &K {
        &self.connector
    }

    /// Creates a handle for `spec` without starting anything.
    pub fn create(&self, spec: ContainerSpec) -> HandleOf<R, K> {
        RuntimeHandle::new(spec)
    }

    /// Starts the container, waits for readiness, connects the client and
    /// creates the requested caches.
    ///
    /// On error the handle is left in [`LifecycleState::FailedToStart`] and
    /// must still be stopped.
    pub fn start(&self, handle: &mut HandleOf<R, K>) -> FixtureResult<()> {
        if handle.state != LifecycleState::Created {
            fail!((
                ErrorKind::InvalidConfig,
                "Handle can only be started once",
                format!("handle is {:?}", handle.state)
            ));
        }
        handle.transition(LifecycleState::Starting);
        self.run_startup(handle).map_err(|err| {
            handle.transition(LifecycleState::FailedToStart);
            err
        })
    }

    fn run_startup(&self, handle: &mut HandleOf<R, K>) -> FixtureResult<()> {
        let request = ContainerRequest::from(&handle.spec);
        let container = handle.container.insert(self.runtime.create(&request)?);
        container.start()?;

        let timeout = self
            .config
            .startup_timeout
            .unwrap_or_else(|| handle.spec.readiness().timeout());
        wait_until_ready(&*container, &handle.spec, timeout, self.config.poll_interval)?;
        handle.transition(LifecycleState::Ready);

        let address = handle.server_address()?;
        let client = self.connector.connect(
            &[address],
            handle.spec.protocol_version(),
            handle.spec.transport_strategy(),
        )?;
        let client = handle.client.insert(client);
        handle.provision_report = provision(&*client, handle.spec.caches());
        handle.transition(LifecycleState::Provisioned);
        Ok(())
    }

    /// Creates and starts a handle. On failure the handle is returned inside
    /// the [`StartFailure`] so the caller can stop it.
    pub fn start_spec(
        &self,
        spec: ContainerSpec,
    ) -> Result<HandleOf<R, K>, StartFailure<R::Container, K::Client>> {
        let mut handle = self.create(spec);
        match self.start(&mut handle) {
            Ok(()) => Ok(handle),
            Err(error) => Err(StartFailure { handle, error }),
        }
    }

    /// Creates and starts a handle, stopping it again if startup fails.
    pub fn launch(&self, spec: ContainerSpec) -> FixtureResult<HandleOf<R, K>> {
        match self.start_spec(spec) {
            Ok(handle) => Ok(handle),
            Err(StartFailure { mut handle, error }) => {
                if let Err(stop_err) = handle.stop() {
                    warn!("Cleanup after failed start also failed: {stop_err}");
                }
                Err(error)
            }
        }
    }

    /// See [`RuntimeHandle::stop`].
    pub fn stop(&self, handle: &mut HandleOf<R, K>) -> FixtureResult<()> {
        handle.stop()
    }

    /// See [`RuntimeHandle::client`].
    pub fn get_client<'a>(&self, handle: &'a HandleOf<R, K>) -> FixtureResult<&'a K::Client> {
        handle.client()
    }

    /// See [`RuntimeHandle::endpoint_address`].
    pub fn get_endpoint_address(
        &self,
        handle: &HandleOf<R, K>,
        endpoint_name: &str,
    ) -> FixtureResult<String> {
        handle.endpoint_address(endpoint_name)
    }
}
