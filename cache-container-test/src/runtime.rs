use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cache_container::{
    BackingContainer, ContainerRequest, ContainerRuntime, ErrorKind, FixtureError, FixtureResult,
};
use log::debug;

/// Log line printed by the mock server once it is up. Matches
/// [`cache_container::presets::STARTED_LOG_PATTERN`].
pub const STARTED_LOG_LINE: &str = "INFO [org.jboss.as] Infinispan Server 9.1.4.Final started in 4242ms\n";

/// How containers created by a [`MockRuntime`] behave.
#[derive(Clone, Debug)]
pub struct MockBehavior {
    /// Printed before anything else.
    pub boot_log: String,
    /// Appended by every `logs` call after the first `ready_after_polls`.
    pub started_log: String,
    /// Number of `logs` calls that return only `boot_log`.
    pub ready_after_polls: usize,
    /// The process exits after this many `logs` calls.
    pub exit_after_polls: Option<usize>,
    /// Host ports for container ports. Unmapped ports get `port + 20000`.
    pub port_mappings: HashMap<u16, u16>,
    /// Host under which ports are published.
    pub host: String,
    /// Makes `start` fail.
    pub fail_start: bool,
    /// Makes `stop` fail.
    pub fail_stop: bool,
}

impl Default for MockBehavior {
    fn default() -> Self {
        MockBehavior {
            boot_log: "INFO Booting cache server\n".to_string(),
            started_log: STARTED_LOG_LINE.to_string(),
            ready_after_polls: 0,
            exit_after_polls: None,
            port_mappings: HashMap::new(),
            host: "127.0.0.1".to_string(),
            fail_start: false,
            fail_stop: false,
        }
    }
}

/// What happened to one mock container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerStats {
    /// The request the container was created from.
    pub request: ContainerRequest,
    /// Calls to `start`.
    pub start_calls: usize,
    /// Calls to `stop`.
    pub stop_calls: usize,
    /// Calls to `logs`.
    pub log_polls: usize,
    /// Whether the process is up.
    pub running: bool,
    /// Whether the container was removed.
    pub removed: bool,
}

#[derive(Default)]
struct RuntimeState {
    behavior: MockBehavior,
    fail_create: bool,
    containers: Vec<Arc<Mutex<ContainerStats>>>,
}

/// A [`ContainerRuntime`] that never touches a container engine.
///
/// Clones share their state, so a test can keep one to inspect what the
/// orchestrator did with the other.
#[derive(Clone, Default)]
pub struct MockRuntime {
    state: Arc<Mutex<RuntimeState>>,
}

impl MockRuntime {
    /// Containers become ready on the first poll.
    pub fn new() -> Self {
        Self::default()
    }

    /// Containers created from now on behave as `behavior` says.
    pub fn with_behavior(self, behavior: MockBehavior) -> Self {
        self.state.lock().unwrap().behavior = behavior;
        self
    }

    /// Makes `create` fail.
    pub fn fail_create(self) -> Self {
        self.state.lock().unwrap().fail_create = true;
        self
    }

    /// Snapshot of every container created so far, oldest first.
    pub fn containers(&self) -> Vec<ContainerStats> {
        self.state
            .lock()
            .unwrap()
            .containers
            .iter()
            .map(|c| c.lock().unwrap().clone())
            .collect()
    }

    /// Number of `create` calls that produced a container.
    pub fn created(&self) -> usize {
        self.state.lock().unwrap().containers.len()
    }
}

impl ContainerRuntime for MockRuntime {
    type Container = MockContainer;

    fn create(&self, request: &ContainerRequest) -> FixtureResult<MockContainer> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(FixtureError::from((
                ErrorKind::ContainerError,
                "Mock runtime refused to create container",
                request.image_reference(),
            )));
        }
        debug!("Creating mock container for {}", request.image_reference());
        let stats = Arc::new(Mutex::new(ContainerStats {
            request: request.clone(),
            start_calls: 0,
            stop_calls: 0,
            log_polls: 0,
            running: false,
            removed: false,
        }));
        state.containers.push(stats.clone());
        Ok(MockContainer {
            behavior: state.behavior.clone(),
            stats,
        })
    }
}

/// Container produced by [`MockRuntime`].
#[derive(Debug)]
pub struct MockContainer {
    behavior: MockBehavior,
    stats: Arc<Mutex<ContainerStats>>,
}

impl MockContainer {
    /// Snapshot of this container's counters.
    pub fn stats(&self) -> ContainerStats {
        self.stats.lock().unwrap().clone()
    }
}

impl BackingContainer for MockContainer {
    fn start(&mut self) -> FixtureResult<()> {
        let mut stats = self.stats.lock().unwrap();
        stats.start_calls += 1;
        if self.behavior.fail_start {
            return Err(FixtureError::from((
                ErrorKind::ContainerError,
                "Mock container failed to start",
            )));
        }
        stats.running = true;
        Ok(())
    }

    fn stop(&mut self) -> FixtureResult<()> {
        let mut stats = self.stats.lock().unwrap();
        stats.stop_calls += 1;
        if stats.removed {
            return Ok(());
        }
        stats.running = false;
        stats.removed = true;
        if self.behavior.fail_stop {
            return Err(FixtureError::from((
                ErrorKind::ContainerError,
                "Mock container failed to stop",
            )));
        }
        Ok(())
    }

    fn mapped_port(&self, container_port: u16) -> FixtureResult<u16> {
        let stats = self.stats.lock().unwrap();
        if !stats.request.exposed_ports.contains(&container_port) {
            return Err(FixtureError::from((
                ErrorKind::ContainerError,
                "Port is not published",
                container_port.to_string(),
            )));
        }
        Ok(self
            .behavior
            .port_mappings
            .get(&container_port)
            .copied()
            .unwrap_or(container_port.wrapping_add(20000)))
    }

    fn host_address(&self) -> String {
        self.behavior.host.clone()
    }

    fn logs(&self) -> FixtureResult<String> {
        let mut stats = self.stats.lock().unwrap();
        if stats.start_calls == 0 {
            return Ok(String::new());
        }
        stats.log_polls += 1;
        if let Some(limit) = self.behavior.exit_after_polls {
            if stats.log_polls >= limit {
                stats.running = false;
            }
        }
        let mut logs = self.behavior.boot_log.clone();
        if stats.log_polls > self.behavior.ready_after_polls {
            logs.push_str(&self.behavior.started_log);
        }
        Ok(logs)
    }

    fn is_running(&self) -> FixtureResult<bool> {
        Ok(self.stats.lock().unwrap().running)
    }
}
