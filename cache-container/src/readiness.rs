//! Blocking wait for a container's readiness condition.

use std::net::{SocketAddr, ToSocketAddrs};
use std::thread::sleep;
use std::time::{Duration, Instant};

use log::{debug, info};
use regex::Regex;
use socket2::{Domain, Socket, Type};

use crate::container::BackingContainer;
use crate::errors::{ErrorKind, FixtureError, FixtureResult};
use crate::spec::{compile_log_pattern, ContainerSpec, ReadinessCondition};

/// Counts non-overlapping matches of `pattern` in `logs`.
pub fn count_log_matches(pattern: &Regex, logs: &str) -> usize {
    pattern.find_iter(logs).count()
}

/// Returns whether a TCP connection to `host:port` succeeds within `timeout`.
pub fn port_accepts_connections(host: &str, port: u16, timeout: Duration) -> bool {
    let addrs: Vec<SocketAddr> = match (host, port).to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(_) => return false,
    };
    addrs.iter().any(|addr| {
        let socket = match Socket::new(Domain::for_address(*addr), Type::STREAM, None) {
            Ok(socket) => socket,
            Err(_) => return false,
        };
        socket.connect_timeout(&(*addr).into(), timeout).is_ok()
    })
}

enum Probe<'a> {
    Log { pattern: Regex, times: usize },
    Port { endpoint: &'a str },
}

fn is_satisfied<C: BackingContainer>(
    container: &C,
    spec: &ContainerSpec,
    probe: &Probe<'_>,
    probe_timeout: Duration,
) -> FixtureResult<bool> {
    match probe {
        Probe::Log { pattern, times } => {
            let logs = container.logs()?;
            Ok(count_log_matches(pattern, &logs) >= *times)
        }
        Probe::Port { endpoint } => {
            let endpoint = spec.endpoint(endpoint).ok_or_else(|| {
                FixtureError::from((
                    ErrorKind::UnknownEndpoint,
                    "Readiness probes an endpoint that is not exposed",
                    endpoint.to_string(),
                ))
            })?;
            let port = container.mapped_port(endpoint.port)?;
            Ok(port_accepts_connections(
                &container.host_address(),
                port,
                probe_timeout,
            ))
        }
    }
}

/// Blocks until the readiness condition of `spec` holds.
///
/// `timeout` replaces the condition's own timeout. Fails with
/// [`ErrorKind::StartupTimeout`] when it elapses and with
/// [`ErrorKind::ContainerError`] when the container stops running.
pub fn wait_until_ready<C: BackingContainer>(
    container: &C,
    spec: &ContainerSpec,
    timeout: Duration,
    poll_interval: Duration,
) -> FixtureResult<()> {
    let probe = match spec.readiness() {
        ReadinessCondition::LogMessage { pattern, times, .. } => Probe::Log {
            pattern: compile_log_pattern(pattern)?,
            times: (*times).max(1),
        },
        ReadinessCondition::PortListening { endpoint, .. } => Probe::Port { endpoint },
    };
    let started = Instant::now();
    // `None` when the timeout is too large to represent: wait indefinitely.
    let deadline = started.checked_add(timeout);

    loop {
        if is_satisfied(container, spec, &probe, poll_interval)? {
            info!(
                "{} ready after {:?}",
                spec.image_reference(),
                started.elapsed()
            );
            return Ok(());
        }
        if !container.is_running()? {
            let logs = container.logs().unwrap_or_default();
            fail!((
                ErrorKind::ContainerError,
                "Container exited before becoming ready",
                format!("{}; log output: {logs:?}", spec.image_reference())
            ));
        }
        let now = Instant::now();
        let pause = match deadline {
            Some(deadline) if now >= deadline => fail!((
                ErrorKind::StartupTimeout,
                "Readiness condition not satisfied in time",
                format!("{} not ready within {timeout:?}", spec.image_reference())
            )),
            Some(deadline) => poll_interval.min(deadline - now),
            None => poll_interval,
        };
        debug!("Waiting for {} to become ready", spec.image_reference());
        sleep(pause);
    }
}
