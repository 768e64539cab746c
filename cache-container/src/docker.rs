//! [`ContainerRuntime`] backed by the `docker` command line (or a compatible
//! one such as `podman`).

use std::env;
use std::process;

use log::debug;

use crate::config::FixtureConfig;
use crate::container::{BackingContainer, ContainerRequest, ContainerRuntime};
use crate::errors::{ErrorKind, FixtureError, FixtureResult};
use crate::spec::MountMode;

/// Runs containers through a container CLI binary.
#[derive(Clone, Debug)]
pub struct DockerCli {
    binary: String,
    host: String,
}

impl DockerCli {
    /// Uses `binary` to talk to the engine.
    pub fn new(binary: impl Into<String>) -> DockerCli {
        DockerCli {
            binary: binary.into(),
            host: host_from_docker_env(env::var("DOCKER_HOST").ok().as_deref()),
        }
    }

    /// Uses the binary named in `config`.
    pub fn from_config(config: &FixtureConfig) -> DockerCli {
        DockerCli::new(config.docker_binary.clone())
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        DockerCli::from_config(&FixtureConfig::from_env_or_default())
    }
}

fn host_from_docker_env(docker_host: Option<&str>) -> String {
    docker_host
        .and_then(|value| value.strip_prefix("tcp://"))
        .and_then(|rest| rest.split(':').next())
        .filter(|host| !host.is_empty())
        .unwrap_or("localhost")
        .to_string()
}

fn run(binary: &str, args: &[String]) -> FixtureResult<String> {
    let output = run_output(binary, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn run_output(binary: &str, args: &[String]) -> FixtureResult<process::Output> {
    debug!("Running {binary} {}", args.join(" "));
    let output = process::Command::new(binary)
        .args(args)
        .stdin(process::Stdio::null())
        .output()
        .map_err(|err| {
            FixtureError::from((
                ErrorKind::ContainerError,
                "Failed to run container CLI",
                format!("{binary}: {err}"),
            ))
        })?;
    if !output.status.success() {
        fail!((
            ErrorKind::ContainerError,
            "Container CLI reported an error",
            format!(
                "`{binary} {}` exited with {}: {}",
                args.first().map(String::as_str).unwrap_or_default(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )
        ));
    }
    Ok(output)
}

fn create_args(name: &str, request: &ContainerRequest) -> Vec<String> {
    let mut args = vec!["create".to_string(), "--name".to_string(), name.to_string()];
    for port in &request.exposed_ports {
        args.push("-p".to_string());
        args.push(port.to_string());
    }
    for mount in &request.mounts {
        let mode = match mount.mode {
            MountMode::ReadOnly => "ro",
            MountMode::ReadWrite => "rw",
        };
        args.push("-v".to_string());
        args.push(format!(
            "{}:{}:{mode}",
            mount.source.display(),
            mount.destination
        ));
    }
    args.push(request.image_reference());
    args.extend(request.command.iter().cloned());
    args
}

fn parse_port_output(output: &str) -> Option<u16> {
    output
        .lines()
        .filter_map(|line| line.trim().rsplit(':').next())
        .find_map(|port| port.parse().ok())
}

impl ContainerRuntime for DockerCli {
    type Container = DockerContainer;

    fn create(&self, request: &ContainerRequest) -> FixtureResult<DockerContainer> {
        let name = format!("cache-container-{:016x}", rand::random::<u64>());
        run(&self.binary, &create_args(&name, request))?;
        Ok(DockerContainer {
            binary: self.binary.clone(),
            host: self.host.clone(),
            name,
            removed: false,
        })
    }
}

/// A container created by [`DockerCli`]. It is removed on drop.
#[derive(Debug)]
pub struct DockerContainer {
    binary: String,
    host: String,
    name: String,
    removed: bool,
}

impl DockerContainer {
    /// Name given to the container.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn cli(&self, args: &[&str]) -> FixtureResult<String> {
        let mut full: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        full.push(self.name.clone());
        run(&self.binary, &full)
    }
}

impl BackingContainer for DockerContainer {
    fn start(&mut self) -> FixtureResult<()> {
        self.cli(&["start"]).map(drop)
    }

    fn stop(&mut self) -> FixtureResult<()> {
        if self.removed {
            return Ok(());
        }
        self.cli(&["rm", "-f", "-v"])?;
        self.removed = true;
        Ok(())
    }

    fn mapped_port(&self, container_port: u16) -> FixtureResult<u16> {
        let mut args = vec!["port".to_string(), self.name.clone()];
        args.push(format!("{container_port}/tcp"));
        let output = run(&self.binary, &args)?;
        parse_port_output(&output).ok_or_else(|| {
            FixtureError::from((
                ErrorKind::ContainerError,
                "Container port is not published",
                format!("{container_port} on {}", self.name),
            ))
        })
    }

    fn host_address(&self) -> String {
        self.host.clone()
    }

    fn logs(&self) -> FixtureResult<String> {
        let output = run_output(&self.binary, &["logs".to_string(), self.name.clone()])?;
        let mut logs = String::from_utf8_lossy(&output.stdout).into_owned();
        logs.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(logs)
    }

    fn is_running(&self) -> FixtureResult<bool> {
        let output = self.cli(&["inspect", "-f", "{{.State.Running}}"])?;
        Ok(output.trim() == "true")
    }
}

impl Drop for DockerContainer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::FileMount;
    use std::path::PathBuf;

    #[test]
    fn docker_host_parsing() {
        assert_eq!(host_from_docker_env(None), "localhost");
        assert_eq!(host_from_docker_env(Some("unix:///var/run/docker.sock")), "localhost");
        assert_eq!(host_from_docker_env(Some("tcp://10.0.0.5:2375")), "10.0.0.5");
    }

    #[test]
    fn port_output_parsing() {
        assert_eq!(parse_port_output("0.0.0.0:32768\n[::]:32768\n"), Some(32768));
        assert_eq!(parse_port_output(""), None);
    }

    fn container_using(binary: &str) -> DockerContainer {
        DockerContainer {
            binary: binary.to_string(),
            host: "localhost".to_string(),
            name: "cache-container-test".to_string(),
            removed: true,
        }
    }

    #[cfg(unix)]
    #[test]
    fn logs_report_cli_failure() {
        let err = container_using("false").logs().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContainerError);

        let logs = container_using("echo").logs().unwrap();
        assert_eq!(logs, "logs cache-container-test\n");
    }

    #[test]
    fn create_arguments() {
        let request = ContainerRequest {
            image: "jboss/infinispan-server".into(),
            version: "9.1.4.Final".into(),
            exposed_ports: vec![11222, 8080],
            command: vec!["standalone".into()],
            mounts: vec![FileMount {
                source: PathBuf::from("/tmp/standalone.xml"),
                destination: "/opt/standalone.xml".into(),
                mode: MountMode::ReadOnly,
            }],
        };
        assert_eq!(
            create_args("c1", &request),
            vec![
                "create",
                "--name",
                "c1",
                "-p",
                "11222",
                "-p",
                "8080",
                "-v",
                "/tmp/standalone.xml:/opt/standalone.xml:ro",
                "jboss/infinispan-server:9.1.4.Final",
                "standalone",
            ]
        );
    }
}
