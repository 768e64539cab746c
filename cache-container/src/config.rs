use std::env;
use std::path::PathBuf;
use std::time::Duration;

use log::warn;

use crate::errors::{ErrorKind, FixtureError, FixtureResult};

/// Environment variable naming the container CLI binary.
pub const DOCKER_BINARY_ENV: &str = "CACHE_CONTAINER_DOCKER";
/// Environment variable listing resource root directories, `:`-separated.
pub const RESOURCES_ENV: &str = "CACHE_CONTAINER_RESOURCES";
/// Environment variable overriding the readiness timeout, in seconds.
pub const STARTUP_TIMEOUT_ENV: &str = "CACHE_CONTAINER_STARTUP_TIMEOUT";
/// Environment variable setting the readiness poll interval, in milliseconds.
pub const POLL_INTERVAL_ENV: &str = "CACHE_CONTAINER_POLL_INTERVAL_MS";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Process-level settings of the fixture, read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixtureConfig {
    /// Binary used by [`DockerCli`](crate::DockerCli).
    pub docker_binary: String,
    /// Directories searched for named configuration resources.
    pub resource_roots: Vec<PathBuf>,
    /// Replaces the readiness timeout of every spec when set.
    pub startup_timeout: Option<Duration>,
    /// Delay between readiness probes.
    pub poll_interval: Duration,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        FixtureConfig {
            docker_binary: "docker".to_string(),
            resource_roots: default_resource_roots(),
            startup_timeout: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

fn default_resource_roots() -> Vec<PathBuf> {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    vec![cwd.join("resources"), cwd.join("tests").join("resources")]
}

impl FixtureConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> FixtureResult<FixtureConfig> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), but a malformed variable is logged
    /// and the defaults are used instead. Default constructors go through
    /// this.
    pub fn from_env_or_default() -> FixtureConfig {
        Self::from_lookup_or_default(|key| env::var(key).ok())
    }

    /// Like [`from_lookup`](Self::from_lookup), falling back to the defaults
    /// on error.
    pub fn from_lookup_or_default<F>(lookup: F) -> FixtureConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(lookup).unwrap_or_else(|err| {
            warn!("Ignoring fixture environment: {err}");
            FixtureConfig::default()
        })
    }

    /// Reads the configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> FixtureResult<FixtureConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = FixtureConfig::default();

        if let Some(binary) = lookup(DOCKER_BINARY_ENV).filter(|v| !v.trim().is_empty()) {
            config.docker_binary = binary.trim().to_string();
        }
        if let Some(roots) = lookup(RESOURCES_ENV) {
            config.resource_roots = env::split_paths(&roots)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        if let Some(secs) = lookup(STARTUP_TIMEOUT_ENV) {
            config.startup_timeout = Some(Duration::from_secs(parse_number(
                STARTUP_TIMEOUT_ENV,
                &secs,
            )?));
        }
        if let Some(millis) = lookup(POLL_INTERVAL_ENV) {
            let millis = parse_number(POLL_INTERVAL_ENV, &millis)?;
            if millis == 0 {
                fail!((
                    ErrorKind::InvalidConfig,
                    "Poll interval must be positive",
                    POLL_INTERVAL_ENV.to_string()
                ));
            }
            config.poll_interval = Duration::from_millis(millis);
        }
        Ok(config)
    }
}

fn parse_number(key: &str, value: &str) -> FixtureResult<u64> {
    value.trim().parse().map_err(|_| {
        FixtureError::from((
            ErrorKind::InvalidConfig,
            "Expected a non-negative integer",
            format!("{key}={value}"),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = FixtureConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.docker_binary, "docker");
        assert_eq!(config.startup_timeout, None);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.resource_roots.len(), 2);
    }

    #[test]
    fn reads_all_variables() {
        let config = FixtureConfig::from_lookup(lookup(&[
            (DOCKER_BINARY_ENV, "podman"),
            (RESOURCES_ENV, "/a:/b"),
            (STARTUP_TIMEOUT_ENV, "45"),
            (POLL_INTERVAL_ENV, "10"),
        ]))
        .unwrap();
        assert_eq!(config.docker_binary, "podman");
        assert_eq!(
            config.resource_roots,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert_eq!(config.startup_timeout, Some(Duration::from_secs(45)));
        assert_eq!(config.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn rejects_malformed_numbers() {
        let err = FixtureConfig::from_lookup(lookup(&[(STARTUP_TIMEOUT_ENV, "soon")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        let err = FixtureConfig::from_lookup(lookup(&[(POLL_INTERVAL_ENV, "0")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn lenient_lookup_keeps_valid_settings() {
        let config = FixtureConfig::from_lookup_or_default(lookup(&[
            (DOCKER_BINARY_ENV, "podman"),
            (STARTUP_TIMEOUT_ENV, "45"),
        ]));
        assert_eq!(config.docker_binary, "podman");
        assert_eq!(config.startup_timeout, Some(Duration::from_secs(45)));

        let config = FixtureConfig::from_lookup_or_default(lookup(&[
            (DOCKER_BINARY_ENV, "podman"),
            (POLL_INTERVAL_ENV, "often"),
        ]));
        assert_eq!(config, FixtureConfig::default());
    }

    #[test]
    fn accepts_largest_startup_timeout() {
        let config = FixtureConfig::from_lookup(lookup(&[(
            STARTUP_TIMEOUT_ENV,
            "18446744073709551615",
        )]))
        .unwrap();
        assert_eq!(config.startup_timeout, Some(Duration::from_secs(u64::MAX)));
    }
}
