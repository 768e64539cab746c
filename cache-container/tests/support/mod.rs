#![allow(dead_code)]

use std::time::Duration;

use cache_container::{
    presets, ContainerSpec, ContainerSpecBuilder, FixtureConfig, LifecycleOrchestrator,
    ReadinessCondition,
};
use cache_container_test::{MockConnector, MockRuntime};

pub type MockOrchestrator = LifecycleOrchestrator<MockRuntime, MockConnector>;

/// Image reference of the generic test server.
pub const CACHE_SERVER_IMAGE: &str = "cache-server:9.1.4";

/// A mock runtime and connector wired into an orchestrator. The runtime and
/// connector fields share state with the orchestrator's copies.
pub struct TestContext {
    pub runtime: MockRuntime,
    pub connector: MockConnector,
    pub orchestrator: MockOrchestrator,
}

impl TestContext {
    pub fn new() -> TestContext {
        TestContext::with(MockRuntime::new(), MockConnector::new())
    }

    pub fn with(runtime: MockRuntime, connector: MockConnector) -> TestContext {
        TestContext::with_config(runtime, connector, test_config())
    }

    pub fn with_config(
        runtime: MockRuntime,
        connector: MockConnector,
        config: FixtureConfig,
    ) -> TestContext {
        let _ = env_logger::try_init();
        let orchestrator =
            LifecycleOrchestrator::new(runtime.clone(), connector.clone()).with_config(config);
        TestContext {
            runtime,
            connector,
            orchestrator,
        }
    }
}

/// Polls fast so failing startups do not slow the suite down.
pub fn test_config() -> FixtureConfig {
    FixtureConfig {
        poll_interval: Duration::from_millis(5),
        ..FixtureConfig::default()
    }
}

/// `cache-server:9.1.4` exposing Hot Rod and waiting for the started line.
pub fn cache_server() -> ContainerSpecBuilder {
    ContainerSpecBuilder::new(CACHE_SERVER_IMAGE)
        .with_exposed_endpoint("hotrod", 11222)
        .with_readiness_condition(presets::started_log_condition())
}

pub fn cache_server_with_caches(caches: &[&str]) -> ContainerSpec {
    cache_server()
        .with_caches(caches.iter().copied())
        .unwrap()
        .build()
        .unwrap()
}

pub fn short_log_readiness() -> ReadinessCondition {
    presets::started_log_condition().with_timeout(Duration::from_millis(100))
}
