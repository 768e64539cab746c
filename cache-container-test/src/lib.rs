//! Testing support
//!
//! This crate provides [`MockRuntime`], a [`ContainerRuntime`] that never
//! talks to a container engine, and [`MockConnector`], a [`CacheConnector`]
//! whose clients keep caches in memory. Together they drive a
//! [`LifecycleOrchestrator`] through its whole lifecycle without Docker.
//!
//! # Example
//!
//! ```rust
//! use cache_container::{LifecycleOrchestrator, LifecycleState, RemoteCacheClient, presets};
//! use cache_container_test::{MockConnector, MockRuntime};
//!
//! let spec = presets::standalone("9.1.4.Final")
//!     .with_caches(["testCache"])
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! let orchestrator = LifecycleOrchestrator::new(MockRuntime::new(), MockConnector::new());
//!
//! let mut handle = orchestrator.launch(spec).unwrap();
//! assert_eq!(handle.state(), LifecycleState::Provisioned);
//! assert!(handle.client().unwrap().get_cache("testCache").is_some());
//! handle.stop().unwrap();
//! ```
//!
//! [`ContainerRuntime`]: cache_container::ContainerRuntime
//! [`CacheConnector`]: cache_container::CacheConnector
//! [`LifecycleOrchestrator`]: cache_container::LifecycleOrchestrator

mod client;
mod runtime;
pub mod utils;

pub use crate::client::{ConnectionRecord, MockCache, MockCacheClient, MockConnector};
pub use crate::runtime::{
    ContainerStats, MockBehavior, MockContainer, MockRuntime, STARTED_LOG_LINE,
};
