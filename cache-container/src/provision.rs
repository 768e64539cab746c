use log::{debug, warn};

use crate::client::RemoteCacheClient;
use crate::errors::FixtureError;

/// Outcome of [`provision`].
#[derive(Debug, Default, PartialEq)]
pub struct ProvisionReport {
    /// Caches created successfully, in order.
    pub created: Vec<String>,
    /// Caches whose creation failed, with the reported error.
    pub failed: Vec<(String, FixtureError)>,
}

impl ProvisionReport {
    /// Whether every requested cache was created.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Creates each cache in order.
///
/// A failing cache is logged and skipped; the remaining caches are still
/// attempted and the failure is only recorded in the report.
// TODO: offer an opt-in strict mode that turns a non-empty `failed` list into
// a startup error.
pub fn provision<C: RemoteCacheClient>(client: &C, cache_names: &[String]) -> ProvisionReport {
    let mut report = ProvisionReport::default();
    for name in cache_names {
        match client.create_cache(name) {
            Ok(()) => {
                debug!("Created cache `{name}`");
                report.created.push(name.clone());
            }
            Err(err) => {
                warn!("Failed to create cache `{name}`: {err}");
                report.failed.push((name.clone(), err));
            }
        }
    }
    report
}
