use std::path::{Path, PathBuf};

use crate::config::FixtureConfig;
use crate::errors::{ErrorKind, FixtureError, FixtureResult};

/// Resolves named configuration files to absolute host paths so they can be
/// mounted into a container.
#[derive(Clone, Debug)]
pub struct ResourceLocator {
    roots: Vec<PathBuf>,
}

impl ResourceLocator {
    /// Searches `roots` in order.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        ResourceLocator {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    /// Uses the roots of `config`.
    pub fn from_config(config: &FixtureConfig) -> Self {
        Self::new(config.resource_roots.iter().cloned())
    }

    /// The directories searched, in order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Returns the absolute path of `name`.
    ///
    /// Absolute names are accepted as-is when the file exists; relative names
    /// are looked up under each root and the first existing file wins.
    pub fn resolve(&self, name: &str) -> FixtureResult<PathBuf> {
        let requested = Path::new(name);
        if requested.is_absolute() {
            if requested.is_file() {
                return Ok(requested.canonicalize()?);
            }
        } else {
            for root in &self.roots {
                let candidate = root.join(requested);
                if candidate.is_file() {
                    return Ok(candidate.canonicalize()?);
                }
            }
        }
        Err(FixtureError::from((
            ErrorKind::ResourceNotFound,
            "Cannot read configuration resource",
            format!("{name} (searched {:?})", self.roots),
        )))
    }
}

/// Searches the roots named by `CACHE_CONTAINER_RESOURCES`, or the default
/// roots when it is unset.
impl Default for ResourceLocator {
    fn default() -> Self {
        Self::from_config(&FixtureConfig::from_env_or_default())
    }
}
