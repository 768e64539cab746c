//! Decides whether caches may be created programmatically for a given server
//! and protocol version.
//!
//! The thresholds are fixed: protocol versions below
//! [`ProtocolVersion::FLOOR`] cannot issue the administration call at all,
//! server releases whose version starts with `1` to `7` predate it, and the
//! `9.0` minor line ships a broken implementation of it.

use crate::errors::{ErrorKind, FixtureError, FixtureResult};
use crate::protocol::ProtocolVersion;

/// Leading digits of server versions that predate programmatic cache creation.
const INCOMPATIBLE_SERVER_MAJORS: [char; 7] = ['1', '2', '3', '4', '5', '6', '7'];

/// Minor release lines with a known server-side bug in cache creation.
const INCOMPATIBLE_SERVER_MINOR_LINES: [&str; 1] = ["9.0"];

/// Outcome of [`evaluate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompatibilityResult {
    /// Caches can be created through the client.
    Compatible,
    /// The protocol version is below [`ProtocolVersion::FLOOR`].
    ProtocolTooOld,
    /// The server release cannot create caches through the client.
    ServerTooOld,
}

impl CompatibilityResult {
    /// Returns `true` for [`CompatibilityResult::Compatible`].
    pub fn is_compatible(self) -> bool {
        self == CompatibilityResult::Compatible
    }
}

/// Evaluates a server version string against a protocol version.
///
/// The protocol rule wins over the server rules, so a 1.x protocol yields
/// [`CompatibilityResult::ProtocolTooOld`] for every server version.
pub fn evaluate(server_version: &str, protocol_version: ProtocolVersion) -> CompatibilityResult {
    if !protocol_version.supports_cache_creation() {
        return CompatibilityResult::ProtocolTooOld;
    }
    let server_version = server_version.trim();
    if server_version.starts_with(INCOMPATIBLE_SERVER_MAJORS) {
        return CompatibilityResult::ServerTooOld;
    }
    if INCOMPATIBLE_SERVER_MINOR_LINES
        .iter()
        .any(|line| is_on_minor_line(server_version, line))
    {
        return CompatibilityResult::ServerTooOld;
    }
    CompatibilityResult::Compatible
}

fn is_on_minor_line(server_version: &str, line: &str) -> bool {
    match server_version.strip_prefix(line) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// Like [`evaluate`], but turns an incompatibility into a configuration error.
pub fn check_cache_creation(
    server_version: &str,
    protocol_version: ProtocolVersion,
) -> FixtureResult<()> {
    match evaluate(server_version, protocol_version) {
        CompatibilityResult::Compatible => Ok(()),
        CompatibilityResult::ProtocolTooOld => Err(FixtureError::from((
            ErrorKind::ProtocolTooOld,
            "A protocol version of at least 2.0 is required to create caches through the API",
            format!(
                "requested protocol {protocol_version}, floor is {}",
                ProtocolVersion::FLOOR
            ),
        ))),
        CompatibilityResult::ServerTooOld => Err(FixtureError::from((
            ErrorKind::ServerTooOld,
            "Server version can't create caches through the API",
            format!(
                "server {server_version} is a 1.x-7.x or 9.0.x release; use a configuration file to predefine caches instead"
            ),
        ))),
    }
}
