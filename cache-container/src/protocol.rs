use std::fmt;
use std::str::FromStr;

use crate::errors::{ErrorKind, FixtureError};

/// Wire protocol version negotiated by the remote cache client.
///
/// Variants are declared in ascending order, so comparisons follow the
/// version numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum ProtocolVersion {
    /// 1.0
    V1_0,
    /// 1.1
    V1_1,
    /// 1.2
    V1_2,
    /// 1.3
    V1_3,
    /// 2.0
    V2_0,
    /// 2.1
    V2_1,
    /// 2.2
    V2_2,
    /// 2.3
    V2_3,
    /// 2.4
    V2_4,
    /// 2.5
    V2_5,
    /// 2.6
    V2_6,
    /// 2.7
    V2_7,
    /// 2.8
    V2_8,
}

impl ProtocolVersion {
    /// The first version able to create caches through the administration API.
    pub const FLOOR: ProtocolVersion = ProtocolVersion::V2_0;

    /// The version used when none is requested.
    pub const CURRENT: ProtocolVersion = ProtocolVersion::V2_6;

    /// Every known version, oldest first.
    pub const ALL: [ProtocolVersion; 13] = [
        ProtocolVersion::V1_0,
        ProtocolVersion::V1_1,
        ProtocolVersion::V1_2,
        ProtocolVersion::V1_3,
        ProtocolVersion::V2_0,
        ProtocolVersion::V2_1,
        ProtocolVersion::V2_2,
        ProtocolVersion::V2_3,
        ProtocolVersion::V2_4,
        ProtocolVersion::V2_5,
        ProtocolVersion::V2_6,
        ProtocolVersion::V2_7,
        ProtocolVersion::V2_8,
    ];

    /// Returns `(major, minor)`.
    pub fn parts(self) -> (u8, u8) {
        match self {
            ProtocolVersion::V1_0 => (1, 0),
            ProtocolVersion::V1_1 => (1, 1),
            ProtocolVersion::V1_2 => (1, 2),
            ProtocolVersion::V1_3 => (1, 3),
            ProtocolVersion::V2_0 => (2, 0),
            ProtocolVersion::V2_1 => (2, 1),
            ProtocolVersion::V2_2 => (2, 2),
            ProtocolVersion::V2_3 => (2, 3),
            ProtocolVersion::V2_4 => (2, 4),
            ProtocolVersion::V2_5 => (2, 5),
            ProtocolVersion::V2_6 => (2, 6),
            ProtocolVersion::V2_7 => (2, 7),
            ProtocolVersion::V2_8 => (2, 8),
        }
    }

    /// Whether this version can create caches programmatically.
    pub fn supports_cache_creation(self) -> bool {
        self >= Self::FLOOR
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (major, minor) = self.parts();
        write!(f, "{major}.{minor}")
    }
}

impl FromStr for ProtocolVersion {
    type Err = FixtureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ProtocolVersion::ALL
            .iter()
            .copied()
            .find(|version| version.to_string() == trimmed)
            .ok_or_else(|| {
                FixtureError::from((
                    ErrorKind::InvalidConfig,
                    "Invalid protocol version",
                    s.to_string(),
                ))
            })
    }
}
