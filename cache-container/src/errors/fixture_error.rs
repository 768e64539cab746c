use std::{error, fmt, io};

use arcstr::ArcStr;

/// An enum of all error kinds.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The requested protocol version cannot create caches through the API.
    ProtocolTooOld,
    /// The server version cannot create caches through the API.
    ServerTooOld,
    /// No cache-protocol endpoint was exposed.
    MissingEndpoint,
    /// A named configuration resource could not be resolved.
    ResourceNotFound,
    /// The fixture configuration is malformed.
    InvalidConfig,
    /// The readiness condition was not satisfied within its timeout.
    StartupTimeout,
    /// The backing container could not be created, started or released.
    ContainerError,
    /// An error reported by the remote cache client.
    ClientError,
    /// The handle has not reached the provisioned state, or has been stopped.
    NotReady,
    /// The requested endpoint was never declared.
    UnknownEndpoint,
    /// This kind is returned if the error is caused by an I/O failure.
    IoError,
}

/// Represents an error of the cache fixture.
///
/// Most code should interact with it through [`FixtureError::kind`] and the
/// `Display` implementation, which names the violated rule.
pub struct FixtureError {
    repr: ErrorRepr,
}

#[derive(Debug)]
enum ErrorRepr {
    WithDescription(ErrorKind, &'static str),
    WithDescriptionAndDetail(ErrorKind, &'static str, ArcStr),
    IoError(io::Error),
}

impl PartialEq for FixtureError {
    fn eq(&self, other: &FixtureError) -> bool {
        match (&self.repr, &other.repr) {
            (&ErrorRepr::WithDescription(kind_a, _), &ErrorRepr::WithDescription(kind_b, _)) => {
                kind_a == kind_b
            }
            (
                &ErrorRepr::WithDescriptionAndDetail(kind_a, _, _),
                &ErrorRepr::WithDescriptionAndDetail(kind_b, _, _),
            ) => kind_a == kind_b,
            _ => false,
        }
    }
}

impl From<io::Error> for FixtureError {
    fn from(err: io::Error) -> FixtureError {
        FixtureError {
            repr: ErrorRepr::IoError(err),
        }
    }
}

impl From<(ErrorKind, &'static str)> for FixtureError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> FixtureError {
        FixtureError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

impl From<(ErrorKind, &'static str, String)> for FixtureError {
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> FixtureError {
        FixtureError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, desc, detail.into()),
        }
    }
}

impl error::Error for FixtureError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Debug for FixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for FixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match &self.repr {
            ErrorRepr::WithDescription(kind, desc) => {
                desc.fmt(f)?;
                f.write_str(" - ")?;
                fmt::Debug::fmt(&kind, f)
            }
            ErrorRepr::WithDescriptionAndDetail(kind, desc, detail) => {
                desc.fmt(f)?;
                f.write_str(" - ")?;
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                detail.fmt(f)
            }
            ErrorRepr::IoError(err) => err.fmt(f),
        }
    }
}

impl FixtureError {
    /// Returns the kind of the error.
    pub fn kind(&self) -> ErrorKind {
        match &self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => *kind,
            ErrorRepr::IoError(_) => ErrorKind::IoError,
        }
    }

    /// Returns the error detail.
    pub fn detail(&self) -> Option<&str> {
        match &self.repr {
            ErrorRepr::WithDescriptionAndDetail(_, _, detail) => Some(detail.as_str()),
            _ => None,
        }
    }

    /// Returns the name of the error category for display purposes.
    pub fn category(&self) -> &str {
        match self.kind() {
            ErrorKind::ProtocolTooOld => "protocol version below floor",
            ErrorKind::ServerTooOld => "server version below floor",
            ErrorKind::MissingEndpoint => "missing exposed endpoint",
            ErrorKind::ResourceNotFound => "resource not found",
            ErrorKind::InvalidConfig => "invalid fixture config",
            ErrorKind::StartupTimeout => "startup timeout",
            ErrorKind::ContainerError => "container error",
            ErrorKind::ClientError => "client error",
            ErrorKind::NotReady => "not ready",
            ErrorKind::UnknownEndpoint => "unknown endpoint",
            ErrorKind::IoError => "I/O error",
        }
    }

    /// Indicates a problem detected while assembling the spec, before any
    /// container is created.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ProtocolTooOld
                | ErrorKind::ServerTooOld
                | ErrorKind::MissingEndpoint
                | ErrorKind::ResourceNotFound
                | ErrorKind::InvalidConfig
        )
    }

    /// Indicates a problem detected while starting the container.
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::StartupTimeout | ErrorKind::ContainerError
        )
    }

    /// Returns true if error was caused by I/O time out.
    pub fn is_timeout(&self) -> bool {
        match self.repr {
            ErrorRepr::IoError(ref err) => matches!(
                err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ),
            _ => self.kind() == ErrorKind::StartupTimeout,
        }
    }
}

/// Library generic result type.
pub type FixtureResult<T> = Result<T, FixtureError>;
