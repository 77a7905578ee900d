use std::fmt;

/// Errors surfaced by the registries, sound-source configuration, and the
/// render loop. All of these are recoverable: the failed operation is
/// rejected and state is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No instrument or visualizer matches the requested name or index.
    NotFound(String),
    /// A descriptor with this display name is already registered.
    DuplicateName(String),
    /// A sound-source configuration value is outside the acceptable range.
    InvalidConfig(String),
    /// A visualizer draw step failed; the render loop has been stopped.
    DrawFailure(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(what) => write!(f, "not found: {what}"),
            Error::DuplicateName(name) => write!(f, "duplicate name: {name}"),
            Error::InvalidConfig(why) => write!(f, "invalid config: {why}"),
            Error::DrawFailure(why) => write!(f, "draw failure: {why}"),
        }
    }
}

impl std::error::Error for Error {}
