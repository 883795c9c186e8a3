/*
 * Error Module
 *
 * Errors returned by the few fallible operations of the engine: registry
 * lookups, boundary frame construction, parameter validation and config
 * loading. Everything that happens inside a tick is infallible by
 * construction.
 */

use thiserror::Error;

use crate::registry::FlockId;

#[derive(Debug, Error, PartialEq)]
pub enum FlockError {
    /// The handle does not refer to a flock in the registry.
    #[error("no flock registered for handle {0:?}")]
    UnknownFlock(FlockId),
    /// A flock cannot be linked to itself.
    #[error("flock {0:?} cannot be linked to itself")]
    SelfLink(FlockId),
    /// The image-to-world transform has no inverse.
    #[error("image-to-world transform is singular")]
    SingularTransform,
    /// A tunable is outside the range the engine accepts.
    #[error("invalid flock parameters: {0}")]
    InvalidParams(&'static str),
    /// The simulation config could not be parsed or is inconsistent.
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, FlockError>;
