use thiserror::Error;

/// Failures reported by a [`PhysicsBackend`](crate::dynamics::PhysicsBackend).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BackendError {
    #[error("rigid body could not be created: {0}")]
    BodyCreation(String),

    #[error("collision shape could not be built: {0}")]
    Shape(String),

    #[error("body handle is not known to the physics world")]
    UnknownBody,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SetupError {
    #[error("invalid vehicle config: {0}")]
    InvalidConfig(&'static str),

    #[error("car has no chassis body")]
    NotInitialized,

    #[error(transparent)]
    Backend(#[from] BackendError),
}
