use thiserror::Error;

/// Failure reported by a platform clipboard backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The clipboard could not be opened, usually because another process holds it.
    #[error("clipboard is held by another process")]
    Busy,

    #[error("clipboard platform error: {0}")]
    Platform(String),

    #[error("bitmap conversion failed: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Busy)
    }
}

impl From<image::ImageError> for BackendError {
    fn from(err: image::ImageError) -> Self {
        BackendError::Image(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("clipboard bridge has been disposed")]
    Disposed,

    #[error("unexpected clipboard failure: {0}")]
    Unexpected(#[source] BackendError),

    #[error("clipboard worker panicked")]
    WorkerPanicked,

    #[error("failed to spawn clipboard worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("could not register for clipboard updates: {0}")]
    Registration(String),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
