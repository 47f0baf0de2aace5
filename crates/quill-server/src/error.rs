use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server is not running")]
    NotRunning,

    #[error("server is already running")]
    AlreadyRunning,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
