use quill_image::ImageError;
use quill_protocol::ProtocolError;
use quill_store::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("can't build http client: {0}")]
    Build(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl From<ClientError> for EngineError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Protocol(ProtocolError::Remote(message)) => EngineError::from_remote(message),
            other => EngineError::Remote(other.to_string()),
        }
    }
}

impl From<ClientError> for ImageError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Protocol(ProtocolError::Remote(message)) => ImageError::Remote(message),
            other => ImageError::Remote(other.to_string()),
        }
    }
}
