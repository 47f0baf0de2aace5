use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("marshal error: {0}")]
    Marshal(String),

    #[error("unmarshal error: {0}")]
    Unmarshal(String),

    /// The request never produced an HTTP response.
    #[error("rpc call {method} failed: {reason}")]
    Transport { method: String, reason: String },

    #[error("bad status {status} for {method}")]
    BadStatus { status: u16, method: String },

    /// Error string reported by the remote handler, kept verbatim.
    #[error("{0}")]
    Remote(String),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
