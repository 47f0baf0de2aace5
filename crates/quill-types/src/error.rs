use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid time key {0}")]
    InvalidTimeKey(String),

    #[error("invalid reference {0}")]
    InvalidReference(String),

    #[error("url {0} contains reserved separator")]
    ReservedSeparator(String),

    #[error("url {0} ends with the first character of the reserved separator")]
    AmbiguousUrl(String),

    #[error("unsupported detail {0}")]
    UnsupportedDetail(String),

    #[error("unsupported flag {0}")]
    UnsupportedFlag(String),
}
