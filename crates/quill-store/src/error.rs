use quill_types::TypeError;

/// Errors from engine operations.
///
/// The rendered messages are part of the contract: the RPC layer ships them
/// verbatim and callers match on some of them (notably `not found`).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No database is open for the site.
    #[error("site \"{0}\" not found")]
    SiteNotFound(String),

    /// The post has no stored data.
    #[error("no bucket {0} in store")]
    PostNotFound(String),

    /// Missing comment or entry.
    #[error("not found")]
    NotFound,

    /// A comment with this id already exists in the post.
    #[error("key {0} already in store")]
    DuplicateId(String),

    /// The post refuses new comments.
    #[error("post {0} is read-only")]
    ReadOnly(String),

    /// The request shape is not valid for the operation.
    #[error("{0}")]
    InvalidRequest(String),

    /// Only `blocked` and `verified` can be listed.
    #[error("flag {0} not listable")]
    FlagNotListable(String),

    /// An index entry does not decode to `<url>!!<id>`.
    #[error("invalid reference {0}")]
    MalformedReference(String),

    /// Failure in the underlying key/value store.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Error string returned by a remote engine, kept verbatim.
    #[error("{0}")]
    Remote(String),
}

impl EngineError {
    /// Rebuild an error from its rendered message.
    ///
    /// `not found` maps back to [`EngineError::NotFound`] because callers
    /// branch on it; anything else is kept verbatim.
    pub fn from_remote(message: impl Into<String>) -> Self {
        let message = message.into();
        if message == "not found" {
            Self::NotFound
        } else {
            Self::Remote(message)
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl From<TypeError> for EngineError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidReference(raw) => Self::MalformedReference(raw),
            other => Self::InvalidRequest(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

macro_rules! storage_error_from {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for EngineError {
                fn from(err: $ty) -> Self {
                    Self::Storage(err.to_string())
                }
            }
        )+
    };
}

storage_error_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
