/// Errors from image storage and the image service.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Neither committed nor staged.
    #[error("image {0} not found")]
    NotFound(String),

    /// Commit of an image that was never staged.
    #[error("image {0} not found in staging")]
    NotInStaging(String),

    #[error("file is too large")]
    TooLarge,

    /// Only gif, png, jpeg and webp are accepted.
    #[error("file format is not allowed")]
    FormatNotAllowed,

    /// Failure in the underlying key/value store.
    #[error("storage error: {0}")]
    Storage(String),

    /// Error string returned by a remote image store, kept verbatim.
    #[error("{0}")]
    Remote(String),

    /// Fetching an external picture failed.
    #[error("can't download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for image operations.
pub type ImageResult<T> = Result<T, ImageError>;

macro_rules! storage_error_from {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for ImageError {
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
