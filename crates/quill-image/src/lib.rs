//! Image storage for Quill comments.
//!
//! Uploads are staged first and only become permanent once the comment that
//! references them is saved. Staged images that are never committed expire
//! after a TTL.
//!
//! - [`DiskImageStore`] -- redb-backed [`ImageStore`]
//! - [`ImageService`] -- validation, resizing, delayed commit queue, cleanup loop
//! - [`Preserver`] -- copies external pictures of a comment into the store

pub mod disk;
pub mod error;
pub mod html;
pub mod preserver;
pub mod service;
pub mod traits;

pub use disk::DiskImageStore;
pub use error::{ImageError, ImageResult};
pub use preserver::{Preserver, PreserverConfig};
pub use service::{ImageService, ImageServiceConfig, COMMIT_QUEUE_SIZE};
pub use traits::{ImageStore, StoreInfo};
