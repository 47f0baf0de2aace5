//! Comment storage engines for Quill.
//!
//! Every backend implements the [`Engine`] trait. Comments are grouped per
//! site and per post; two time-ordered indexes serve the site-wide "recent
//! comments" list and per-user listings.
//!
//! # Storage Backends
//!
//! - [`DiskEngine`] -- one redb database per site, transactional updates
//! - [`InMemoryEngine`] -- map-based engine for tests and embedding
//!
//! # Design Rules
//!
//! 1. A comment id is unique within its post.
//! 2. Deleted comments keep their row so threads stay intact.
//! 3. Post counters and the site index only see live comments.
//! 4. Every multi-table change happens in one transaction.
//! 5. All storage errors are propagated, never silently ignored.

pub mod admin;
pub mod disk;
pub mod error;
pub mod memory;
pub mod query;
pub mod sort;
pub mod tables;
pub mod traits;

pub use admin::{AdminStore, StaticAdminStore};
pub use disk::{DiskEngine, DiskEngineConfig};
pub use error::{EngineError, EngineResult};
pub use memory::InMemoryEngine;
pub use query::{DEFAULT_INFO_LIMIT, MAX_LAST_LIMIT, MAX_USER_LIMIT};
pub use sort::{live_time_range, sort_comments};
pub use traits::Engine;
