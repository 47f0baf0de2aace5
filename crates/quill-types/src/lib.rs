//! Foundation types for Quill.
//!
//! This crate provides the entities and request shapes shared by every storage
//! backend, the RPC protocol and the image service. Every other Quill crate
//! depends on `quill-types`.
//!
//! # Key Types
//!
//! - [`Locator`] -- `(site, url)` pair identifying a commentable post
//! - [`Comment`] -- a single comment with its author, votes and moderation state
//! - [`PostInfo`] -- per-post counters and the read-only marker
//! - [`UserDetailEntry`] -- sparse per-user contact details
//! - [`FindRequest`], [`InfoRequest`], [`FlagRequest`], [`UserDetailRequest`],
//!   [`DeleteRequest`] -- the engine request shapes
//! - [`CommentRef`] -- the `"<url>!!<id>"` reference stored in time indexes
//! - [`time_key`] -- fixed-width nanosecond timestamp keys

pub mod admin;
pub mod comment;
pub mod error;
pub mod locator;
pub mod post;
pub mod reference;
pub mod request;
pub mod temporal;
pub mod user;

pub use admin::{AdminRecord, EventKind};
pub use comment::{Comment, DeleteMode, Edit, User, DELETED_USER};
pub use error::TypeError;
pub use locator::Locator;
pub use post::PostInfo;
pub use reference::{CommentRef, REF_SEPARATOR};
pub use request::{
    DeleteRequest, Flag, FlagRequest, FindRequest, GetRequest, InfoRequest, UserDetailRequest,
};
pub use temporal::{parse_time_key, permanent_until, time_key, PERMANENT_BLOCK_YEARS, TIME_KEY_LEN};
pub use user::{BlockedUser, FlaggedUser, UserDetail, UserDetailEntry};
