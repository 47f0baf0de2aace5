//! Client side of the Quill storage plugin protocol.
//!
//! [`RemoteEngine`], [`RemoteAdminStore`] and [`RemoteImageStore`] implement
//! the storage contracts by forwarding every call to a `quill-server`
//! process, so a host can swap in out-of-process storage without changes.

pub mod error;
pub mod remote;
pub mod rpc;

pub use error::{ClientError, ClientResult};
pub use remote::{RemoteAdminStore, RemoteEngine, RemoteImageStore};
pub use rpc::{RpcClient, RpcClientConfig};
