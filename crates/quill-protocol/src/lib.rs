//! JSON-RPC wire protocol for Quill storage plugins.
//!
//! A request is one JSON object POSTed to a single endpoint:
//! `{"id": 1, "method": "store.find", "params": ...}`. The response echoes the
//! id and carries either `result` or a non-empty `error` string. Binary image
//! payloads are base64 strings.

pub mod auth;
pub mod codec;
pub mod endpoint;
pub mod error;
pub mod message;

pub use auth::BasicAuth;
pub use codec::RpcCodec;
pub use endpoint::{methods, DEFAULT_PATH};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{RpcRequest, RpcResponse};
