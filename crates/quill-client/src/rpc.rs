use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use quill_protocol::{BasicAuth, ProtocolError, RpcCodec, RpcRequest};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ClientError, ClientResult};

/// Where and how to reach an RPC server.
#[derive(Clone, Debug)]
pub struct RpcClientConfig {
    /// Full endpoint URL, e.g. `http://127.0.0.1:8090/v1/rpc`.
    pub url: String,
    pub auth: Option<BasicAuth>,
    pub timeout: Duration,
}

impl RpcClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_auth(mut self, auth: BasicAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Blocking JSON-RPC client. Must not be used from inside an async task;
/// wrap calls in `spawn_blocking` there.
pub struct RpcClient {
    http: reqwest::blocking::Client,
    config: RpcClientConfig,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(config: RpcClientConfig) -> ClientResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        Ok(Self {
            http,
            config,
            next_id: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &RpcClientConfig {
        &self.config
    }

    /// Call `method`. Pass a single value for one parameter and a tuple
    /// for several; `()` sends no parameters.
    pub fn call<P, R>(&self, method: &str, params: P) -> ClientResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let request = RpcRequest {
            id,
            method: method.to_string(),
            params: RpcCodec::to_value(&params)?,
        };
        let body = RpcCodec::encode_request(&request)?;

        let mut http = self
            .http
            .post(&self.config.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(auth) = &self.config.auth {
            http = http.header(AUTHORIZATION, auth.header_value());
        }

        let transport = |err: reqwest::Error| ProtocolError::Transport {
            method: method.to_string(),
            reason: err.to_string(),
        };
        let response = http.send().map_err(transport)?;
        if response.status() != StatusCode::OK {
            return Err(ProtocolError::BadStatus {
                status: response.status().as_u16(),
                method: method.to_string(),
            }
            .into());
        }
        let bytes = response.bytes().map_err(transport)?;
        let response = RpcCodec::decode_response(&bytes)?;
        if response.id != id {
            tracing::debug!(method, sent = id, got = response.id, "rpc response id mismatch");
        }

        let value = response.into_result().map_err(ProtocolError::Remote)?;
        Ok(RpcCodec::from_value(value)?)
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient").field("url", &self.config.url).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_server_is_a_transport_error() {
        let client = RpcClient::new(
            RpcClientConfig::new("http://127.0.0.1:1/v1/rpc").with_timeout(Duration::from_secs(1)),
        )
        .unwrap();
        let err = client.call::<_, bool>("store.flag", ()).unwrap_err();
        assert!(err.to_string().starts_with("rpc call store.flag failed: "), "{err}");
    }
}
