//! JSON-RPC server for Quill storage plugins.
//!
//! Wraps an [`Engine`](quill_store::Engine), an
//! [`AdminStore`](quill_store::AdminStore) and an
//! [`ImageStore`](quill_image::ImageStore) behind a single POST endpoint so
//! that the host can talk to storage running in another process.
//!
//! Every request passes panic recovery, a per-client token bucket, optional
//! Basic auth and a request timeout. Storage calls run on blocking threads.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod rate_limit;
pub mod router;
pub mod server;

pub use config::{RateLimitConfig, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use handler::{handler, Handler, MethodTable};
pub use rate_limit::RateLimiter;
pub use server::RpcServer;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use quill_protocol::BasicAuth;
    use quill_store::InMemoryEngine;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn server(config: ServerConfig) -> RpcServer {
        let server = RpcServer::new(config);
        server.register_engine(Arc::new(InMemoryEngine::with_sites(["radio-t"])));
        server.register(
            "debug",
            vec![
                ("debug.panic", handler(|(): ()| -> Result<(), String> { panic!("boom") })),
                (
                    "debug.sleep",
                    handler(|ms: u64| {
                        std::thread::sleep(Duration::from_millis(ms));
                        Ok::<_, String>(ms)
                    }),
                ),
            ],
        );
        server
    }

    fn unlimited() -> ServerConfig {
        ServerConfig {
            rate_limit: RateLimitConfig::unlimited(),
            ..Default::default()
        }
    }

    async fn call(app: Router, body: impl Into<Body>, auth: Option<String>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri("/v1/rpc")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            request = request.header(header::AUTHORIZATION, auth);
        }
        let response = app.oneshot(request.body(body.into()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn rpc(method: &str, params: Value) -> String {
        json!({"id": 1, "method": method, "params": params}).to_string()
    }

    #[tokio::test]
    async fn results_and_handler_errors_are_200() {
        let app = server(unlimited()).router();

        let (status, body) = call(app.clone(), rpc("store.count", json!({"locator": {"site": "radio-t"}})), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": 1, "result": 0}));

        let (status, body) = call(app, rpc("store.find", json!({"locator": {"site": "bad"}})), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"], json!(r#"site "bad" not found"#));
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let app = server(unlimited()).router();
        let (status, _) = call(app, "{not json", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_method_is_501() {
        let app = server(unlimited()).router();
        let (status, body) = call(app, rpc("store.nope", Value::Null), None).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body["id"], json!(1));
    }

    #[tokio::test]
    async fn basic_auth_is_enforced() {
        let creds = BasicAuth::new("quill", "secret");
        let app = server(ServerConfig {
            auth: Some(creds.clone()),
            ..unlimited()
        })
        .router();

        let (status, _) = call(app.clone(), rpc("store.close", Value::Null), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let wrong = BasicAuth::new("quill", "guess").header_value();
        let (status, _) = call(app.clone(), rpc("store.close", Value::Null), Some(wrong)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(app, rpc("store.close", Value::Null), Some(creds.header_value())).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn bursts_beyond_the_bucket_are_429() {
        let app = server(ServerConfig {
            rate_limit: RateLimitConfig {
                requests_per_second: 0.01,
                burst: 2,
            },
            ..Default::default()
        })
        .router();

        for _ in 0..2 {
            let (status, _) = call(app.clone(), rpc("store.close", Value::Null), None).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, _) = call(app, rpc("store.close", Value::Null), None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn panicking_handler_is_500() {
        let app = server(unlimited()).router();
        let (status, body) = call(app, rpc("debug.panic", Value::Null), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["id"], json!(1));
    }

    #[tokio::test]
    async fn slow_handler_times_out_with_408() {
        let app = server(ServerConfig {
            request_timeout: Duration::from_millis(50),
            ..unlimited()
        })
        .router();

        let (status, body) = call(app.clone(), rpc("debug.sleep", json!(1)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], json!(1));

        let (status, _) = call(app, rpc("debug.sleep", json!(500)), None).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    }
}
