use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use quill_protocol::{RpcCodec, RpcRequest, RpcResponse};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_basic_auth;
use crate::config::ServerConfig;
use crate::handler::MethodTable;
use crate::rate_limit::{rate_limit, RateLimiter};

/// Build the axum router serving `methods` on the configured path.
pub fn build_router(config: &ServerConfig, methods: Arc<MethodTable>) -> Router {
    let mut router = Router::new()
        .route(&config.path, post(rpc_handler))
        .with_state(methods);

    if let Some(auth) = &config.auth {
        router = router.layer(from_fn_with_state(Arc::new(auth.clone()), require_basic_auth));
    }
    if config.rate_limit.is_enabled() {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        router = router.layer(from_fn_with_state(limiter, rate_limit));
    }

    router
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

async fn rpc_handler(State(methods): State<Arc<MethodTable>>, body: Bytes) -> Response {
    let RpcRequest { id, method, params } = match RpcCodec::decode_request(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error = %err, "malformed rpc request");
            return (StatusCode::BAD_REQUEST, Json(RpcResponse::err(0, err.to_string()))).into_response();
        }
    };

    let Some(handler) = methods.get(&method).cloned() else {
        tracing::warn!(%method, "unknown rpc method");
        let body = RpcResponse::err(id, format!("unsupported method {method}"));
        return (StatusCode::NOT_IMPLEMENTED, Json(body)).into_response();
    };

    tracing::debug!(id, %method, "rpc call");
    match tokio::task::spawn_blocking(move || handler(params)).await {
        Ok(Ok(result)) => Json(RpcResponse::ok(id, result)).into_response(),
        Ok(Err(err)) => {
            tracing::debug!(id, %method, error = %err, "rpc call failed");
            Json(RpcResponse::err(id, err)).into_response()
        }
        Err(err) => {
            tracing::error!(id, %method, error = %err, "rpc handler panicked");
            let body = RpcResponse::err(id, "internal server error");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}
