//! Streamable HTTP transport.
//!
//! One endpoint (default `/mcp`) accepts a JSON-RPC message per `POST`.
//! `GET` and `DELETE` are answered with 405 since the server never opens
//! a server-to-client stream. Every response carries an `Mcp-Session-Id`
//! header, echoing the client's or minting a new one.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::ServeError;
use crate::mcp::context::RequestContext;
use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::protocol::{parse_value, JsonRpcError, JsonRpcReply};
use crate::mcp::transport::shutdown_signal;

/// Session header, lower-cased as `http` stores it.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Router options.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Path of the JSON-RPC endpoint.
    pub endpoint_path: String,
    /// Directory of compiled widget bundles served under `/widgets`.
    pub widgets_dir: Option<PathBuf>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            endpoint_path: "/mcp".to_string(),
            widgets_dir: None,
        }
    }
}

/// Builds the axum router serving `dispatcher`.
pub fn router(dispatcher: Arc<Dispatcher>, options: &HttpOptions) -> Router {
    let mut router = Router::new()
        .route(
            &options.endpoint_path,
            post(handle_post)
                .get(method_not_allowed)
                .delete(method_not_allowed),
        )
        .with_state(dispatcher);

    if let Some(dir) = &options.widgets_dir {
        router = router.nest_service("/widgets", ServeDir::new(dir));
    }

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Binds `address` and serves until a shutdown signal arrives.
///
/// # Errors
///
/// Returns [`ServeError`] if binding or serving fails.
pub async fn serve(
    dispatcher: Arc<Dispatcher>,
    address: SocketAddr,
    options: &HttpOptions,
) -> Result<(), ServeError> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|source| ServeError::Bind { address, source })?;

    tracing::info!(
        %address,
        endpoint = %options.endpoint_path,
        widgets = ?options.widgets_dir,
        "Serving MCP over HTTP"
    );

    axum::serve(listener, router(dispatcher, options))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn handle_post(
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let session_id = session_id(&headers);

    let Ok(value) = serde_json::from_slice::<Value>(&body) else {
        tracing::debug!(session = %session_id, "Rejected malformed JSON body");
        return reply(
            StatusCode::BAD_REQUEST,
            &JsonRpcError::parse_error().into(),
            &session_id,
        );
    };

    let message = match parse_value(value) {
        Ok(message) => message,
        Err(error) => {
            tracing::debug!(session = %session_id, "Rejected invalid JSON-RPC message");
            return reply(StatusCode::BAD_REQUEST, &error.into(), &session_id);
        }
    };

    let event: RequestContext = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    match dispatcher.handle_message(message, event, &session_id).await {
        Some(answer) => reply(StatusCode::OK, &answer, &session_id),
        None => with_session(StatusCode::ACCEPTED.into_response(), &session_id),
    }
}

async fn method_not_allowed(headers: HeaderMap) -> Response {
    reply(
        StatusCode::METHOD_NOT_ALLOWED,
        &JsonRpcError::method_not_allowed().into(),
        &session_id(&headers),
    )
}

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string)
}

fn reply(status: StatusCode, body: &JsonRpcReply, session_id: &str) -> Response {
    with_session((status, Json(body)).into_response(), session_id)
}

fn with_session(mut response: Response, session_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}
