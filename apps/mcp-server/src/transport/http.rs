//! HTTP transport for MCP
//!
//! JSON-RPC over `POST /mcp`, plus health and info endpoints.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::error::ServerError;
use crate::mcp::protocol::*;
use crate::mcp::SigningMcpServer;

/// Shared state for the HTTP server
#[derive(Clone)]
pub struct HttpServerState {
    server: Arc<SigningMcpServer>,
}

impl HttpServerState {
    pub fn new(server: SigningMcpServer) -> Self {
        Self {
            server: Arc::new(server),
        }
    }
}

/// Build the router; exposed so tests can drive it without a socket
pub fn router(state: HttpServerState) -> Router {
    // Configure CORS for browser clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // MCP JSON-RPC endpoint
        .route("/mcp", post(handle_mcp_request))
        // Health check
        .route("/health", get(handle_health))
        // Server info
        .route("/", get(handle_info))
        .layer(cors)
        .with_state(state)
}

/// Run the MCP server using HTTP transport
pub async fn run_http_server(addr: &str, server: SigningMcpServer) -> Result<(), ServerError> {
    tracing::info!("Starting HTTP transport on {}", addr);

    let app = router(HttpServerState::new(server));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(ServerError::IoError)?;

    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::IoError(std::io::Error::other(e)))?;

    Ok(())
}

/// Handle MCP JSON-RPC requests
async fn handle_mcp_request(
    State(state): State<HttpServerState>,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    tracing::debug!("HTTP request: {:?}", request.method);

    match process_request(&state, request).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn process_request(
    state: &HttpServerState,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    state.server.handle_request(request).await
}

/// Health check endpoint
async fn handle_health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "docsign-mcp-server"
    }))
}

/// Server info endpoint
async fn handle_info(State(state): State<HttpServerState>) -> impl IntoResponse {
    Json(json!({
        "name": state.server.name(),
        "version": state.server.version(),
        "transport": "http",
        "endpoints": {
            "mcp": "/mcp",
            "health": "/health"
        }
    }))
}
