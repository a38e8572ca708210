//! MCP server core: shared state and JSON-RPC method dispatch
//!
//! Both transports hand decoded requests to [`SigningMcpServer::handle_request`].
//! Notifications (requests without an id) are processed but produce no
//! response.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use docsign_core::{Notifier, ProviderRegistry, SignatureLifecycle};
use serde_json::{json, Value};

use super::protocol::*;
use super::tools;
use crate::config::ServerConfig;
use crate::error::ServerError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// The document fill and signing MCP server
#[derive(Clone)]
pub struct SigningMcpServer {
    name: String,
    version: String,
    config: Arc<ServerConfig>,
    lifecycle: SignatureLifecycle,
    notifier: Notifier,
    http: reqwest::Client,
}

impl SigningMcpServer {
    /// Build the provider registry from `config` and wire up the notifier
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let registry = ProviderRegistry::from_config(&config.providers)?;
        Ok(Self::with_registry(config, registry))
    }

    /// Use an already assembled registry instead of the configured providers
    pub fn with_registry(config: ServerConfig, registry: ProviderRegistry) -> Self {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client for downloads: {}", e);
                reqwest::Client::new()
            });
        let notifier = Notifier::new(config.notifier.clone());
        let providers: Vec<_> = registry.kinds().map(|kind| kind.as_str()).collect();
        tracing::info!("Signature providers: {}", providers.join(", "));
        Self {
            name: "docsign-mcp-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config: Arc::new(config),
            lifecycle: SignatureLifecycle::new(Arc::new(registry)),
            notifier,
            http,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn timeout_ms(&self) -> u64 {
        self.config.timeout_ms
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    pub fn lifecycle(&self) -> &SignatureLifecycle {
        &self.lifecycle
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Handle one JSON-RPC request. Returns `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let notification = request.is_notification();
        let response = self.dispatch(request).await;
        if notification {
            None
        } else {
            Some(response)
        }
    }

    async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        tracing::debug!("Dispatching {}", request.method);

        if request.jsonrpc != JSONRPC_VERSION {
            return JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            );
        }

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "initialized" | "notifications/initialized" | "notifications/cancelled" => {
                JsonRpcResponse::success(id, json!({}))
            }
            "tools/list" => handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "ping" => JsonRpcResponse::success(id, json!({})),
            _ => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: ServerInfo {
                name: self.name.clone(),
                version: self.version.clone(),
            },
        };

        match serde_json::to_value(result) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::error(id, INVALID_REQUEST, e.to_string()),
        }
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing tool name");
        };
        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(args @ Value::Object(_)) => args.clone(),
            Some(_) => {
                return JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    "Tool arguments must be an object",
                )
            }
        };

        let (body, is_error) = tools::call_tool(self, name, arguments).await;
        let text = serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string());
        JsonRpcResponse::success(
            id,
            json!({
                "content": [ToolResultContent::Text { text }],
                "isError": is_error
            }),
        )
    }
}

fn handle_list_tools(id: Option<Value>) -> JsonRpcResponse {
    let tools = tools::get_tool_definitions();
    JsonRpcResponse::success(id, json!({ "tools": tools }))
}
