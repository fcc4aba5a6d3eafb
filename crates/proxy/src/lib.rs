//! Same-origin JSON-RPC reverse proxy.
//!
//! Browsers talk to `/api/rpc` on this origin; the proxy forwards each
//! request to the chain's JSON-RPC endpoint and relays the result, request
//! id and upstream error objects preserved. Nothing here is fatal:
//! forwarding failures become JSON-RPC error responses.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::traits::ToRpcParams;
use jsonrpsee::core::ClientError;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};

/// Where the proxy listens and where it forwards to.
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    pub listen_addr: String,
    pub upstream_url: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3000".to_string(),
            upstream_url: click_gateway::chain::DEFAULT_RPC_URL.to_string(),
        }
    }
}

/// JSON-RPC request as received from the browser.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC response relayed back.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

struct ProxyState {
    client: HttpClient,
}

/// The proxy server.
pub struct RpcProxy {
    config: ProxyConfig,
    state: Arc<ProxyState>,
}

impl RpcProxy {
    pub fn new(config: ProxyConfig) -> anyhow::Result<Self> {
        let client = HttpClientBuilder::default().build(&config.upstream_url)?;
        Ok(Self {
            config,
            state: Arc::new(ProxyState { client }),
        })
    }

    /// Axum router; CORS is permissive so browser clients can call it.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

        Router::new()
            .route("/api/rpc", post(handle_rpc))
            .layer(cors)
            .with_state(self.state.clone())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.config.listen_addr).await?;
        tracing::info!(
            "rpc proxy listening on {} -> {}",
            self.config.listen_addr,
            self.config.upstream_url
        );
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn handle_rpc(
    State(state): State<Arc<ProxyState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    tracing::debug!("forwarding: {}", request.method);
    let response = match forward(&state.client, &request.method, &request.params).await {
        Ok(result) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: Some(result),
            error: None,
        },
        Err(error) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: None,
            error: Some(error),
        },
    };
    (StatusCode::OK, Json(response))
}

async fn forward(
    client: &HttpClient,
    method: &str,
    params: &Value,
) -> Result<Value, JsonRpcErrorObject> {
    let params = raw_params(params).map_err(|e| JsonRpcErrorObject {
        code: -32602,
        message: e.to_string(),
        data: None,
    })?;
    client
        .request::<Value, _>(method, params)
        .await
        .map_err(upstream_error)
}

/// Pass-through params: whatever the browser sent goes upstream verbatim.
struct RawParams(Option<Box<RawValue>>);

impl ToRpcParams for RawParams {
    fn to_rpc_params(self) -> Result<Option<Box<RawValue>>, serde_json::Error> {
        Ok(self.0)
    }
}

fn raw_params(params: &Value) -> Result<RawParams, serde_json::Error> {
    match params {
        Value::Null => Ok(RawParams(None)),
        other => Ok(RawParams(Some(serde_json::value::to_raw_value(other)?))),
    }
}

fn upstream_error(err: ClientError) -> JsonRpcErrorObject {
    match err {
        // Node-side errors keep their code and message so wallets can
        // still interpret reverts.
        ClientError::Call(e) => JsonRpcErrorObject {
            code: e.code(),
            message: e.message().to_string(),
            data: e
                .data()
                .and_then(|d| serde_json::from_str(d.get()).ok()),
        },
        other => JsonRpcErrorObject {
            code: -32000,
            message: format!("upstream unreachable: {}", other),
            data: None,
        },
    }
}
