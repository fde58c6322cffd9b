//! JSON-RPC client for the node's `getblocktemplate` and `submitblock`.
//!
//! Requests are JSON-RPC 1.0 over HTTP POST with Basic authentication. Every
//! call is bounded by a timeout.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use http_body_util::{BodyExt, Full};
use hyper::{
    body::Bytes,
    header::{AUTHORIZATION, CONTENT_TYPE},
    Request, StatusCode, Uri,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Failure of a remote call.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The node could not be reached or the HTTP exchange failed.
    #[error("network error: {0}")]
    Network(String),
    /// No response within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The node answered with a non-null `error`.
    #[error("node returned error {code}: {message}")]
    Rpc { code: i64, message: String },
    /// The response was not a JSON-RPC reply.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("failed to encode request: {0}")]
    Serialization(String),
}

impl RpcError {
    /// Transport-level failure, as opposed to an answer from the node.
    pub fn is_network(&self) -> bool {
        matches!(self, RpcError::Network(_) | RpcError::Timeout(_))
    }
}

/// What the node said about a submitted block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// Rejection reason reported by the node (e.g. "high-hash").
    Rejected(String),
}

/// The two remote operations the miner needs from a node.
#[async_trait]
pub trait NodeClient: Send + Sync + 'static {
    /// Fetch the `result` object of `getblocktemplate`.
    async fn get_block_template(&self) -> Result<Value, RpcError>;

    /// Submit a hex-encoded block.
    async fn submit_block(&self, block_hex: String) -> Result<SubmitOutcome, RpcError>;
}

/// Credentials for HTTP Basic authentication.
#[derive(Clone, Debug)]
pub struct Auth {
    username: String,
    password: String,
}

impl Auth {
    pub fn new(username: String, password: String) -> Auth {
        Auth { username, password }
    }

    /// `Basic base64(user:pass)`.
    pub fn header_value(&self) -> String {
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", self.username, self.password))
        )
    }
}

/// HTTP JSON-RPC client for a single node.
#[derive(Debug)]
pub struct RpcClient {
    client: Client<HttpConnector, Full<Bytes>>,
    url: Uri,
    auth: Auth,
    timeout: Duration,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: Uri, auth: Auth, timeout: Duration) -> RpcClient {
        let client: Client<_, Full<Bytes>> = Client::builder(TokioExecutor::new()).build_http();
        RpcClient {
            client,
            url,
            auth,
            timeout,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "1.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let body =
            serde_json::to_vec(&request).map_err(|e| RpcError::Serialization(e.to_string()))?;

        let req = Request::builder()
            .method("POST")
            .uri(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, self.auth.header_value())
            .body(Full::<Bytes>::from(body))
            .map_err(|e| RpcError::Serialization(e.to_string()))?;

        let exchange = async {
            let response = self
                .client
                .request(req)
                .await
                .map_err(|e| RpcError::Network(e.to_string()))?;
            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| RpcError::Network(e.to_string()))?
                .to_bytes();
            Ok::<_, RpcError>((status, body))
        };

        let (status, body) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| RpcError::Timeout(self.timeout))??;

        parse_response(status, &body)
    }
}

#[async_trait]
impl NodeClient for RpcClient {
    async fn get_block_template(&self) -> Result<Value, RpcError> {
        self.call("getblocktemplate", json!([])).await
    }

    async fn submit_block(&self, block_hex: String) -> Result<SubmitOutcome, RpcError> {
        self.call("submitblock", json!([block_hex]))
            .await
            .map(submit_outcome)
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Turn an HTTP reply into the call's `result`.
///
/// Nodes report RPC errors with a non-2xx status and a JSON body, so the
/// body is inspected before the status.
fn parse_response(status: StatusCode, body: &[u8]) -> Result<Value, RpcError> {
    match serde_json::from_slice::<JsonRpcResponse>(body) {
        Ok(JsonRpcResponse { error: Some(error), .. }) => Err(RpcError::Rpc {
            code: error.code,
            message: error.message,
        }),
        Ok(JsonRpcResponse { result, .. }) if status.is_success() => Ok(result),
        Ok(_) => Err(RpcError::Network(format!("HTTP {}", status))),
        Err(_) if !status.is_success() => Err(RpcError::Network(format!("HTTP {}", status))),
        Err(e) => Err(RpcError::InvalidResponse(e.to_string())),
    }
}

/// `submitblock` returns null on acceptance and a reason string otherwise.
fn submit_outcome(result: Value) -> SubmitOutcome {
    match result {
        Value::Null => SubmitOutcome::Accepted,
        Value::String(reason) => SubmitOutcome::Rejected(reason),
        other => SubmitOutcome::Rejected(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one HTTP request with `reply_body`, returning the raw request.
    async fn serve_once(
        status_line: &'static str,
        reply_body: String,
    ) -> (Uri, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url: Uri = format!("http://{}/", listener.local_addr().unwrap())
            .parse()
            .unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let content_length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= split + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                reply_body.len(),
                reply_body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (url, handle)
    }

    fn auth() -> Auth {
        Auth::new("alice".to_string(), "secret".to_string())
    }

    #[test]
    fn test_basic_auth_header() {
        // base64("alice:secret")
        assert_eq!(auth().header_value(), "Basic YWxpY2U6c2VjcmV0");
    }

    #[test]
    fn test_request_shape() {
        let request = JsonRpcRequest {
            jsonrpc: "1.0",
            id: 3,
            method: "submitblock",
            params: json!(["00ff"]),
        };
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({ "jsonrpc": "1.0", "id": 3, "method": "submitblock", "params": ["00ff"] })
        );
    }

    #[test]
    fn test_parse_response() {
        let ok = br#"{"result":{"height":5},"error":null,"id":1}"#;
        assert_eq!(parse_response(StatusCode::OK, ok).unwrap(), json!({ "height": 5 }));

        let rpc_err =
            br#"{"result":null,"error":{"code":-10,"message":"Loading block index"},"id":1}"#;
        assert!(matches!(
            parse_response(StatusCode::INTERNAL_SERVER_ERROR, rpc_err),
            Err(RpcError::Rpc { code: -10, .. })
        ));

        let unauthorized = parse_response(StatusCode::UNAUTHORIZED, b"");
        assert!(matches!(unauthorized, Err(ref e) if e.is_network()));

        let garbage = parse_response(StatusCode::OK, b"<html>");
        assert!(matches!(garbage, Err(RpcError::InvalidResponse(_))));
    }

    #[test]
    fn test_submit_outcome() {
        assert_eq!(submit_outcome(Value::Null), SubmitOutcome::Accepted);
        assert_eq!(
            submit_outcome(json!("high-hash")),
            SubmitOutcome::Rejected("high-hash".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_block_template_over_http() {
        let body = r#"{"result":{"height":1000,"transactions":[]},"error":null,"id":1}"#;
        let (url, server) = serve_once("200 OK", body.to_string()).await;
        let client = RpcClient::new(url, auth(), Duration::from_secs(5));

        let result = client.get_block_template().await.unwrap();
        assert_eq!(result["height"], 1000);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST / HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("authorization: basic ywxpy2u6c2vjcmv0"));
        assert!(request.contains(r#""method":"getblocktemplate""#));
        assert!(request.contains(r#""jsonrpc":"1.0""#));
        assert!(request.contains(r#""params":[]"#));
    }

    #[tokio::test]
    async fn test_submit_block_rejected_over_http() {
        let body = r#"{"result":"bad-txnmrklroot","error":null,"id":2}"#;
        let (url, server) = serve_once("200 OK", body.to_string()).await;
        let client = RpcClient::new(url, auth(), Duration::from_secs(5));

        let outcome = client.submit_block("0011".to_string()).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Rejected("bad-txnmrklroot".to_string()));

        let request = server.await.unwrap();
        assert!(request.contains(r#""params":["0011"]"#));
    }

    #[tokio::test]
    async fn test_rpc_error_over_http() {
        let body = r#"{"result":null,"error":{"code":-9,"message":"not connected"},"id":1}"#;
        let (url, _server) = serve_once("500 Internal Server Error", body.to_string()).await;
        let client = RpcClient::new(url, auth(), Duration::from_secs(5));

        let err = client.get_block_template().await.unwrap_err();
        assert!(matches!(err, RpcError::Rpc { code: -9, .. }));
        assert!(!err.is_network());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url: Uri = format!("http://{}/", addr).parse().unwrap();
        let client = RpcClient::new(url, auth(), Duration::from_secs(5));

        let err = client.get_block_template().await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_silent_node_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url: Uri = format!("http://{}/", listener.local_addr().unwrap())
            .parse()
            .unwrap();
        // Accept and hold the connection without answering
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let client = RpcClient::new(url, auth(), Duration::from_millis(100));
        let err = client.get_block_template().await.unwrap_err();
        assert!(matches!(err, RpcError::Timeout(_)));
    }
}
