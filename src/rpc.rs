use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::transaction::{CallRequest, SignedTransaction, Transaction};

#[derive(Debug, Error)]
pub enum RpcError {
	#[error("request to {url} failed: {source}")]
	Http {
		url: String,
		#[source]
		source: reqwest::Error,
	},
	#[error("JSON-RPC error {code}: {message}")]
	Remote { code: i64, message: String },
	#[error("unexpected JSON-RPC response: {0}")]
	InvalidResponse(String),
}

/// The subset of the ICON JSON-RPC API the transaction handler needs.
#[async_trait]
pub trait IconRpc: Send + Sync {
	/// Ask the node how many steps `tx` would consume.
	async fn estimate_step(&self, tx: &Transaction) -> Result<u64, RpcError>;

	/// Submit a signed transaction and return its hash.
	async fn send_transaction(&self, tx: &SignedTransaction) -> Result<String, RpcError>;

	/// Fetch the result of a transaction.  Returns the whole JSON-RPC
	/// response so callers can tell `{"error": ..}` (not yet available)
	/// apart from `{"result": ..}`.
	async fn get_transaction_result(&self, tx_hash: &str) -> Result<Value, RpcError>;

	/// Execute a read-only call.
	async fn call(&self, request: &CallRequest) -> Result<Value, RpcError>;
}

/// HTTP JSON-RPC client for an ICON node.
///
/// Regular methods go to `<base>/api/v3`; step estimation lives on the
/// debug endpoint `<base>/api/v3d`.
pub struct RpcClient {
	http: reqwest::Client,
	url: String,
	debug_url: String,
	next_id: AtomicU64,
}

impl RpcClient {
	pub fn new(base_url: &str) -> Self {
		let base = base_url
			.trim_end_matches('/')
			.trim_end_matches("/api/v3")
			.to_owned();
		Self {
			http: reqwest::Client::new(),
			url: format!("{base}/api/v3"),
			debug_url: format!("{base}/api/v3d"),
			next_id: AtomicU64::new(1),
		}
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	/// Post one JSON-RPC request and return the raw response body.
	async fn post(&self, url: &str, method: &str, params: Value) -> Result<Value, RpcError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let body = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});
		debug!(method, id, "rpc request");

		let http_err = |source| RpcError::Http {
			url: url.to_owned(),
			source,
		};
		// Nodes answer JSON-RPC errors with non-2xx codes, so the status is
		// not checked; the body carries the error.
		self.http
			.post(url)
			.json(&body)
			.send()
			.await
			.map_err(http_err)?
			.json()
			.await
			.map_err(http_err)
	}

	async fn request(&self, url: &str, method: &str, params: Value) -> Result<Value, RpcError> {
		into_result(self.post(url, method, params).await?)
	}
}

#[async_trait]
impl IconRpc for RpcClient {
	async fn estimate_step(&self, tx: &Transaction) -> Result<u64, RpcError> {
		let params = Value::Object(tx.to_params(None));
		let steps = self
			.request(&self.debug_url, "debug_estimateStep", params)
			.await?;
		let hex = steps
			.as_str()
			.ok_or_else(|| RpcError::InvalidResponse(format!("step estimate {steps}")))?;
		parse_hex_u64(hex)
	}

	async fn send_transaction(&self, tx: &SignedTransaction) -> Result<String, RpcError> {
		let params = Value::Object(tx.params().clone());
		let hash = self.request(&self.url, "icx_sendTransaction", params).await?;
		hash.as_str()
			.map(str::to_owned)
			.ok_or_else(|| RpcError::InvalidResponse(format!("transaction hash {hash}")))
	}

	async fn get_transaction_result(&self, tx_hash: &str) -> Result<Value, RpcError> {
		self.post(
			&self.url,
			"icx_getTransactionResult",
			json!({ "txHash": tx_hash }),
		)
		.await
	}

	async fn call(&self, request: &CallRequest) -> Result<Value, RpcError> {
		self.request(&self.url, "icx_call", Value::Object(request.to_params()))
			.await
	}
}

// -- Private helpers --

/// Unwrap `result`, or turn `error` into [`RpcError::Remote`].
fn into_result(mut resp: Value) -> Result<Value, RpcError> {
	if let Some(result) = resp.get_mut("result") {
		return Ok(result.take());
	}
	match resp.get("error") {
		Some(err) => Err(RpcError::Remote {
			code: err.get("code").and_then(Value::as_i64).unwrap_or_default(),
			message: err
				.get("message")
				.and_then(Value::as_str)
				.unwrap_or("unknown error")
				.to_owned(),
		}),
		None => Err(RpcError::InvalidResponse(resp.to_string())),
	}
}

fn parse_hex_u64(s: &str) -> Result<u64, RpcError> {
	s.strip_prefix("0x")
		.and_then(|digits| u64::from_str_radix(digits, 16).ok())
		.ok_or_else(|| RpcError::InvalidResponse(format!("expected hex integer, got {s:?}")))
}
