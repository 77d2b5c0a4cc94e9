use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::rpc::{IconRpc, RpcError};
use crate::signer::{Signer, SignerError};
use crate::transaction::{CallRequest, Params, Transaction, ZERO_ADDRESS};
use crate::units;

/// Status value of a successfully executed transaction.
pub const STATUS_SUCCESS: &str = "0x1";

#[derive(Debug, Error)]
pub enum TxError {
	#[error(transparent)]
	Rpc(#[from] RpcError),
	#[error(transparent)]
	Sign(#[from] SignerError),
	#[error("failed to get transaction result after {attempts} attempts: {error}")]
	ResultUnavailable { attempts: u32, error: Value },
	#[error("transaction {tx_hash} failed: {result}")]
	ExecutionFailed { tx_hash: String, result: Value },
	#[error("unknown response for transaction {tx_hash}: {response}")]
	UnknownResponse { tx_hash: String, response: Value },
}

/// Final outcome of a confirmed transaction.  Fields the handler does not
/// interpret are kept so the whole result can be written back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResult {
	pub status: String,
	#[serde(rename = "scoreAddress", default, skip_serializing_if = "Option::is_none")]
	pub score_address: Option<String>,
	#[serde(rename = "txHash", default, skip_serializing_if = "Option::is_none")]
	pub tx_hash: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl TransactionResult {
	pub fn is_success(&self) -> bool {
		self.status == STATUS_SUCCESS
	}
}

/// How long to wait for a submitted transaction to show up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
	/// Fetches answered with `error` before giving up.
	pub attempts: u32,
	pub interval: Duration,
}

impl Default for PollPolicy {
	fn default() -> Self {
		Self {
			attempts: 20,
			interval: Duration::from_secs(2),
		}
	}
}

/// Step limits used when the caller does not pass one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepLimits {
	/// Flat ceiling for method invocations; these are never estimated.
	pub invoke: u64,
	pub transfer: u64,
}

impl Default for StepLimits {
	fn default() -> Self {
		Self {
			invoke: 1_000_000_000,
			transfer: 100_000,
		}
	}
}

/// One classified `icx_getTransactionResult` response.
enum Poll {
	Pending(Value),
	Done(Value),
	Unknown(Value),
}

impl Poll {
	fn classify(mut response: Value) -> Self {
		if let Some(err) = response.get_mut("error") {
			return Self::Pending(err.take());
		}
		if let Some(result) = response.get_mut("result") {
			return Self::Done(result.take());
		}
		Self::Unknown(response)
	}
}

/// Builds, signs, submits and confirms transactions against one network.
pub struct TxHandler<R> {
	rpc: R,
	nid: u64,
	poll: PollPolicy,
	limits: StepLimits,
}

impl<R: IconRpc> TxHandler<R> {
	pub fn new(rpc: R, nid: u64) -> Self {
		Self {
			rpc,
			nid,
			poll: PollPolicy::default(),
			limits: StepLimits::default(),
		}
	}

	pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
		self.poll = poll;
		self
	}

	pub fn with_step_limits(mut self, limits: StepLimits) -> Self {
		self.limits = limits;
		self
	}

	pub fn nid(&self) -> u64 {
		self.nid
	}

	pub fn rpc(&self) -> &R {
		&self.rpc
	}

	/// Deploy a new contract.  Without `limit` the step cost is estimated.
	pub async fn install(
		&self,
		signer: &dyn Signer,
		content: Vec<u8>,
		content_type: &str,
		params: Option<Params>,
		limit: Option<u64>,
	) -> Result<String, TxError> {
		self.deploy(signer, ZERO_ADDRESS, content, content_type, params, limit)
			.await
	}

	/// Replace the code of the contract at `to`.
	pub async fn update(
		&self,
		signer: &dyn Signer,
		to: &str,
		content: Vec<u8>,
		content_type: &str,
		params: Option<Params>,
		limit: Option<u64>,
	) -> Result<String, TxError> {
		self.deploy(signer, to, content, content_type, params, limit)
			.await
	}

	/// Read-only query; nothing is signed or paid for.
	pub async fn call(&self, to: &str, method: &str, params: Option<Params>) -> Result<Value, TxError> {
		let request = CallRequest::new(to, method, params);
		Ok(self.rpc.call(&request).await?)
	}

	/// Call a state-changing method, optionally attaching `value` loop.
	pub async fn invoke(
		&self,
		signer: &dyn Signer,
		to: &str,
		method: &str,
		params: Option<Params>,
		limit: Option<u64>,
		value: u128,
	) -> Result<String, TxError> {
		info!("{}", describe_invoke(method, params.as_ref(), value));
		let tx = Transaction::new(signer.address(), to, self.nid)
			.with_value(value)
			.with_call(method, params);
		self.send(tx, signer, Some(limit.unwrap_or(self.limits.invoke)))
			.await
	}

	/// Plain value transfer.
	pub async fn transfer(
		&self,
		signer: &dyn Signer,
		to: &str,
		amount: u128,
		limit: Option<u64>,
	) -> Result<String, TxError> {
		let tx = Transaction::new(signer.address(), to, self.nid).with_value(amount);
		self.send(tx, signer, Some(limit.unwrap_or(self.limits.transfer)))
			.await
	}

	/// Poll until the transaction has a result.
	///
	/// `error` responses mean the node has no result yet and are retried up
	/// to the poll policy's attempt count.  A result whose status is not
	/// `0x1` fails immediately, as does any response that is neither.
	pub async fn ensure_result(&self, tx_hash: &str, verbose: bool) -> Result<TransactionResult, TxError> {
		let mut remaining = self.poll.attempts;
		loop {
			let response = self.rpc.get_transaction_result(tx_hash).await?;
			match Poll::classify(response) {
				Poll::Pending(err) => {
					remaining = remaining.saturating_sub(1);
					if remaining == 0 {
						error!("Response: {}", pretty(&err));
						return Err(TxError::ResultUnavailable {
							attempts: self.poll.attempts,
							error: err,
						});
					}
					debug!(tx_hash, remaining, "transaction result not available yet");
					tokio::time::sleep(self.poll.interval).await;
				}
				Poll::Done(raw) => {
					let result: TransactionResult = match serde_json::from_value(raw.clone()) {
						Ok(r) => r,
						Err(_) => {
							error!("Response: {}", pretty(&raw));
							return Err(TxError::UnknownResponse {
								tx_hash: tx_hash.to_owned(),
								response: raw,
							});
						}
					};
					if !result.is_success() {
						error!("Result: {}", pretty(&raw));
						return Err(TxError::ExecutionFailed {
							tx_hash: tx_hash.to_owned(),
							result: raw,
						});
					}
					if verbose {
						info!("Result: {}", pretty(&raw));
					} else {
						debug!("Result: {raw}");
					}
					return Ok(result);
				}
				Poll::Unknown(response) => {
					error!("Response: {}", pretty(&response));
					return Err(TxError::UnknownResponse {
						tx_hash: tx_hash.to_owned(),
						response,
					});
				}
			}
		}
	}

	async fn deploy(
		&self,
		signer: &dyn Signer,
		to: &str,
		content: Vec<u8>,
		content_type: &str,
		params: Option<Params>,
		limit: Option<u64>,
	) -> Result<String, TxError> {
		let tx = Transaction::new(signer.address(), to, self.nid).with_deploy(content_type, content, params);
		self.send(tx, signer, limit).await
	}

	/// Sign with `limit`, or with the node's estimate when there is none,
	/// and submit.
	async fn send(&self, tx: Transaction, signer: &dyn Signer, limit: Option<u64>) -> Result<String, TxError> {
		let step_limit = match limit {
			Some(limit) => limit,
			None => {
				let estimate = self.rpc.estimate_step(&tx).await?;
				debug!(estimate, "estimated step cost");
				estimate
			}
		};
		let signed = tx.sign(step_limit, signer)?;
		let hash = self.rpc.send_transaction(&signed).await?;
		if hash != signed.hash() {
			warn!(local = %signed.hash(), remote = %hash, "node reported a different transaction hash");
		}
		info!(tx_hash = %hash, step_limit, "transaction submitted");
		Ok(hash)
	}
}

impl<R> TxHandler<R> {
	/// Bind a deployed contract address to this handler.
	pub fn score(&self, address: &str) -> Score<'_, R> {
		Score {
			handler: self,
			address: address.to_owned(),
		}
	}
}

/// A deployed contract reached through a [`TxHandler`].
pub struct Score<'a, R> {
	handler: &'a TxHandler<R>,
	address: String,
}

impl<R: IconRpc> Score<'_, R> {
	pub fn address(&self) -> &str {
		&self.address
	}

	pub async fn call(&self, method: &str, params: Option<Params>) -> Result<Value, TxError> {
		self.handler.call(&self.address, method, params).await
	}

	pub async fn invoke(
		&self,
		signer: &dyn Signer,
		method: &str,
		params: Option<Params>,
		limit: Option<u64>,
		value: u128,
	) -> Result<String, TxError> {
		self.handler
			.invoke(signer, &self.address, method, params, limit, value)
			.await
	}
}

/// The log line for an invocation; the ICX annotation only appears when a
/// value is attached.
pub fn describe_invoke(method: &str, params: Option<&Params>, value: u128) -> String {
	let params = params
		.map(|p| Value::Object(p.clone()).to_string())
		.unwrap_or_else(|| "{}".into());
	if value > 0 {
		format!("Invoking {method}({params}) with {} ICX ...", units::format_icx(value))
	} else {
		format!("Invoking {method}({params}) ...")
	}
}

fn pretty(v: &Value) -> String {
	serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}
