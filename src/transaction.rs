use base64::Engine;
use serde_json::{Map, Value};

use crate::crypto;
use crate::signer::{Signer, SignerError};
use crate::units::to_hex;

/// Recipient of every install transaction.
pub const ZERO_ADDRESS: &str = "cx0000000000000000000000000000000000000000";

const TX_VERSION: &str = "0x3";
const HASH_PREFIX: &str = "icx_sendTransaction";

pub type Params = Map<String, Value>;

/// What a transaction carries besides a value transfer.
#[derive(Debug, Clone, PartialEq)]
pub enum TxData {
	Call {
		method: String,
		params: Option<Params>,
	},
	Deploy {
		content_type: String,
		content: Vec<u8>,
		params: Option<Params>,
	},
}

/// An unsigned ICON v3 transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
	pub from: String,
	pub to: String,
	pub nid: u64,
	pub value: u128,
	pub nonce: Option<u128>,
	/// Microseconds since the Unix epoch.
	pub timestamp: i64,
	pub data: Option<TxData>,
}

impl Transaction {
	pub fn new(from: &str, to: &str, nid: u64) -> Self {
		Self {
			from: from.to_owned(),
			to: to.to_owned(),
			nid,
			value: 0,
			nonce: None,
			timestamp: chrono::Utc::now().timestamp_micros(),
			data: None,
		}
	}

	pub fn with_value(mut self, value: u128) -> Self {
		self.value = value;
		self
	}

	pub fn with_nonce(mut self, nonce: u128) -> Self {
		self.nonce = Some(nonce);
		self
	}

	pub fn with_timestamp(mut self, micros: i64) -> Self {
		self.timestamp = micros;
		self
	}

	pub fn with_call(mut self, method: &str, params: Option<Params>) -> Self {
		self.data = Some(TxData::Call {
			method: method.to_owned(),
			params: params.map(normalize_params),
		});
		self
	}

	pub fn with_deploy(mut self, content_type: &str, content: Vec<u8>, params: Option<Params>) -> Self {
		self.data = Some(TxData::Deploy {
			content_type: content_type.to_owned(),
			content,
			params: params.map(normalize_params),
		});
		self
	}

	/// JSON-RPC params for this transaction.  `stepLimit` is left out when
	/// `step_limit` is `None`, which is the shape step estimation expects.
	pub fn to_params(&self, step_limit: Option<u64>) -> Params {
		let mut p = Params::new();
		p.insert("version".into(), TX_VERSION.into());
		p.insert("from".into(), self.from.clone().into());
		p.insert("to".into(), self.to.clone().into());
		if let Some(limit) = step_limit {
			p.insert("stepLimit".into(), to_hex(u128::from(limit)).into());
		}
		p.insert("timestamp".into(), format!("{:#x}", self.timestamp).into());
		p.insert("nid".into(), to_hex(u128::from(self.nid)).into());
		if self.value > 0 {
			p.insert("value".into(), to_hex(self.value).into());
		}
		if let Some(nonce) = self.nonce {
			p.insert("nonce".into(), to_hex(nonce).into());
		}

		match &self.data {
			Some(TxData::Call { method, params }) => {
				let mut data = Params::new();
				data.insert("method".into(), method.clone().into());
				if let Some(params) = params {
					data.insert("params".into(), Value::Object(params.clone()));
				}
				p.insert("dataType".into(), "call".into());
				p.insert("data".into(), Value::Object(data));
			}
			Some(TxData::Deploy {
				content_type,
				content,
				params,
			}) => {
				let mut data = Params::new();
				data.insert("contentType".into(), content_type.clone().into());
				data.insert("content".into(), format!("0x{}", hex::encode(content)).into());
				if let Some(params) = params {
					data.insert("params".into(), Value::Object(params.clone()));
				}
				p.insert("dataType".into(), "deploy".into());
				p.insert("data".into(), Value::Object(data));
			}
			None => {}
		}
		p
	}

	/// Fix the step limit, hash and sign.
	pub fn sign(&self, step_limit: u64, signer: &dyn Signer) -> Result<SignedTransaction, SignerError> {
		let mut params = self.to_params(Some(step_limit));
		let hash = tx_hash(&params);
		let signature = signer.sign_digest(&hash)?;
		params.insert(
			"signature".into(),
			base64::engine::general_purpose::STANDARD
				.encode(signature)
				.into(),
		);
		Ok(SignedTransaction {
			params,
			step_limit,
			hash,
		})
	}
}

/// A transaction with its step limit and signature fixed.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
	params: Params,
	step_limit: u64,
	hash: [u8; 32],
}

impl SignedTransaction {
	/// Params ready for `icx_sendTransaction`, signature included.
	pub fn params(&self) -> &Params {
		&self.params
	}

	pub fn step_limit(&self) -> u64 {
		self.step_limit
	}

	pub fn hash(&self) -> String {
		format!("0x{}", hex::encode(self.hash))
	}
}

/// A read-only `icx_call` request.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
	pub from: Option<String>,
	pub to: String,
	pub method: String,
	pub params: Option<Params>,
}

impl CallRequest {
	pub fn new(to: &str, method: &str, params: Option<Params>) -> Self {
		Self {
			from: None,
			to: to.to_owned(),
			method: method.to_owned(),
			params: params.map(normalize_params),
		}
	}

	pub fn to_params(&self) -> Params {
		let mut data = Params::new();
		data.insert("method".into(), self.method.clone().into());
		if let Some(params) = &self.params {
			data.insert("params".into(), Value::Object(params.clone()));
		}

		let mut p = Params::new();
		if let Some(from) = &self.from {
			p.insert("from".into(), from.clone().into());
		}
		p.insert("to".into(), self.to.clone().into());
		p.insert("dataType".into(), "call".into());
		p.insert("data".into(), Value::Object(data));
		p
	}
}

// -- Hashing --

/// SHA3-256 over the canonical serialization of `params`.
pub fn tx_hash(params: &Params) -> [u8; 32] {
	crypto::sha3_256(serialize(params).as_bytes())
}

/// Canonical `icx_sendTransaction.k1.v1.k2.v2...` form: keys sorted,
/// nested objects in `{}` and arrays in `[]`, `\0` for null, and
/// `\ . { } [ ]` escaped with a backslash.  `signature` and `txHash` are
/// never part of the hashed form.
pub fn serialize(params: &Params) -> String {
	let mut out = String::from(HASH_PREFIX);
	for (key, value) in sorted(params) {
		if key == "signature" || key == "txHash" {
			continue;
		}
		out.push('.');
		out.push_str(key);
		out.push('.');
		serialize_value(value, &mut out);
	}
	out
}

fn serialize_value(value: &Value, out: &mut String) {
	match value {
		Value::Object(map) => {
			out.push('{');
			for (i, (key, v)) in sorted(map).into_iter().enumerate() {
				if i > 0 {
					out.push('.');
				}
				out.push_str(key);
				out.push('.');
				serialize_value(v, out);
			}
			out.push('}');
		}
		Value::Array(items) => {
			out.push('[');
			for (i, v) in items.iter().enumerate() {
				if i > 0 {
					out.push('.');
				}
				serialize_value(v, out);
			}
			out.push(']');
		}
		Value::Null => out.push_str("\\0"),
		Value::String(s) => escape_into(s, out),
		other => escape_into(&other.to_string(), out),
	}
}

fn escape_into(s: &str, out: &mut String) {
	for c in s.chars() {
		if matches!(c, '\\' | '.' | '{' | '}' | '[' | ']') {
			out.push('\\');
		}
		out.push(c);
	}
}

fn sorted(map: &Params) -> Vec<(&String, &Value)> {
	let mut entries: Vec<_> = map.iter().collect();
	entries.sort_by(|a, b| a.0.cmp(b.0));
	entries
}

// -- Parameter normalization --

/// Convert JSON numbers to `0x` hex strings and booleans to `0x1`/`0x0`,
/// recursively, the way SCORE parameters are passed on the wire.
pub fn normalize_params(params: Params) -> Params {
	params
		.into_iter()
		.map(|(k, v)| (k, normalize_value(v)))
		.collect()
}

fn normalize_value(value: Value) -> Value {
	match value {
		Value::Bool(b) => Value::String(if b { "0x1" } else { "0x0" }.into()),
		Value::Number(n) => match (n.as_u64(), n.as_i64()) {
			(Some(u), _) => Value::String(format!("{u:#x}")),
			(None, Some(i)) => Value::String(format!("-{:#x}", i.unsigned_abs())),
			_ => Value::String(n.to_string()),
		},
		Value::Array(items) => Value::Array(items.into_iter().map(normalize_value).collect()),
		Value::Object(map) => Value::Object(normalize_params(map)),
		other => other,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::signer::KeyWallet;
	use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
	use secp256k1::{Message, Secp256k1};
	use serde_json::json;

	const FROM: &str = "hxbe258ceb872e08851f1f59694dac2558708ece11";
	const TO: &str = "hx5bfdb090f43a808005ffc27c25b213145e80b7cd";

	fn obj(v: Value) -> Params {
		v.as_object().unwrap().clone()
	}

	#[test]
	fn transfer_serialization() {
		let tx = Transaction::new(FROM, TO, 1)
			.with_value(10u128.pow(18))
			.with_nonce(1)
			.with_timestamp(0x563a6cf330136);
		let params = tx.to_params(Some(0x12345));
		assert_eq!(
			serialize(&params),
			"icx_sendTransaction.from.hxbe258ceb872e08851f1f59694dac2558708ece11\
			 .nid.0x1.nonce.0x1.stepLimit.0x12345.timestamp.0x563a6cf330136\
			 .to.hx5bfdb090f43a808005ffc27c25b213145e80b7cd\
			 .value.0xde0b6b3a7640000.version.0x3"
		);
	}

	#[test]
	fn call_data_serialization_escapes_and_sorts() {
		let params = obj(json!({
			"version": "0x3",
			"dataType": "call",
			"data": {
				"method": "transfer",
				"params": {"to": "hx1", "memo": "a.b{c}[d]\\e", "extra": null, "list": ["x", "y"]}
			}
		}));
		assert_eq!(
			serialize(&params),
			"icx_sendTransaction.data.{method.transfer.params.{extra.\\0.list.[x.y].memo.a\\.b\\{c\\}\\[d\\]\\\\e.to.hx1}}\
			 .dataType.call.version.0x3"
		);
	}

	#[test]
	fn signature_and_tx_hash_are_not_hashed() {
		let a = obj(json!({"from": FROM, "version": "0x3"}));
		let b = obj(json!({"from": FROM, "version": "0x3", "signature": "abc", "txHash": "0x1"}));
		assert_eq!(serialize(&a), serialize(&b));
	}

	#[test]
	fn zero_value_is_omitted() {
		let tx = Transaction::new(FROM, TO, 1).with_call("ping", None);
		let params = tx.to_params(None);
		assert!(!params.contains_key("value"));
		assert!(!params.contains_key("stepLimit"));
		assert!(!params.contains_key("nonce"));
		assert_eq!(params["dataType"], "call");
		assert_eq!(params["data"], json!({"method": "ping"}));
	}

	#[test]
	fn deploy_params_shape() {
		let tx = Transaction::new(FROM, ZERO_ADDRESS, 0x53).with_deploy(
			"application/java",
			vec![0xca, 0xfe],
			Some(obj(json!({"name": "pool", "fee": 3000}))),
		);
		let p = tx.to_params(Some(10));
		assert_eq!(p["to"], ZERO_ADDRESS);
		assert_eq!(p["nid"], "0x53");
		assert_eq!(p["stepLimit"], "0xa");
		assert_eq!(p["dataType"], "deploy");
		assert_eq!(
			p["data"],
			json!({
				"contentType": "application/java",
				"content": "0xcafe",
				"params": {"name": "pool", "fee": "0xbb8"}
			})
		);
	}

	#[test]
	fn param_normalization() {
		let p = normalize_params(obj(json!({
			"a": 16, "b": -1, "c": true, "d": false, "e": "0x10", "f": [1, {"g": 2}], "h": null
		})));
		assert_eq!(
			Value::Object(p),
			json!({"a": "0x10", "b": "-0x1", "c": "0x1", "d": "0x0", "e": "0x10", "f": ["0x1", {"g": "0x2"}], "h": null})
		);
	}

	#[test]
	fn signed_transaction_recovers_signer() {
		let wallet = KeyWallet::from_private_key(&[0x33; 32]).unwrap();
		let tx = Transaction::new(wallet.address(), TO, 3)
			.with_value(5)
			.with_timestamp(1_700_000_000_000_000);
		let signed = tx.sign(100_000, &wallet).unwrap();

		assert_eq!(signed.step_limit(), 100_000);
		assert_eq!(signed.params()["stepLimit"], "0x186a0");

		let expected = crypto::sha3_256(serialize(signed.params()).as_bytes());
		assert_eq!(signed.hash(), format!("0x{}", hex::encode(expected)));

		let sig_b64 = signed.params()["signature"].as_str().unwrap();
		let sig = base64::engine::general_purpose::STANDARD.decode(sig_b64).unwrap();
		assert_eq!(sig.len(), 65);
		let recid = RecoveryId::from_i32(i32::from(sig[64])).unwrap();
		let rs = RecoverableSignature::from_compact(&sig[..64], recid).unwrap();
		let pk = Secp256k1::new()
			.recover_ecdsa(&Message::from_digest(expected), &rs)
			.unwrap();
		assert_eq!(pk, wallet.public_key());
	}

	#[test]
	fn call_request_params() {
		let req = CallRequest::new("cx01", "balanceOf", Some(obj(json!({"_owner": FROM}))));
		assert_eq!(
			Value::Object(req.to_params()),
			json!({
				"to": "cx01",
				"dataType": "call",
				"data": {"method": "balanceOf", "params": {"_owner": FROM}}
			})
		);
	}
}
