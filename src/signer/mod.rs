pub mod keystore;
pub mod wallet;

use std::path::PathBuf;

use thiserror::Error;

pub use wallet::KeyWallet;

/// Anything that can sign ICON transaction hashes for one address.
pub trait Signer: Send + Sync {
	/// The `hx...` address this signer controls.
	fn address(&self) -> &str;

	/// Produce a 65-byte recoverable signature (`r || s || recovery_id`)
	/// over a 32-byte digest.
	fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; 65], SignerError>;
}

#[derive(Debug, Error)]
pub enum SignerError {
	#[error("cannot access keystore {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("malformed keystore: {0}")]
	Format(String),
	#[error("unsupported keystore {0}")]
	Unsupported(String),
	#[error("wrong keystore password")]
	WrongPassword,
	#[error("keystore address {expected} does not match its key ({actual})")]
	AddressMismatch { expected: String, actual: String },
	#[error("invalid private key: {0}")]
	InvalidKey(#[from] secp256k1::Error),
}

impl From<serde_json::Error> for SignerError {
	fn from(e: serde_json::Error) -> Self {
		Self::Format(e.to_string())
	}
}

impl From<hex::FromHexError> for SignerError {
	fn from(e: hex::FromHexError) -> Self {
		Self::Format(e.to_string())
	}
}
