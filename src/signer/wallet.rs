use std::path::Path;

use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};

use super::{keystore, Signer, SignerError};
use crate::crypto;

/// A secp256k1 key pair held in memory.
pub struct KeyWallet {
	secp: Secp256k1<All>,
	secret: SecretKey,
	address: String,
}

impl KeyWallet {
	/// Generate a fresh random key pair.
	pub fn create() -> Self {
		let secp = Secp256k1::new();
		let secret = SecretKey::new(&mut rand::thread_rng());
		Self::with_secret(secp, secret)
	}

	pub fn from_private_key(bytes: &[u8]) -> Result<Self, SignerError> {
		let secret = SecretKey::from_slice(bytes)?;
		Ok(Self::with_secret(Secp256k1::new(), secret))
	}

	/// Unlock a keystore file and check that it holds the key for the
	/// address it claims.
	pub fn load(path: &Path, password: &str) -> Result<Self, SignerError> {
		let file = keystore::read(path)?;
		let key = keystore::decrypt(&file, password)?;
		let wallet = Self::from_private_key(&key)?;
		if wallet.address != file.address {
			return Err(SignerError::AddressMismatch {
				expected: file.address,
				actual: wallet.address,
			});
		}
		Ok(wallet)
	}

	/// Encrypt this key into a keystore file at `path`.
	pub fn store(&self, path: &Path, password: &str) -> Result<(), SignerError> {
		let file = keystore::encrypt(&self.secret.secret_bytes(), &self.address, password)?;
		keystore::write(path, &file)
	}

	pub fn private_key_hex(&self) -> String {
		hex::encode(self.secret.secret_bytes())
	}

	pub fn public_key(&self) -> PublicKey {
		PublicKey::from_secret_key(&self.secp, &self.secret)
	}

	fn with_secret(secp: Secp256k1<All>, secret: SecretKey) -> Self {
		let address = crypto::address_from_public_key(&PublicKey::from_secret_key(&secp, &secret));
		Self {
			secp,
			secret,
			address,
		}
	}
}

impl Signer for KeyWallet {
	fn address(&self) -> &str {
		&self.address
	}

	fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; 65], SignerError> {
		let msg = Message::from_digest(*digest);
		let (recovery_id, compact) = self
			.secp
			.sign_ecdsa_recoverable(&msg, &self.secret)
			.serialize_compact();

		let mut out = [0u8; 65];
		out[..64].copy_from_slice(&compact);
		out[64] = recovery_id.to_i32() as u8;
		Ok(out)
	}
}
