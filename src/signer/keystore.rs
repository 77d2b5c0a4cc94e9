//! Version 3 JSON keystores as written by ICON wallets: a scrypt (or
//! PBKDF2-HMAC-SHA256) derived key, AES-128-CTR ciphertext and a
//! Keccak-256 MAC over `derived[16..32] || ciphertext`.

use std::path::Path;

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::Hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::SignerError;
use crate::crypto;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

const CIPHER: &str = "aes-128-ctr";
const DERIVED_KEY_LEN: usize = 32;

// Parameters used when writing new keystores.
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeystoreFile {
	pub address: String,
	#[serde(alias = "Crypto")]
	pub crypto: CryptoSection,
	#[serde(default)]
	pub id: String,
	pub version: u32,
	#[serde(rename = "coinType", default, skip_serializing_if = "Option::is_none")]
	pub coin_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoSection {
	pub cipher: String,
	pub cipherparams: CipherParams,
	pub ciphertext: String,
	pub kdf: String,
	pub kdfparams: KdfParams,
	pub mac: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CipherParams {
	pub iv: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KdfParams {
	Scrypt {
		dklen: usize,
		n: u64,
		r: u32,
		p: u32,
		salt: String,
	},
	Pbkdf2 {
		c: u32,
		dklen: usize,
		prf: String,
		salt: String,
	},
}

pub fn read(path: &Path) -> Result<KeystoreFile, SignerError> {
	let content = std::fs::read_to_string(path).map_err(|source| SignerError::Io {
		path: path.to_owned(),
		source,
	})?;
	// Some wallets write a UTF-8 BOM.
	Ok(serde_json::from_str(content.trim_start_matches('\u{feff}'))?)
}

pub fn write(path: &Path, file: &KeystoreFile) -> Result<(), SignerError> {
	let io = |source| SignerError::Io {
		path: path.to_owned(),
		source,
	};
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).map_err(io)?;
	}
	std::fs::write(path, serde_json::to_string_pretty(file)?).map_err(io)
}

/// Recover the raw private key, rejecting a wrong password via the MAC.
pub fn decrypt(file: &KeystoreFile, password: &str) -> Result<Vec<u8>, SignerError> {
	let c = &file.crypto;
	if c.cipher != CIPHER {
		return Err(SignerError::Unsupported(format!("cipher {}", c.cipher)));
	}

	let derived = derive_key(&c.kdfparams, password)?;
	let ciphertext = hex::decode(&c.ciphertext)?;

	let mac = crypto::keccak256(&[&derived[16..32], &ciphertext]);
	if !hex::encode(mac).eq_ignore_ascii_case(&c.mac) {
		return Err(SignerError::WrongPassword);
	}

	let iv = hex::decode(&c.cipherparams.iv)?;
	let mut plain = ciphertext;
	apply_cipher(&derived[..16], &iv, &mut plain)?;
	Ok(plain)
}

/// Build a scrypt keystore for `secret`.
pub fn encrypt(secret: &[u8], address: &str, password: &str) -> Result<KeystoreFile, SignerError> {
	let mut salt = [0u8; 32];
	let mut iv = [0u8; 16];
	rand::thread_rng().fill_bytes(&mut salt);
	rand::thread_rng().fill_bytes(&mut iv);

	let kdfparams = KdfParams::Scrypt {
		dklen: DERIVED_KEY_LEN,
		n: 1 << SCRYPT_LOG_N,
		r: SCRYPT_R,
		p: SCRYPT_P,
		salt: hex::encode(salt),
	};
	encrypt_with(secret, address, password, kdfparams, &iv)
}

fn encrypt_with(
	secret: &[u8],
	address: &str,
	password: &str,
	kdfparams: KdfParams,
	iv: &[u8],
) -> Result<KeystoreFile, SignerError> {
	let derived = derive_key(&kdfparams, password)?;
	let mut ciphertext = secret.to_vec();
	apply_cipher(&derived[..16], iv, &mut ciphertext)?;
	let mac = crypto::keccak256(&[&derived[16..32], &ciphertext]);
	let kdf = match kdfparams {
		KdfParams::Scrypt { .. } => "scrypt",
		KdfParams::Pbkdf2 { .. } => "pbkdf2",
	};

	Ok(KeystoreFile {
		address: address.to_owned(),
		crypto: CryptoSection {
			cipher: CIPHER.into(),
			cipherparams: CipherParams { iv: hex::encode(iv) },
			ciphertext: hex::encode(&ciphertext),
			kdf: kdf.into(),
			kdfparams,
			mac: hex::encode(mac),
		},
		id: uuid::Uuid::new_v4().to_string(),
		version: 3,
		coin_type: Some("icx".into()),
	})
}

fn derive_key(params: &KdfParams, password: &str) -> Result<Vec<u8>, SignerError> {
	let (dklen, salt) = match params {
		KdfParams::Scrypt { dklen, salt, .. } | KdfParams::Pbkdf2 { dklen, salt, .. } => {
			(*dklen, hex::decode(salt)?)
		}
	};
	if dklen < DERIVED_KEY_LEN {
		return Err(SignerError::Unsupported(format!("derived key length {dklen}")));
	}

	let mut out = vec![0u8; dklen];
	match params {
		KdfParams::Scrypt { n, r, p, .. } => {
			if !n.is_power_of_two() || *n < 2 {
				return Err(SignerError::Format(format!("scrypt n={n} is not a power of two")));
			}
			let log_n = n.trailing_zeros() as u8;
			let params = scrypt::Params::new(log_n, *r, *p, dklen)
				.map_err(|e| SignerError::Format(format!("scrypt params: {e}")))?;
			scrypt::scrypt(password.as_bytes(), &salt, &params, &mut out)
				.map_err(|e| SignerError::Format(format!("scrypt: {e}")))?;
		}
		KdfParams::Pbkdf2 { c, prf, .. } => {
			if prf != "hmac-sha256" {
				return Err(SignerError::Unsupported(format!("pbkdf2 prf {prf}")));
			}
			pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), &salt, *c, &mut out)
				.map_err(|e| SignerError::Format(format!("pbkdf2: {e}")))?;
		}
	}
	Ok(out)
}

fn apply_cipher(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<(), SignerError> {
	let mut cipher = Aes128Ctr::new_from_slices(key, iv)
		.map_err(|_| SignerError::Format(format!("iv must be 16 bytes, got {}", iv.len())))?;
	cipher.apply_keystream(buf);
	Ok(())
}
