use secp256k1::PublicKey;
use sha3::{Digest, Keccak256, Sha3_256};

// -- Hashes --

/// SHA3-256 (FIPS 202), used for transaction hashes and addresses.
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
	Sha3_256::digest(data).into()
}

/// Keccak-256 (pre-standard padding), used only by keystore MACs.
pub fn keccak256(parts: &[&[u8]]) -> [u8; 32] {
	let mut h = Keccak256::new();
	for part in parts {
		h.update(part);
	}
	h.finalize().into()
}

// -- Addresses --

/// Length of an address body in hex characters (20 bytes).
const ADDRESS_HEX_LEN: usize = 40;

/// Derive the `hx...` EOA address: the last 20 bytes of SHA3-256 over the
/// uncompressed public key without its 0x04 prefix.
pub fn address_from_public_key(key: &PublicKey) -> String {
	let uncompressed = key.serialize_uncompressed();
	let digest = sha3_256(&uncompressed[1..]);
	format!("hx{}", hex::encode(&digest[12..]))
}

/// True for `hx`/`cx` followed by 40 lowercase hex digits.
pub fn is_valid_address(addr: &str) -> bool {
	let Some(body) = addr.strip_prefix("hx").or_else(|| addr.strip_prefix("cx")) else {
		return false;
	};
	body.len() == ADDRESS_HEX_LEN
		&& body
			.bytes()
			.all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
	use super::*;
	use secp256k1::{Secp256k1, SecretKey};

	#[test]
	fn sha3_of_empty_input() {
		assert_eq!(
			hex::encode(sha3_256(b"")),
			"a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
		);
	}

	#[test]
	fn keccak_differs_from_sha3() {
		assert_eq!(
			hex::encode(keccak256(&[b""])),
			"c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
		);
		assert_eq!(keccak256(&[b"ab", b"c"]), keccak256(&[b"abc"]));
	}

	#[test]
	fn derived_address_shape() {
		let secp = Secp256k1::new();
		let sk = SecretKey::from_slice(&[7u8; 32]).unwrap();
		let addr = address_from_public_key(&PublicKey::from_secret_key(&secp, &sk));
		assert!(addr.starts_with("hx"));
		assert!(is_valid_address(&addr), "{addr}");
	}

	#[test]
	fn address_validation() {
		assert!(is_valid_address("cx0000000000000000000000000000000000000000"));
		assert!(is_valid_address("hxbe258ceb872e08851f1f59694dac2558708ece11"));
		assert!(!is_valid_address("0xbe258ceb872e08851f1f59694dac2558708ece11"));
		assert!(!is_valid_address("hxbe258ceb872e08851f1f59694dac2558708ece1"));
		assert!(!is_valid_address("hxBE258CEB872E08851F1F59694DAC2558708ECE11"));
	}
}
