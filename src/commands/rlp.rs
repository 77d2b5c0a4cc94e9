use anyhow::{Context, Result};
use serde_json::Value;

use crate::rlp;

/// Decode hex-encoded RLP into its JSON rendering.
pub fn decode_hex(data: &str) -> Result<Value> {
	let data = data.trim();
	let raw = hex::decode(data.strip_prefix("0x").unwrap_or(data)).context("input is not valid hex")?;
	let obj = rlp::decode(&raw).context("input is not a single RLP object")?;
	Ok(obj.to_json())
}

pub fn run(data: &str) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(&decode_hex(data)?)?);
	Ok(())
}
