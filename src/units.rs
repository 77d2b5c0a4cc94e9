//! Conversions between loop integers, ICX decimal strings and the `0x`
//! hex strings used on the wire.

use anyhow::{anyhow, bail, Result};

/// Number of loop in one ICX.
pub const LOOP_PER_ICX: u128 = 1_000_000_000_000_000_000;

const ICX_DECIMALS: usize = 18;

/// Format a loop amount as ICX without trailing zeros (`5*10^17` -> `0.5`).
pub fn format_icx(loop_amount: u128) -> String {
	let whole = loop_amount / LOOP_PER_ICX;
	let frac = loop_amount % LOOP_PER_ICX;
	if frac == 0 {
		return whole.to_string();
	}
	let digits = format!("{frac:0width$}", width = ICX_DECIMALS);
	format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Parse an ICX decimal string (`"1"`, `"0.25"`) into loop.
pub fn parse_icx(s: &str) -> Result<u128> {
	let s = s.trim();
	let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
	if whole.is_empty() && frac.is_empty() {
		bail!("empty ICX amount");
	}
	if frac.len() > ICX_DECIMALS {
		bail!("ICX amount {s} has more than {ICX_DECIMALS} decimal places");
	}
	let parse = |part: &str| -> Result<u128> {
		if part.is_empty() {
			return Ok(0);
		}
		if !part.bytes().all(|b| b.is_ascii_digit()) {
			bail!("invalid ICX amount: {s}");
		}
		part.parse().map_err(|e| anyhow!("invalid ICX amount {s}: {e}"))
	};
	let scale = 10u128.pow((ICX_DECIMALS - frac.len()) as u32);
	let (whole, frac) = (parse(whole)?, parse(frac)?);
	whole
		.checked_mul(LOOP_PER_ICX)
		.and_then(|w| frac.checked_mul(scale)?.checked_add(w))
		.ok_or_else(|| anyhow!("ICX amount out of range: {s}"))
}

/// Parse a `0x`-prefixed hex integer.
pub fn parse_hex(s: &str) -> Result<u128> {
	let digits = s
		.strip_prefix("0x")
		.ok_or_else(|| anyhow!("expected 0x-prefixed hex integer, got {s:?}"))?;
	u128::from_str_radix(digits, 16).map_err(|e| anyhow!("invalid hex integer {s:?}: {e}"))
}

pub fn to_hex(n: u128) -> String {
	format!("{n:#x}")
}
