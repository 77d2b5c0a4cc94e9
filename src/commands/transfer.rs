use std::path::Path;

use anyhow::{bail, Result};
use tracing::info;

use super::Context;
use crate::config::Config;
use crate::crypto;
use crate::handler::TransactionResult;
use crate::rpc::IconRpc;
use crate::signer::{KeyWallet, Signer};
use crate::units;

/// Send `amount` loop to `to` and wait for confirmation.
pub async fn transfer<R: IconRpc>(
	ctx: &Context<R>,
	to: &str,
	amount: u128,
	limit: Option<u64>,
) -> Result<TransactionResult> {
	if !crypto::is_valid_address(to) {
		bail!("invalid recipient address: {to}");
	}
	let signer = ctx.signer()?;
	info!("Transferring {} ICX to {to} ...", units::format_icx(amount));

	let tx_hash = ctx.handler.transfer(signer, to, amount, limit).await?;
	let result = ctx.handler.ensure_result(&tx_hash, ctx.verbose).await?;
	println!("Transferred {} ICX to {to}", units::format_icx(amount));
	println!("TX: {tx_hash}");
	Ok(result)
}

/// A freshly funded account.
pub struct FundedAccount {
	pub wallet: KeyWallet,
	pub tx_hash: String,
}

/// Create `count` new accounts and send each `amount` loop.  Only allowed
/// against local networks.  With `save` set, each key is written as an
/// encrypted keystore named after its address.
pub async fn fund<R: IconRpc>(
	ctx: &Context<R>,
	count: u32,
	amount: u128,
	save: Option<(&Path, &str)>,
) -> Result<Vec<FundedAccount>> {
	if !Config::is_local(&ctx.network) {
		bail!(
			"refusing to fund test accounts on '{}'; only local endpoints are allowed",
			ctx.network
		);
	}
	let signer = ctx.signer()?;

	let mut accounts = Vec::with_capacity(count as usize);
	for _ in 0..count {
		let wallet = KeyWallet::create();
		let tx_hash = ctx
			.handler
			.transfer(signer, wallet.address(), amount, None)
			.await?;
		ctx.handler.ensure_result(&tx_hash, ctx.verbose).await?;

		match save {
			Some((dir, password)) => {
				let path = dir.join(format!("{}.json", wallet.address()));
				wallet.store(&path, password)?;
				println!("{}  keystore={}", wallet.address(), path.display());
			}
			None => println!("{}  key={}", wallet.address(), wallet.private_key_hex()),
		}
		accounts.push(FundedAccount { wallet, tx_hash });
	}
	Ok(accounts)
}
