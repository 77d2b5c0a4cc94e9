use anyhow::Result;
use serde_json::Value;

use super::Context;
use crate::handler::TransactionResult;
use crate::rpc::IconRpc;

/// Run the call file `name` against the deployed `package` as a
/// transaction, and wait for it to succeed.
pub async fn invoke<R: IconRpc>(
	ctx: &Context<R>,
	package: &str,
	name: &str,
	limit: Option<u64>,
) -> Result<TransactionResult> {
	let signer = ctx.signer()?;
	let address = ctx.workspace.score_address(package, &ctx.network)?;
	let spec = ctx.workspace.call_spec(package, &ctx.network, name)?;

	let score = ctx.handler.score(&address);
	let tx_hash = score
		.invoke(signer, &spec.method, spec.params.clone(), limit, spec.value())
		.await?;
	let result = ctx.handler.ensure_result(&tx_hash, ctx.verbose).await?;

	println!("{}", serde_json::to_string_pretty(&result)?);
	Ok(result)
}

/// Run the call file `name` as a read-only query.
pub async fn call<R: IconRpc>(ctx: &Context<R>, package: &str, name: &str) -> Result<Value> {
	let address = ctx.workspace.score_address(package, &ctx.network)?;
	let spec = ctx.workspace.call_spec(package, &ctx.network, name)?;

	let response = ctx
		.handler
		.score(&address)
		.call(&spec.method, spec.params.clone())
		.await?;

	println!("{}", serde_json::to_string_pretty(&response)?);
	Ok(response)
}
