use anyhow::{anyhow, Result};
use tracing::info;

use super::Context;
use crate::handler::TransactionResult;
use crate::package::JAVA_CONTENT_TYPE;
use crate::rpc::IconRpc;

/// Install `package` and record where it landed.  Returns the new SCORE
/// address.
pub async fn deploy<R: IconRpc>(ctx: &Context<R>, package: &str, limit: Option<u64>) -> Result<String> {
	let signer = ctx.signer()?;
	let (artifact, content) = ctx.workspace.read_artifact(package)?;
	let params = ctx.workspace.deploy_params(package, &ctx.network)?;
	info!("Deploying {package} from {} ...", artifact.display());

	let tx_hash = ctx
		.handler
		.install(signer, content, JAVA_CONTENT_TYPE, Some(params), limit)
		.await?;
	let result = ctx.handler.ensure_result(&tx_hash, ctx.verbose).await?;
	record(ctx, package, result)
}

/// Replace the code of an already deployed `package`.
pub async fn update<R: IconRpc>(ctx: &Context<R>, package: &str, limit: Option<u64>) -> Result<String> {
	let signer = ctx.signer()?;
	let address = ctx.workspace.score_address(package, &ctx.network)?;
	let (artifact, content) = ctx.workspace.read_artifact(package)?;
	let params = ctx.workspace.deploy_params(package, &ctx.network)?;
	info!("Updating {package} at {address} from {} ...", artifact.display());

	let tx_hash = ctx
		.handler
		.update(signer, &address, content, JAVA_CONTENT_TYPE, Some(params), limit)
		.await?;
	let result = ctx.handler.ensure_result(&tx_hash, ctx.verbose).await?;
	record(ctx, package, result)
}

fn record<R>(ctx: &Context<R>, package: &str, result: TransactionResult) -> Result<String> {
	let address = result
		.score_address
		.clone()
		.ok_or_else(|| anyhow!("transaction for {package} succeeded but returned no scoreAddress"))?;
	let path = ctx.workspace.save_deploy_record(package, &ctx.network, &result)?;

	println!("{package}: {address}");
	println!("Record: {}", path.display());
	Ok(address)
}
