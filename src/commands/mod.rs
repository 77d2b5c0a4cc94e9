pub mod call;
pub mod deploy;
pub mod rlp;
pub mod transfer;

use std::path::Path;

use anyhow::{anyhow, bail, Context as _, Result};
use tracing::info;

use crate::cli::Cli;
use crate::config::Config;
use crate::handler::TxHandler;
use crate::package::Workspace;
use crate::rpc::RpcClient;
use crate::signer::{KeyWallet, Signer};

/// Everything a command needs for one run: the target network, the
/// handler talking to it, the project layout and the signing key.
pub struct Context<R> {
	pub network: String,
	pub handler: TxHandler<R>,
	pub workspace: Workspace,
	pub verbose: bool,
	signer: Option<Box<dyn Signer>>,
}

impl<R> Context<R> {
	pub fn new(network: impl Into<String>, handler: TxHandler<R>, workspace: Workspace) -> Self {
		Self {
			network: network.into(),
			handler,
			workspace,
			verbose: false,
			signer: None,
		}
	}

	pub fn with_signer(mut self, signer: Box<dyn Signer>) -> Self {
		self.signer = Some(signer);
		self
	}

	pub fn with_verbose(mut self, verbose: bool) -> Self {
		self.verbose = verbose;
		self
	}

	pub fn signer(&self) -> Result<&dyn Signer> {
		self.signer
			.as_deref()
			.ok_or_else(|| anyhow!("this command needs a keystore"))
	}
}

/// Build the run context from CLI flags and config.  The keystore is only
/// unlocked for commands that sign.
pub fn build_context(cli: &Cli, config: &Config) -> Result<Context<RpcClient>> {
	let network = cli
		.endpoint
		.clone()
		.unwrap_or_else(|| config.defaults.endpoint.clone());
	let endpoint = config.endpoint(&network)?;
	info!(network = %network, url = %endpoint.url, nid = endpoint.nid, "using endpoint");

	let handler = TxHandler::new(RpcClient::new(&endpoint.url), endpoint.nid)
		.with_poll_policy(config.transaction.poll_policy())
		.with_step_limits(config.transaction.step_limits());
	let workspace = Workspace::new(&cli.root, &config.defaults.config_dir);

	let ctx = Context::new(network, handler, workspace).with_verbose(cli.verbose);
	if cli.command.needs_signer() {
		Ok(ctx.with_signer(Box::new(resolve_signer(cli, config)?)))
	} else {
		Ok(ctx)
	}
}

/// Unlock the keystore from the CLI flag or config, prompting for the
/// password when it was not given.
pub fn resolve_signer(cli: &Cli, config: &Config) -> Result<KeyWallet> {
	let path = cli
		.keystore
		.as_deref()
		.or(config.defaults.keystore.as_deref())
		.ok_or_else(|| {
			anyhow!("No keystore configured. Pass --keystore <path> or set defaults.keystore in the config file")
		})?;

	let password = resolve_password(cli, path)?;
	let wallet = KeyWallet::load(path, &password)?;
	info!(address = wallet.address(), "loaded keystore {}", path.display());
	Ok(wallet)
}

/// The `--password` flag, or an interactive prompt naming `keystore`.
pub fn resolve_password(cli: &Cli, keystore: &Path) -> Result<String> {
	match &cli.password {
		Some(p) => Ok(p.clone()),
		None => rpassword::prompt_password(format!("Password for {}: ", keystore.display()))
			.context("reading keystore password"),
	}
}

/// Password for keystores created under `dir`: `given`, or one typed twice
/// at a prompt.  The signer's `--password` is never reused here.
pub fn new_keystore_password(given: Option<&str>, dir: &Path) -> Result<String> {
	if let Some(p) = given {
		return Ok(p.to_owned());
	}
	let password = rpassword::prompt_password(format!(
		"Password for the new keystores in {}: ",
		dir.display()
	))
	.context("reading new keystore password")?;
	let repeat = rpassword::prompt_password("Repeat password for the new keystores: ")
		.context("reading new keystore password")?;
	if password != repeat {
		bail!("new keystore passwords do not match");
	}
	Ok(password)
}
