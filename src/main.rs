use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use icon_deploy::cli::{Cli, Command};
use icon_deploy::commands;
use icon_deploy::config::Config;
use icon_deploy::units;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	init_tracing(cli.verbose);
	let config = Config::load()?;
	let context = || commands::build_context(&cli, &config);

	match &cli.command {
		Command::Deploy {
			package,
			step_limit,
		} => {
			commands::deploy::deploy(&context()?, package, *step_limit).await?;
		}
		Command::Update {
			package,
			step_limit,
		} => {
			commands::deploy::update(&context()?, package, *step_limit).await?;
		}
		Command::Invoke {
			package,
			call,
			step_limit,
		} => {
			commands::call::invoke(&context()?, package, call, *step_limit).await?;
		}
		Command::Call { package, call } => {
			commands::call::call(&context()?, package, call).await?;
		}
		Command::Transfer {
			to,
			amount,
			step_limit,
		} => {
			let amount = units::parse_icx(amount)?;
			commands::transfer::transfer(&context()?, to, amount, *step_limit).await?;
		}
		Command::Fund {
			count,
			amount,
			save_dir,
			save_password,
		} => {
			let amount = units::parse_icx(amount)?;
			let ctx = context()?;
			match save_dir {
				Some(dir) => {
					let password = commands::new_keystore_password(save_password.as_deref(), dir)?;
					commands::transfer::fund(&ctx, *count, amount, Some((dir.as_path(), password.as_str())))
						.await?;
				}
				None => {
					commands::transfer::fund(&ctx, *count, amount, None).await?;
				}
			}
		}
		Command::Rlp { data } => commands::rlp::run(data)?,
	}
	Ok(())
}

/// `RUST_LOG` wins; otherwise this crate logs at info (debug with -v) and
/// dependencies only warn.
fn init_tracing(verbose: bool) {
	let level = if verbose { "debug" } else { "info" };
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("warn,icon_deploy={level}")));
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.try_init();
}
