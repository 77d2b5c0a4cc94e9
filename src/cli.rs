use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
	name = "icon-deploy",
	about = "Deploy, update and invoke SCOREs on ICON networks.",
	version
)]
pub struct Cli {
	/// Target endpoint: mainnet, lisbon, sejong, berlin, localhost, gochain,
	/// custom, or one defined in the config file.
	#[arg(short, long, global = true)]
	pub endpoint: Option<String>,

	/// Keystore file used to sign transactions.
	#[arg(short, long, global = true)]
	pub keystore: Option<PathBuf>,

	/// Keystore password. Prompted for when omitted.
	#[arg(short, long, global = true)]
	pub password: Option<String>,

	/// Project root containing the contract packages.
	#[arg(long, default_value = ".", global = true)]
	pub root: PathBuf,

	/// Print full transaction results and debug logs.
	#[arg(short, long, global = true)]
	pub verbose: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
	/// Deploy a package and record its SCORE address.
	Deploy {
		/// Package name under <config>/deploy/.
		package: String,

		/// Step limit. Estimated by the node when omitted.
		#[arg(long)]
		step_limit: Option<u64>,
	},

	/// Update the code of a previously deployed package.
	Update {
		package: String,

		#[arg(long)]
		step_limit: Option<u64>,
	},

	/// Invoke a state-changing method described by a call file.
	Invoke {
		package: String,

		/// Call file name under <config>/calls/<package>/<network>/ (without .json).
		call: String,

		/// Step limit. Defaults to the configured invoke ceiling.
		#[arg(long)]
		step_limit: Option<u64>,
	},

	/// Run a read-only call described by a call file.
	Call {
		package: String,

		call: String,
	},

	/// Send ICX to an address.
	Transfer {
		/// Recipient address (hx... or cx...).
		to: String,

		/// Amount in ICX, e.g. 1.5.
		amount: String,

		#[arg(long)]
		step_limit: Option<u64>,
	},

	/// Create and fund throwaway accounts on a local network.
	Fund {
		/// Number of accounts to create.
		#[arg(long, default_value = "2")]
		count: u32,

		/// ICX sent to each account.
		#[arg(long, default_value = "1")]
		amount: String,

		/// Write an encrypted keystore per account into this directory.
		#[arg(long)]
		save_dir: Option<PathBuf>,

		/// Password for the saved keystores. Prompted for when omitted;
		/// never taken from --password.
		#[arg(long, requires = "save_dir")]
		save_password: Option<String>,
	},

	/// Decode a hex-encoded RLP payload.
	Rlp {
		/// Hex data, with or without 0x prefix.
		data: String,
	},
}

impl Command {
	/// Whether the command signs transactions.
	pub fn needs_signer(&self) -> bool {
		match self {
			Self::Deploy { .. }
			| Self::Update { .. }
			| Self::Invoke { .. }
			| Self::Transfer { .. }
			| Self::Fund { .. } => true,
			Self::Call { .. } | Self::Rlp { .. } => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cli_is_well_formed() {
		use clap::CommandFactory;
		Cli::command().debug_assert();
	}

	#[test]
	fn global_flags_after_subcommand() {
		let cli = Cli::try_parse_from([
			"icon-deploy",
			"invoke",
			"pool",
			"initialize",
			"-e",
			"sejong",
			"-k",
			"operator.icx",
			"--step-limit",
			"5000",
		])
		.unwrap();
		assert_eq!(cli.endpoint.as_deref(), Some("sejong"));
		assert_eq!(cli.keystore, Some(PathBuf::from("operator.icx")));
		match cli.command {
			Command::Invoke {
				package,
				call,
				step_limit,
			} => {
				assert_eq!(package, "pool");
				assert_eq!(call, "initialize");
				assert_eq!(step_limit, Some(5000));
			}
			_ => panic!("expected invoke"),
		}
	}

	#[test]
	fn fund_password_is_separate_from_signer_password() {
		let cli = Cli::try_parse_from([
			"icon-deploy",
			"fund",
			"-p",
			"operator",
			"--save-dir",
			"keys",
			"--save-password",
			"throwaway",
		])
		.unwrap();
		assert_eq!(cli.password.as_deref(), Some("operator"));
		match cli.command {
			Command::Fund {
				save_dir,
				save_password,
				..
			} => {
				assert_eq!(save_dir, Some(PathBuf::from("keys")));
				assert_eq!(save_password.as_deref(), Some("throwaway"));
			}
			_ => panic!("expected fund"),
		}

		assert!(Cli::try_parse_from(["icon-deploy", "fund", "--save-password", "x"]).is_err());
	}

	#[test]
	fn read_only_commands_do_not_sign() {
		let call = Cli::try_parse_from(["icon-deploy", "call", "pool", "name"]).unwrap();
		assert!(!call.command.needs_signer());
		let deploy = Cli::try_parse_from(["icon-deploy", "deploy", "pool"]).unwrap();
		assert!(deploy.command.needs_signer());
	}
}
