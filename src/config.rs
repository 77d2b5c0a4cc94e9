use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::handler::{PollPolicy, StepLimits};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	pub defaults: Defaults,
	pub transaction: TransactionConfig,
	/// Extra or overriding endpoints, merged over the built-in ones.
	pub endpoints: BTreeMap<String, Endpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
	pub endpoint: String,
	pub keystore: Option<PathBuf>,
	/// Directory holding `deploy/` and `calls/`, relative to the project root.
	pub config_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
	pub poll_retries: u32,
	pub poll_interval_secs: u64,
	pub invoke_step_limit: u64,
	pub transfer_step_limit: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
	pub url: String,
	pub nid: u64,
}

impl Default for Defaults {
	fn default() -> Self {
		Self {
			endpoint: "localhost".into(),
			keystore: None,
			config_dir: PathBuf::from("scripts/config"),
		}
	}
}

impl Default for TransactionConfig {
	fn default() -> Self {
		let poll = PollPolicy::default();
		let limits = StepLimits::default();
		Self {
			poll_retries: poll.attempts,
			poll_interval_secs: poll.interval.as_secs(),
			invoke_step_limit: limits.invoke,
			transfer_step_limit: limits.transfer,
		}
	}
}

impl TransactionConfig {
	pub fn poll_policy(&self) -> PollPolicy {
		PollPolicy {
			attempts: self.poll_retries,
			interval: Duration::from_secs(self.poll_interval_secs),
		}
	}

	pub fn step_limits(&self) -> StepLimits {
		StepLimits {
			invoke: self.invoke_step_limit,
			transfer: self.transfer_step_limit,
		}
	}
}

/// Networks known without any configuration.
const BUILTIN_ENDPOINTS: &[(&str, &str, u64)] = &[
	("mainnet", "https://ctz.solidwallet.io", 0x1),
	("lisbon", "https://lisbon.net.solidwallet.io", 0x2),
	("sejong", "https://sejong.net.solidwallet.io", 0x53),
	("berlin", "https://berlin.net.solidwallet.io", 0x7),
	("localhost", "http://localhost:9082", 0x3),
	("gochain", "http://localhost:9082", 0x3),
	("custom", "https://endpoint.convexus.netlib.re", 0x3),
];

/// Endpoints backed by a disposable local node.
const LOCAL_ENDPOINTS: &[&str] = &["localhost", "gochain"];

impl Config {
	/// Directory where CLI state is stored (~/.icon-deploy/).
	pub fn dir() -> Result<PathBuf> {
		dirs::home_dir()
			.map(|home| home.join(".icon-deploy"))
			.ok_or_else(|| anyhow!("could not determine home directory"))
	}

	/// Path to the config file.
	pub fn path() -> Result<PathBuf> {
		Ok(Self::dir()?.join("config.toml"))
	}

	/// Load config from disk, falling back to defaults if no file exists.
	pub fn load() -> Result<Self> {
		let path = Self::path()?;
		if path.exists() {
			let content = std::fs::read_to_string(&path)
				.with_context(|| format!("reading {}", path.display()))?;
			toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
		} else {
			Ok(Self::default())
		}
	}

	/// Resolve a named endpoint, preferring configured ones.
	pub fn endpoint(&self, name: &str) -> Result<Endpoint> {
		if let Some(ep) = self.endpoints.get(name) {
			return Ok(ep.clone());
		}
		BUILTIN_ENDPOINTS
			.iter()
			.find(|(n, ..)| *n == name)
			.map(|(_, url, nid)| Endpoint {
				url: (*url).to_owned(),
				nid: *nid,
			})
			.ok_or_else(|| anyhow!("Invalid endpoint '{name}'"))
	}

	pub fn is_local(name: &str) -> bool {
		LOCAL_ENDPOINTS.contains(&name)
	}
}
