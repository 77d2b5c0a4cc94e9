//! On-disk layout of contract packages.
//!
//! ```text
//! <root>/<javaPkg>/build/libs/<javaPkg>-<version>-<build>.jar
//! <config>/deploy/<package>/build.json
//! <config>/deploy/<package>/<network>/params.json
//! <config>/deploy/<package>/<network>/deploy.json
//! <config>/calls/<package>/<network>/<name>.json
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::handler::TransactionResult;
use crate::transaction::Params;
use crate::units;

/// Content type of compiled Java contracts.
pub const JAVA_CONTENT_TYPE: &str = "application/java";

#[derive(Debug, Error)]
pub enum PackageError {
	#[error("no deploy record for {package} on {network} at {path}; deploy it first")]
	MissingDeployRecord {
		package: String,
		network: String,
		path: PathBuf,
	},
	#[error("contract artifact not found: {0}; build the package first")]
	MissingArtifact(PathBuf),
	#[error("missing file: {0}")]
	MissingFile(PathBuf),
	#[error("cannot access {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("invalid JSON in {path}: {source}")]
	Json {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
	#[error("deploy record {0} has no scoreAddress")]
	NoScoreAddress(PathBuf),
	#[error("invalid value in {path}: {reason}")]
	InvalidValue { path: PathBuf, reason: String },
}

/// Build coordinates of a package, from `build.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BuildMeta {
	#[serde(rename = "javaPkg")]
	pub java_pkg: String,
	#[serde(default)]
	pub version: Option<String>,
	pub build: String,
}

impl BuildMeta {
	/// File name of the jar produced by the build.
	pub fn jar_name(&self) -> String {
		match self.version.as_deref().filter(|v| !v.is_empty()) {
			Some(version) => format!("{}-{version}-{}.jar", self.java_pkg, self.build),
			None => format!("{}-{}.jar", self.java_pkg, self.build),
		}
	}
}

/// A named method call with its arguments, from `calls/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallSpec {
	pub method: String,
	#[serde(default)]
	pub params: Option<Params>,
	/// Loop to attach, as a `0x` hex string.
	#[serde(default)]
	pub value: Option<String>,
}

/// Paths of one project checkout.
#[derive(Debug, Clone)]
pub struct Workspace {
	root: PathBuf,
	config_dir: PathBuf,
}

impl Workspace {
	pub fn new(root: impl Into<PathBuf>, config_dir: impl AsRef<Path>) -> Self {
		let root = root.into();
		let config_dir = root.join(config_dir);
		Self { root, config_dir }
	}

	pub fn build_meta(&self, package: &str) -> Result<BuildMeta, PackageError> {
		read_json(&self.package_dir(package).join("build.json"))
	}

	pub fn artifact_path(&self, meta: &BuildMeta) -> PathBuf {
		self.root
			.join(&meta.java_pkg)
			.join("build")
			.join("libs")
			.join(meta.jar_name())
	}

	/// Locate and read the compiled jar of `package`.
	pub fn read_artifact(&self, package: &str) -> Result<(PathBuf, Vec<u8>), PackageError> {
		let meta = self.build_meta(package)?;
		let path = self.artifact_path(&meta);
		match std::fs::read(&path) {
			Ok(bytes) => Ok((path, bytes)),
			Err(e) if e.kind() == ErrorKind::NotFound => Err(PackageError::MissingArtifact(path)),
			Err(source) => Err(PackageError::Io { path, source }),
		}
	}

	/// Constructor parameters for deploying `package` on `network`.
	pub fn deploy_params(&self, package: &str, network: &str) -> Result<Params, PackageError> {
		read_json(&self.network_dir(package, network).join("params.json"))
	}

	pub fn deploy_record_path(&self, package: &str, network: &str) -> PathBuf {
		self.network_dir(package, network).join("deploy.json")
	}

	pub fn deploy_record(&self, package: &str, network: &str) -> Result<TransactionResult, PackageError> {
		let path = self.deploy_record_path(package, network);
		read_json(&path).map_err(|e| match e {
			PackageError::MissingFile(path) => PackageError::MissingDeployRecord {
				package: package.to_owned(),
				network: network.to_owned(),
				path,
			},
			other => other,
		})
	}

	/// Address of the deployed `package`, from its deploy record.
	pub fn score_address(&self, package: &str, network: &str) -> Result<String, PackageError> {
		self.deploy_record(package, network)?
			.score_address
			.ok_or_else(|| PackageError::NoScoreAddress(self.deploy_record_path(package, network)))
	}

	/// Write the deploy record via a temporary file and a rename, so a
	/// crash never leaves a half-written record behind.
	pub fn save_deploy_record(
		&self,
		package: &str,
		network: &str,
		result: &TransactionResult,
	) -> Result<PathBuf, PackageError> {
		let path = self.deploy_record_path(package, network);
		let tmp = path.with_extension("json.tmp");
		let io = |path: &Path| {
			let path = path.to_owned();
			move |source| PackageError::Io { path, source }
		};

		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent).map_err(io(parent))?;
		}
		let json = serde_json::to_string_pretty(result).map_err(|source| PackageError::Json {
			path: path.clone(),
			source,
		})?;
		std::fs::write(&tmp, json).map_err(io(&tmp))?;
		std::fs::rename(&tmp, &path).map_err(io(&path))?;
		Ok(path)
	}

	pub fn call_spec(&self, package: &str, network: &str, name: &str) -> Result<CallSpec, PackageError> {
		let path = self
			.config_dir
			.join("calls")
			.join(package)
			.join(network)
			.join(format!("{name}.json"));
		let spec: CallSpec = read_json(&path)?;
		if let Some(value) = &spec.value {
			units::parse_hex(value).map_err(|e| PackageError::InvalidValue {
				path,
				reason: e.to_string(),
			})?;
		}
		Ok(spec)
	}

	fn package_dir(&self, package: &str) -> PathBuf {
		self.config_dir.join("deploy").join(package)
	}

	fn network_dir(&self, package: &str, network: &str) -> PathBuf {
		self.package_dir(package).join(network)
	}
}

impl CallSpec {
	/// Attached value in loop; zero when absent.
	pub fn value(&self) -> u128 {
		self.value
			.as_deref()
			.and_then(|v| units::parse_hex(v).ok())
			.unwrap_or(0)
	}
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PackageError> {
	let content = match std::fs::read_to_string(path) {
		Ok(c) => c,
		Err(e) if e.kind() == ErrorKind::NotFound => {
			return Err(PackageError::MissingFile(path.to_owned()))
		}
		Err(source) => {
			return Err(PackageError::Io {
				path: path.to_owned(),
				source,
			})
		}
	};
	serde_json::from_str(&content).map_err(|source| PackageError::Json {
		path: path.to_owned(),
		source,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn write(path: &Path, content: &str) {
		std::fs::create_dir_all(path.parent().unwrap()).unwrap();
		std::fs::write(path, content).unwrap();
	}

	fn workspace() -> (tempfile::TempDir, Workspace) {
		let dir = tempfile::tempdir().unwrap();
		let ws = Workspace::new(dir.path(), "scripts/config");
		(dir, ws)
	}

	#[test]
	fn jar_names() {
		let mut meta = BuildMeta {
			java_pkg: "Convexus-Pool".into(),
			version: Some("0.9.0".into()),
			build: "optimized".into(),
		};
		assert_eq!(meta.jar_name(), "Convexus-Pool-0.9.0-optimized.jar");
		meta.version = Some(String::new());
		assert_eq!(meta.jar_name(), "Convexus-Pool-optimized.jar");
		meta.version = None;
		assert_eq!(meta.jar_name(), "Convexus-Pool-optimized.jar");
	}

	#[test]
	fn artifact_is_located_from_build_meta() {
		let (dir, ws) = workspace();
		write(
			&dir.path().join("scripts/config/deploy/pool/build.json"),
			r#"{"javaPkg": "Convexus-Pool", "build": "debug"}"#,
		);
		write(&dir.path().join("Convexus-Pool/build/libs/Convexus-Pool-debug.jar"), "PK");

		let (path, bytes) = ws.read_artifact("pool").unwrap();
		assert!(path.ends_with("Convexus-Pool/build/libs/Convexus-Pool-debug.jar"));
		assert_eq!(bytes, b"PK");
	}

	#[test]
	fn missing_artifact_is_reported() {
		let (dir, ws) = workspace();
		write(
			&dir.path().join("scripts/config/deploy/pool/build.json"),
			r#"{"javaPkg": "Convexus-Pool", "version": "1.0", "build": "optimized"}"#,
		);
		assert!(matches!(ws.read_artifact("pool"), Err(PackageError::MissingArtifact(_))));
		assert!(matches!(ws.read_artifact("other"), Err(PackageError::MissingFile(_))));
	}

	#[test]
	fn deploy_record_roundtrip() {
		let (_dir, ws) = workspace();
		assert!(matches!(
			ws.score_address("pool", "sejong"),
			Err(PackageError::MissingDeployRecord { .. })
		));

		let result: TransactionResult = serde_json::from_value(json!({
			"status": "0x1",
			"scoreAddress": "cx1d6463e9b5d3d3a7e1d4a7c3a54a3cf2e2a9f0a1",
			"blockHeight": "0x10"
		}))
		.unwrap();
		let path = ws.save_deploy_record("pool", "sejong", &result).unwrap();
		assert!(path.exists());
		assert!(!path.with_extension("json.tmp").exists());

		assert_eq!(
			ws.score_address("pool", "sejong").unwrap(),
			"cx1d6463e9b5d3d3a7e1d4a7c3a54a3cf2e2a9f0a1"
		);
		let raw: serde_json::Value =
			serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
		assert_eq!(raw["blockHeight"], "0x10");
	}

	#[test]
	fn record_without_address() {
		let (dir, ws) = workspace();
		write(
			&dir.path().join("scripts/config/deploy/pool/sejong/deploy.json"),
			r#"{"status": "0x1"}"#,
		);
		assert!(matches!(
			ws.score_address("pool", "sejong"),
			Err(PackageError::NoScoreAddress(_))
		));
	}

	#[test]
	fn call_specs() {
		let (dir, ws) = workspace();
		write(
			&dir.path().join("scripts/config/calls/pool/sejong/deposit.json"),
			r#"{"method": "deposit", "params": {"to": "hx1"}, "value": "0x6f05b59d3b20000"}"#,
		);
		write(
			&dir.path().join("scripts/config/calls/pool/sejong/name.json"),
			r#"{"method": "name"}"#,
		);
		write(
			&dir.path().join("scripts/config/calls/pool/sejong/bad.json"),
			r#"{"method": "x", "value": "12"}"#,
		);

		let deposit = ws.call_spec("pool", "sejong", "deposit").unwrap();
		assert_eq!(deposit.method, "deposit");
		assert_eq!(deposit.value(), 5 * 10u128.pow(17));
		assert_eq!(deposit.params.unwrap()["to"], "hx1");

		let name = ws.call_spec("pool", "sejong", "name").unwrap();
		assert!(name.params.is_none());
		assert_eq!(name.value(), 0);

		assert!(matches!(
			ws.call_spec("pool", "sejong", "bad"),
			Err(PackageError::InvalidValue { .. })
		));
	}

	#[test]
	fn malformed_json_is_reported() {
		let (dir, ws) = workspace();
		write(&dir.path().join("scripts/config/deploy/pool/sejong/params.json"), "{");
		assert!(matches!(
			ws.deploy_params("pool", "sejong"),
			Err(PackageError::Json { .. })
		));
	}
}
