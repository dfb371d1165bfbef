//! Configuration for the deployment orchestrator.
//!
//! Configuration is loaded from a TOML file and validated before anything
//! touches the chain. `${VAR}` references (with optional `${VAR:-default}`
//! fallbacks) are resolved against the environment first, so secrets like
//! the signing key never live in the file itself. Step program files go
//! through the same expansion, which lets launch parameters vary per
//! environment without editing the program.

pub mod program;

use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	/// Chain endpoint and confirmation settings.
	pub chain: ChainConfig,
	/// Signing account.
	pub signer: SignerConfig,
	/// Compiled artifact lookup.
	#[serde(default)]
	pub artifacts: ArtifactsConfig,
	/// Locations of the registry, ledger and checkpoint files.
	#[serde(default)]
	pub state: StateConfig,
}

/// Chain endpoint and confirmation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
	/// HTTP RPC endpoint.
	pub rpc_url: Url,
	/// Upper bound, in seconds, on waiting for any single transaction to
	/// reach its required confirmation depth.
	#[serde(default = "default_confirmation_timeout_secs")]
	pub confirmation_timeout_secs: u64,
}

impl ChainConfig {
	pub fn confirmation_timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.confirmation_timeout_secs)
	}
}

/// The account that signs every transaction of a run.
#[derive(Clone, Deserialize)]
pub struct SignerConfig {
	/// Hex-encoded private key, typically supplied as `${PRIVATE_KEY}`.
	pub private_key: String,
}

// Keeps the key out of debug output and error messages.
impl std::fmt::Debug for SignerConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SignerConfig")
			.field("private_key", &"***")
			.finish()
	}
}

/// Where compiled contract artifacts live.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
	/// Root of the artifact tree, laid out as
	/// `{root}/{file}.sol/{Contract}.json`.
	#[serde(default = "default_artifacts_root")]
	pub root: PathBuf,
}

impl Default for ArtifactsConfig {
	fn default() -> Self {
		Self {
			root: default_artifacts_root(),
		}
	}
}

/// Locations of the files a run reads and writes.
#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
	/// Full registry view: alias to deployment record.
	#[serde(default = "default_registry_file")]
	pub registry_file: PathBuf,
	/// Compact registry view: alias to address.
	#[serde(default = "default_address_list_file")]
	pub address_list_file: PathBuf,
	/// Append-only JSON-lines transaction ledger.
	#[serde(default = "default_ledger_file")]
	pub ledger_file: PathBuf,
	/// Run checkpoint used to resume interrupted runs.
	#[serde(default = "default_checkpoint_file")]
	pub checkpoint_file: PathBuf,
}

impl Default for StateConfig {
	fn default() -> Self {
		Self {
			registry_file: default_registry_file(),
			address_list_file: default_address_list_file(),
			ledger_file: default_ledger_file(),
			checkpoint_file: default_checkpoint_file(),
		}
	}
}

impl Config {
	/// Loads and validates configuration from a TOML file, resolving
	/// `${VAR}` references against the environment.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path)?;
		text.parse()
	}

	fn validate(&self) -> Result<(), ConfigError> {
		match self.chain.rpc_url.scheme() {
			"http" | "https" => {},
			other => {
				return Err(ConfigError::Validation(format!(
					"rpc_url must be http or https, got {other}"
				)));
			},
		}
		if self.chain.confirmation_timeout_secs == 0 {
			return Err(ConfigError::Validation(
				"confirmation_timeout_secs must be greater than 0".into(),
			));
		}
		if self.signer.private_key.trim().is_empty() {
			return Err(ConfigError::Validation(
				"signer private_key cannot be empty".into(),
			));
		}
		if self.artifacts.root.as_os_str().is_empty() {
			return Err(ConfigError::Validation(
				"artifacts root cannot be empty".into(),
			));
		}
		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

/// Resolves `${VAR_NAME}` references against the environment, with
/// `${VAR_NAME:-default}` fallbacks. A reference without a value is an
/// error rather than an empty string.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"File too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {e}")))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).unwrap();
		let var_name = cap.get(1).unwrap().as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => {
				if let Some(default) = default_value {
					default.to_string()
				} else {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{var_name}' not found"
					)));
				}
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value.as_str());
	}

	Ok(result)
}

fn default_confirmation_timeout_secs() -> u64 {
	600
}

fn default_artifacts_root() -> PathBuf {
	PathBuf::from("artifacts")
}

fn default_registry_file() -> PathBuf {
	PathBuf::from("deployments/address.json")
}

fn default_address_list_file() -> PathBuf {
	PathBuf::from("deployments/addressList.json")
}

fn default_ledger_file() -> PathBuf {
	PathBuf::from("deployments/transactions.jsonl")
}

fn default_checkpoint_file() -> PathBuf {
	PathBuf::from("deployments/checkpoint.json")
}
