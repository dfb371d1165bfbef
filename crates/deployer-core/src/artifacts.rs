//! Compiled artifact lookup.
//!
//! Artifacts are expected under `{root}/{file}.sol/{Contract}.json`, the
//! layout both common Solidity build tools produce. Only the creation
//! bytecode is read; ABIs are never needed because calls are encoded from
//! the step program's parameter types.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from locating or reading compiled artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
	#[error("artifact for {contract} not found at {}", .path.display())]
	NotFound { contract: String, path: PathBuf },
	#[error("artifact {}: {source}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("artifact {} is malformed: {reason}", .path.display())]
	Malformed { path: PathBuf, reason: String },
}

/// The part of an artifact file the orchestrator cares about.
#[derive(Deserialize)]
struct Artifact {
	bytecode: BytecodeField,
}

/// Creation bytecode, either as a plain hex string or nested under
/// `object` depending on the build tool.
#[derive(Deserialize)]
#[serde(untagged)]
enum BytecodeField {
	Hex(String),
	Object { object: String },
}

impl BytecodeField {
	fn hex(&self) -> &str {
		match self {
			BytecodeField::Hex(hex) => hex,
			BytecodeField::Object { object } => object,
		}
	}
}

/// Read-only view over a compiled artifact tree.
pub struct ArtifactStore {
	root: PathBuf,
}

impl ArtifactStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// Path an artifact is expected at: `{root}/{file}.sol/{contract}.json`.
	pub fn artifact_path(&self, contract: &str, source_file: Option<&str>) -> PathBuf {
		let file_stem = source_file.unwrap_or(contract);
		self.root
			.join(format!("{file_stem}.sol"))
			.join(format!("{contract}.json"))
	}

	/// Creation bytecode for `contract`, ready for constructor arguments to
	/// be appended.
	pub fn creation_bytecode(
		&self,
		contract: &str,
		source_file: Option<&str>,
	) -> Result<Vec<u8>, ArtifactError> {
		let path = self.artifact_path(contract, source_file);
		let bytes = std::fs::read(&path).map_err(|source| {
			if source.kind() == std::io::ErrorKind::NotFound {
				ArtifactError::NotFound {
					contract: contract.to_string(),
					path: path.clone(),
				}
			} else {
				ArtifactError::Io {
					path: path.clone(),
					source,
				}
			}
		})?;
		let artifact: Artifact =
			serde_json::from_slice(&bytes).map_err(|err| ArtifactError::Malformed {
				path: path.clone(),
				reason: err.to_string(),
			})?;
		let bytecode = alloy_primitives::hex::decode(artifact.bytecode.hex()).map_err(|err| {
			ArtifactError::Malformed {
				path: path.clone(),
				reason: format!("bytecode is not hex: {err}"),
			}
		})?;
		if bytecode.is_empty() {
			// Interfaces and abstract contracts compile to empty bytecode.
			return Err(ArtifactError::Malformed {
				path,
				reason: "artifact contains no creation bytecode".to_string(),
			});
		}
		Ok(bytecode)
	}
}
