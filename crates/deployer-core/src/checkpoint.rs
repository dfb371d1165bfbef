//! Run checkpoints.
//!
//! A checkpoint remembers which steps of a program have reached `Recorded`,
//! keyed by step content digest, plus the proxy bindings established along
//! the way. On resume, digests let the orchestrator skip completed steps
//! without touching the chain, including call steps that leave no registry
//! alias behind. Editing a step changes its digest, so edited steps run
//! again while untouched ones stay skipped.

use alloy_primitives::B256;
use deployer_types::ProxyBinding;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from loading or persisting checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
	#[error("checkpoint io: {0}")]
	Io(#[from] std::io::Error),
	#[error("checkpoint parse: {0}")]
	Parse(#[from] serde_json::Error),
}

/// Progress of one program's runs against one deployment state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCheckpoint {
	/// Program the checkpoint belongs to.
	pub program: String,
	/// Digests of steps that reached `Recorded`, in completion order.
	pub recorded: Vec<B256>,
	/// Proxy bindings established so far. Consulted to redirect wired
	/// implementation aliases to their proxy.
	pub bindings: Vec<ProxyBinding>,
}

impl RunCheckpoint {
	fn for_program(program: &str) -> Self {
		Self {
			program: program.to_string(),
			..Self::default()
		}
	}

	pub fn is_recorded(&self, digest: B256) -> bool {
		self.recorded.contains(&digest)
	}

	pub fn mark_recorded(&mut self, digest: B256) {
		if !self.recorded.contains(&digest) {
			self.recorded.push(digest);
		}
	}

	/// Remembers a proxy binding, replacing any earlier binding for the
	/// same proxy alias.
	pub fn add_binding(&mut self, binding: ProxyBinding) {
		self.bindings
			.retain(|existing| existing.proxy_alias != binding.proxy_alias);
		self.bindings.push(binding);
	}

	/// The proxy alias a wired implementation alias should resolve to.
	pub fn redirect(&self, alias: &str) -> Option<&str> {
		self.bindings
			.iter()
			.find(|binding| binding.implementation_alias == alias)
			.map(|binding| binding.proxy_alias.as_str())
	}
}

/// Loads and saves checkpoints at a fixed path.
pub struct CheckpointStore {
	path: PathBuf,
}

impl CheckpointStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Loads the checkpoint for `program`. A missing file, or a checkpoint
	/// written for a different program, yields a fresh one.
	pub fn load(&self, program: &str) -> Result<RunCheckpoint, CheckpointError> {
		if !self.path.exists() {
			return Ok(RunCheckpoint::for_program(program));
		}
		let bytes = std::fs::read(&self.path)?;
		let checkpoint: RunCheckpoint = serde_json::from_slice(&bytes)?;
		if checkpoint.program != program {
			info!(
				found = %checkpoint.program,
				expected = %program,
				"checkpoint belongs to a different program; starting fresh"
			);
			return Ok(RunCheckpoint::for_program(program));
		}
		debug!(
			program,
			recorded = checkpoint.recorded.len(),
			bindings = checkpoint.bindings.len(),
			"loaded checkpoint"
		);
		Ok(checkpoint)
	}

	/// Persists the checkpoint atomically.
	pub fn save(&self, checkpoint: &RunCheckpoint) -> Result<(), CheckpointError> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				std::fs::create_dir_all(parent)?;
			}
		}
		let temp_path = self.path.with_extension("tmp");
		std::fs::write(&temp_path, serde_json::to_vec_pretty(checkpoint)?)?;
		std::fs::rename(&temp_path, &self.path)?;
		Ok(())
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}
