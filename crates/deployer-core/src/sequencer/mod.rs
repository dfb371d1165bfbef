//! The step sequencer.
//!
//! [`StepSequencer`] drives a [`StepProgram`] from first step to last,
//! strictly in order. Each step moves through one lifecycle: resolve its
//! alias references, execute against the chain, wait out the configured
//! confirmation depth, verify what the step claims (slot wiring, role
//! membership), then record the outcome durably before the next step
//! starts. Registry and checkpoint are flushed after every step, so a
//! crash or timeout at step N resumes at step N rather than at zero.
//!
//! Resumption never replays completed work: steps already in the
//! checkpoint are skipped by content digest without a single chain call,
//! and deploy steps whose alias is already registered are skipped even
//! when no checkpoint exists.

use crate::artifacts::{ArtifactError, ArtifactStore};
use crate::checkpoint::{CheckpointError, CheckpointStore, RunCheckpoint};
use crate::sequencer::deploy::{deploy_contract, DeployRequest};
use crate::sequencer::proxy::{deploy_pair, PairRequest};
use alloy_primitives::{Address, B256, U256};
use deployer_chain::{abi, ChainClient, ChainError};
use deployer_registry::{AddressRegistry, RegistryError, TransactionLedger};
use deployer_types::{
	CallArgument, CallStep, DeployStep, DeploymentStep, FunctionCall, GrantRoleStep, LedgerEntry,
	ProgramError, ProxyBinding, ProxyPairStep, StepKind, StepProgram, StepState,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

mod deploy;
mod proxy;
mod roles;

/// Reasons a single step fails.
#[derive(Debug, Error)]
pub enum StepError {
	/// The step references an alias with no registered address. Raised
	/// during resolution, before anything reaches the chain.
	#[error("unresolved dependency: alias {alias:?} is not registered")]
	DependencyUnresolved { alias: String },
	/// The grant transaction confirmed but membership did not read back.
	#[error("role {role} was granted to {grantee} but is not confirmed on chain")]
	PermissionNotConfirmed { role: String, grantee: Address },
	/// The proxy's storage slots disagree with its constructor inputs.
	#[error("proxy {proxy:?} wiring mismatch: {reason}")]
	ProxyVerification { proxy: String, reason: String },
	#[error(transparent)]
	Chain(#[from] ChainError),
	#[error(transparent)]
	Artifact(#[from] ArtifactError),
	#[error(transparent)]
	Registry(#[from] RegistryError),
	#[error(transparent)]
	Checkpoint(#[from] CheckpointError),
}

/// Reasons a run stops before reaching the end of its program.
#[derive(Debug, Error)]
pub enum RunError {
	#[error("program {program:?} is invalid: {source}")]
	InvalidProgram {
		program: String,
		#[source]
		source: ProgramError,
	},
	#[error("step {index} ({alias}: {function}) failed: {source}")]
	StepFailed {
		index: usize,
		alias: String,
		function: String,
		#[source]
		source: StepError,
	},
	#[error("run cancelled before step {index}")]
	Cancelled { index: usize },
	#[error(transparent)]
	Registry(#[from] RegistryError),
	#[error(transparent)]
	Checkpoint(#[from] CheckpointError),
}

/// Outcome of a run that reached the end of its program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
	pub program: String,
	pub total: usize,
	pub executed: usize,
	pub skipped: usize,
}

/// Executes step programs against one chain and one deployment state.
///
/// Owns the registry, ledger, and checkpoint for the duration of a run;
/// the registry's drop-time flush backstops even a panicking run.
pub struct StepSequencer {
	client: Arc<dyn ChainClient>,
	artifacts: ArtifactStore,
	registry: AddressRegistry,
	ledger: TransactionLedger,
	checkpoints: CheckpointStore,
	cancel: Arc<AtomicBool>,
	signer: Address,
}

impl StepSequencer {
	pub fn new(
		client: Arc<dyn ChainClient>,
		artifacts: ArtifactStore,
		registry: AddressRegistry,
		ledger: TransactionLedger,
		checkpoints: CheckpointStore,
	) -> Self {
		let signer = client.signer_address();
		Self {
			client,
			artifacts,
			registry,
			ledger,
			checkpoints,
			cancel: Arc::new(AtomicBool::new(false)),
			signer,
		}
	}

	/// Flag that stops the run before the next step once set. Shared with
	/// whatever handles shutdown signals.
	pub fn cancel_flag(&self) -> Arc<AtomicBool> {
		Arc::clone(&self.cancel)
	}

	pub fn registry(&self) -> &AddressRegistry {
		&self.registry
	}

	/// Runs `program`, skipping steps already recorded for it.
	///
	/// Steps execute strictly in program order. The first failure aborts
	/// the run with everything registered so far flushed to disk, so the
	/// next invocation resumes at the failed step.
	#[instrument(skip_all, fields(program = %program.name))]
	pub async fn run(&mut self, program: &StepProgram) -> Result<RunReport, RunError> {
		program
			.validate()
			.map_err(|source| RunError::InvalidProgram {
				program: program.name.clone(),
				source,
			})?;
		let mut checkpoint = self.checkpoints.load(&program.name)?;
		info!(steps = program.steps.len(), "starting deployment run");

		let mut executed = 0usize;
		let mut skipped = 0usize;
		for (index, step) in program.steps.iter().enumerate() {
			if self.cancel.load(Ordering::Relaxed) {
				warn!(step = index, "cancellation requested; stopping run");
				self.registry.flush()?;
				self.checkpoints.save(&checkpoint)?;
				return Err(RunError::Cancelled { index });
			}

			let alias = step.kind.primary_alias().to_string();
			let function = step.kind.function_name().to_string();
			let digest = step.digest().map_err(|err| RunError::StepFailed {
				index,
				alias: alias.clone(),
				function: function.clone(),
				source: StepError::Checkpoint(CheckpointError::Parse(err)),
			})?;

			if self.should_skip(step, &checkpoint, digest) {
				let mut state = StepState::Pending;
				self.transition(index, &alias, &mut state, StepState::Skipped);
				info!(step = index, alias = %alias, kind = step.kind.name(), "already recorded; skipping");
				skipped += 1;
				continue;
			}

			let mut state = StepState::Pending;
			self.transition(index, &alias, &mut state, StepState::Executing);
			match self.execute_step(step, &checkpoint).await {
				Ok(binding) => {
					self.transition(index, &alias, &mut state, StepState::Confirmed);
					if let Some(binding) = binding {
						checkpoint.add_binding(binding);
					}
					checkpoint.mark_recorded(digest);
					if let Err(source) = self.persist(&checkpoint) {
						self.transition(index, &alias, &mut state, StepState::Failed);
						error!(step = index, alias = %alias, %source, "failed to record step outcome");
						return Err(RunError::StepFailed {
							index,
							alias,
							function,
							source,
						});
					}
					self.transition(index, &alias, &mut state, StepState::Recorded);
					executed += 1;
				},
				Err(source) => {
					self.transition(index, &alias, &mut state, StepState::Failed);
					// Keep whatever registered before the failure so the
					// next run resumes instead of redeploying.
					if let Err(err) = self.registry.flush() {
						warn!(%err, "registry flush failed while aborting");
					}
					if let Err(err) = self.checkpoints.save(&checkpoint) {
						warn!(%err, "checkpoint save failed while aborting");
					}
					error!(
						step = index,
						alias = %alias,
						function = %function,
						%source,
						"step failed; aborting run"
					);
					return Err(RunError::StepFailed {
						index,
						alias,
						function,
						source,
					});
				},
			}
		}

		info!(executed, skipped, "deployment run complete");
		Ok(RunReport {
			program: program.name.clone(),
			total: program.steps.len(),
			executed,
			skipped,
		})
	}

	fn should_skip(
		&self,
		step: &DeploymentStep,
		checkpoint: &RunCheckpoint,
		digest: B256,
	) -> bool {
		if checkpoint.is_recorded(digest) {
			return true;
		}
		// Registries written before the checkpoint existed carry no
		// digests; a deploy whose alias is registered is complete anyway.
		matches!(&step.kind, StepKind::Deploy(deploy) if self.registry.contains(&deploy.alias))
	}

	fn transition(&self, index: usize, alias: &str, state: &mut StepState, next: StepState) {
		debug_assert!(
			state.can_transition(next),
			"illegal step transition {state:?} -> {next:?}"
		);
		debug!(step = index, alias = %alias, from = ?state, to = ?next, "step state");
		*state = next;
	}

	fn persist(&mut self, checkpoint: &RunCheckpoint) -> Result<(), StepError> {
		self.registry.flush()?;
		self.checkpoints.save(checkpoint)?;
		Ok(())
	}

	async fn execute_step(
		&mut self,
		step: &DeploymentStep,
		checkpoint: &RunCheckpoint,
	) -> Result<Option<ProxyBinding>, StepError> {
		match &step.kind {
			StepKind::Deploy(deploy) => {
				self.execute_deploy(deploy, step.confirmations, checkpoint)
					.await?;
				Ok(None)
			},
			StepKind::Initialize(call) | StepKind::SetParameter(call) => {
				self.execute_call(call, step.confirmations, checkpoint)
					.await?;
				Ok(None)
			},
			StepKind::GrantRole(grant) => {
				self.execute_grant(grant, step.confirmations, checkpoint)
					.await?;
				Ok(None)
			},
			StepKind::DeployProxyPair(pair) => {
				let binding = self
					.execute_pair(pair, step.confirmations, checkpoint)
					.await?;
				Ok(Some(binding))
			},
		}
	}

	async fn execute_deploy(
		&mut self,
		step: &DeployStep,
		confirmations: u64,
		checkpoint: &RunCheckpoint,
	) -> Result<(), StepError> {
		let args = self.resolve_arguments(checkpoint, &step.args)?;
		let value = parse_value(step.ether_value.as_deref())?;
		let (record, _) = deploy_contract(
			self.client.as_ref(),
			&self.artifacts,
			DeployRequest {
				alias: &step.alias,
				contract: &step.contract,
				source_file: step.source_file.as_deref(),
				params: &step.params,
				args,
				value,
				confirmations,
			},
		)
		.await?;
		self.registry.insert(step.alias.clone(), record);
		Ok(())
	}

	async fn execute_call(
		&mut self,
		step: &CallStep,
		confirmations: u64,
		checkpoint: &RunCheckpoint,
	) -> Result<(), StepError> {
		let target = self.resolve_address(checkpoint, &step.alias)?;
		let args = self.resolve_arguments(checkpoint, &step.args)?;
		let value = parse_value(step.ether_value.as_deref())?;
		let call = FunctionCall::new(step.function.clone(), step.params.clone(), args);

		info!(alias = %step.alias, %target, call = %call, "sending function call");
		let tx_hash = self.client.send(target, &call, value).await?;
		self.client
			.wait_for_confirmations(tx_hash, confirmations)
			.await?;

		self.ledger.record(&LedgerEntry::new(
			step.alias.clone(),
			&call,
			self.signer,
			target,
			tx_hash,
			value,
		));
		Ok(())
	}

	async fn execute_grant(
		&mut self,
		step: &GrantRoleStep,
		confirmations: u64,
		checkpoint: &RunCheckpoint,
	) -> Result<(), StepError> {
		let target = self.resolve_address(checkpoint, &step.alias)?;
		let grantee = self.resolve_grantee(checkpoint, &step.grantee)?;
		let (call, tx_hash) = roles::grant_role(
			self.client.as_ref(),
			&step.alias,
			target,
			&step.role_getter,
			grantee,
			step.verify,
			confirmations,
		)
		.await?;
		self.ledger.record(&LedgerEntry::new(
			step.alias.clone(),
			&call,
			self.signer,
			target,
			tx_hash,
			U256::ZERO,
		));
		Ok(())
	}

	async fn execute_pair(
		&mut self,
		step: &ProxyPairStep,
		confirmations: u64,
		checkpoint: &RunCheckpoint,
	) -> Result<ProxyBinding, StepError> {
		// Initializer arguments resolve against the registry as it stood
		// before this step; init data cannot reference the pair itself.
		let init_call = match &step.init {
			Some(init) => {
				let args = self.resolve_arguments(checkpoint, &init.args)?;
				Some(FunctionCall::new(
					init.function.clone(),
					init.params.clone(),
					args,
				))
			},
			None => None,
		};
		deploy_pair(
			self.client.as_ref(),
			&self.artifacts,
			&mut self.registry,
			PairRequest {
				step,
				init_call,
				confirmations,
			},
		)
		.await
	}

	fn resolve_arguments(
		&self,
		checkpoint: &RunCheckpoint,
		args: &[CallArgument],
	) -> Result<Vec<String>, StepError> {
		args.iter()
			.map(|arg| self.resolve_argument(checkpoint, arg))
			.collect()
	}

	fn resolve_argument(
		&self,
		checkpoint: &RunCheckpoint,
		arg: &CallArgument,
	) -> Result<String, StepError> {
		match arg {
			CallArgument::Signer => Ok(self.signer.to_string()),
			CallArgument::Alias(alias) => {
				Ok(self.resolve_address(checkpoint, alias)?.to_string())
			},
			CallArgument::Literal(value) => Ok(value.clone()),
		}
	}

	/// Resolves an alias to its registered address, redirecting wired
	/// implementation aliases to their proxy first.
	fn resolve_address(
		&self,
		checkpoint: &RunCheckpoint,
		alias: &str,
	) -> Result<Address, StepError> {
		let effective = match checkpoint.redirect(alias) {
			Some(proxy_alias) => {
				debug!(
					alias = %alias,
					proxy = %proxy_alias,
					"redirecting wired implementation alias to its proxy"
				);
				proxy_alias
			},
			None => alias,
		};
		self.registry
			.address_of(effective)
			.ok_or_else(|| StepError::DependencyUnresolved {
				alias: effective.to_string(),
			})
	}

	fn resolve_grantee(
		&self,
		checkpoint: &RunCheckpoint,
		grantee: &CallArgument,
	) -> Result<Address, StepError> {
		match grantee {
			CallArgument::Signer => Ok(self.signer),
			CallArgument::Alias(alias) => self.resolve_address(checkpoint, alias),
			CallArgument::Literal(value) => value.parse().map_err(|err| {
				ChainError::Encoding(format!("grantee {value:?} is not an address: {err}")).into()
			}),
		}
	}
}

fn parse_value(ether_value: Option<&str>) -> Result<U256, StepError> {
	match ether_value {
		Some(text) => Ok(abi::parse_ether_value(text)?),
		None => Ok(U256::ZERO),
	}
}
