//! Deployment steps and step programs.
//!
//! A step program is an ordered list of [`DeploymentStep`]s supplied by the
//! calling environment; the orchestrator executes it without reordering.
//! Each step is a pure description of target aliases, the call to make and
//! the confirmation depth to wait for, immutable once constructed.
//!
//! Step completion is tracked by content digest (keccak-256 of the step's
//! canonical JSON), so editing a program only invalidates the steps that
//! changed.

use crate::call::CallArgument;
use alloy_primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors found while validating a step program before execution.
#[derive(Debug, Error)]
pub enum ProgramError {
	/// Two steps unconditionally produce the same alias.
	#[error("duplicate alias {0:?} produced by more than one step")]
	DuplicateAlias(String),
	/// A step asks for a confirmation depth of zero.
	#[error("step {alias:?}: confirmations must be at least 1")]
	ZeroConfirmations { alias: String },
	/// A call declares a different number of parameter types and arguments.
	#[error(
		"step {alias:?}: {function} declares {params} parameter type(s) but {args} argument(s)"
	)]
	ArityMismatch {
		alias: String,
		function: String,
		params: usize,
		args: usize,
	},
}

/// Deploys a single contract and registers its address under an alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployStep {
	/// Logical alias the deployed address is registered under.
	pub alias: String,
	/// Contract name inside the compiled artifact.
	pub contract: String,
	/// Constructor parameter types.
	#[serde(default)]
	pub params: Vec<String>,
	/// Constructor arguments, one per parameter.
	#[serde(default)]
	pub args: Vec<CallArgument>,
	/// Ether sent with the deployment, in ether units (e.g. `"0.5"`).
	#[serde(default)]
	pub ether_value: Option<String>,
	/// Artifact file stem when it differs from the contract name
	/// (`{file}.sol/{contract}.json`).
	#[serde(default)]
	pub source_file: Option<String>,
}

/// Sends a state-changing function call to a registered alias.
///
/// Used by both `Initialize` and `SetParameter` steps; the function name
/// defaults to `initialize` when omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStep {
	/// Alias of the target contract.
	pub alias: String,
	/// Function to invoke.
	#[serde(default = "default_function")]
	pub function: String,
	/// Parameter types of the function.
	#[serde(default)]
	pub params: Vec<String>,
	/// Arguments, one per parameter.
	#[serde(default)]
	pub args: Vec<CallArgument>,
	/// Ether sent with the call, in ether units.
	#[serde(default)]
	pub ether_value: Option<String>,
}

/// Grants an on-chain role to an address and verifies the grant.
///
/// The role identifier is read from the target contract via the named
/// getter rather than hardcoded, so the program cannot drift from the
/// deployed contract version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRoleStep {
	/// Alias of the contract holding the role.
	pub alias: String,
	/// Read-only accessor returning the role identifier, e.g. `ADMIN_ROLE`.
	pub role_getter: String,
	/// Address receiving the role: an alias, `@signer`, or a literal.
	pub grantee: CallArgument,
	/// Re-read role membership after the grant and fail the step if the
	/// grant did not take effect.
	#[serde(default = "default_true")]
	pub verify: bool,
}

/// Constructor-encoded initializer for a proxy deployment.
///
/// Rarely used: a separate `Initialize` step is preferred because it can be
/// retried independently, which constructor-encoded call data cannot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitData {
	/// Function to encode into the proxy constructor's data argument.
	#[serde(default = "default_function")]
	pub function: String,
	/// Parameter types of the function.
	#[serde(default)]
	pub params: Vec<String>,
	/// Arguments, one per parameter.
	#[serde(default)]
	pub args: Vec<CallArgument>,
}

/// Deploys an implementation plus a transparent upgradeable proxy wired to
/// it through a shared ProxyAdmin.
///
/// Contracts already present in the registry are reused, so a single admin
/// alias is shared across every pair in a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyPairStep {
	/// Alias of the implementation contract (deployed here if absent).
	pub implementation: String,
	/// Functional alias registered for the proxy; the address all later
	/// steps must use.
	pub proxy: String,
	/// Alias of the ProxyAdmin (deployed here if absent).
	pub admin: String,
	/// Implementation contract name; defaults to the implementation alias.
	#[serde(default)]
	pub contract: Option<String>,
	/// Artifact file stem override for the implementation.
	#[serde(default)]
	pub source_file: Option<String>,
	/// Proxy contract name in the artifact tree.
	#[serde(default = "default_proxy_contract")]
	pub proxy_contract: String,
	/// Admin contract name in the artifact tree.
	#[serde(default = "default_admin_contract")]
	pub admin_contract: String,
	/// Optional constructor-encoded initializer.
	#[serde(default)]
	pub init: Option<InitData>,
	/// Read the proxy's implementation and admin slots after wiring and
	/// fail the step on a mismatch.
	#[serde(default = "default_true")]
	pub verify_slots: bool,
}

impl ProxyPairStep {
	/// Implementation contract name, defaulting to the implementation alias.
	pub fn contract_name(&self) -> &str {
		self.contract.as_deref().unwrap_or(&self.implementation)
	}
}

/// The five step kinds a program is composed of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
	/// Deploy a contract and record its alias.
	Deploy(DeployStep),
	/// Call `initialize` (or a named initializer) on a deployed alias.
	Initialize(CallStep),
	/// Call a parameter-setting function on a deployed alias.
	SetParameter(CallStep),
	/// Grant a role and verify membership.
	GrantRole(GrantRoleStep),
	/// Deploy and wire an implementation/proxy/admin triple.
	DeployProxyPair(ProxyPairStep),
}

impl StepKind {
	/// Short kind name for logs and reports.
	pub fn name(&self) -> &'static str {
		match self {
			StepKind::Deploy(_) => "deploy",
			StepKind::Initialize(_) => "initialize",
			StepKind::SetParameter(_) => "set_parameter",
			StepKind::GrantRole(_) => "grant_role",
			StepKind::DeployProxyPair(_) => "deploy_proxy_pair",
		}
	}

	/// The alias used to identify this step in diagnostics.
	pub fn primary_alias(&self) -> &str {
		match self {
			StepKind::Deploy(step) => &step.alias,
			StepKind::Initialize(step) | StepKind::SetParameter(step) => &step.alias,
			StepKind::GrantRole(step) => &step.alias,
			StepKind::DeployProxyPair(step) => &step.proxy,
		}
	}

	/// The function a failure of this step is reported against.
	pub fn function_name(&self) -> &str {
		match self {
			StepKind::Deploy(_) | StepKind::DeployProxyPair(_) => "deploy",
			StepKind::Initialize(step) | StepKind::SetParameter(step) => &step.function,
			StepKind::GrantRole(_) => "grantRole",
		}
	}

	/// Aliases this step always registers on success. Conditional
	/// registrations (a pair reusing an existing implementation or admin)
	/// are not included.
	fn produced_aliases(&self) -> Vec<&str> {
		match self {
			StepKind::Deploy(step) => vec![&step.alias],
			StepKind::DeployProxyPair(step) => vec![&step.proxy],
			_ => Vec::new(),
		}
	}
}

/// One entry of a step program: a kind plus the confirmation depth to wait
/// for after each transaction the step submits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStep {
	#[serde(flatten)]
	pub kind: StepKind,
	/// Blocks to wait after submission before the step counts as
	/// confirmed. Per-step because admin actions may warrant deeper
	/// confirmation than parameter calls.
	#[serde(default = "default_confirmations")]
	pub confirmations: u64,
}

impl DeploymentStep {
	/// Content digest of this step: keccak-256 over its canonical JSON.
	///
	/// Used by the run checkpoint to skip already-recorded steps on resume.
	pub fn digest(&self) -> Result<B256, serde_json::Error> {
		Ok(keccak256(serde_json::to_vec(self)?))
	}
}

/// A named, ordered sequence of deployment steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepProgram {
	/// Program name, surfaced in logs and the run checkpoint.
	pub name: String,
	/// Steps in execution order.
	#[serde(default)]
	pub steps: Vec<DeploymentStep>,
}

impl StepProgram {
	/// Validates the program before execution: unique produced aliases,
	/// non-zero confirmation depths, and matching parameter/argument
	/// arity for every call.
	pub fn validate(&self) -> Result<(), ProgramError> {
		let mut produced: Vec<&str> = Vec::new();
		for step in &self.steps {
			let alias = step.kind.primary_alias();
			if step.confirmations == 0 {
				return Err(ProgramError::ZeroConfirmations {
					alias: alias.to_string(),
				});
			}
			for name in step.kind.produced_aliases() {
				if produced.contains(&name) {
					return Err(ProgramError::DuplicateAlias(name.to_string()));
				}
				produced.push(name);
			}
			match &step.kind {
				StepKind::Deploy(deploy) => {
					check_arity(alias, "constructor", &deploy.params, &deploy.args)?;
				},
				StepKind::Initialize(call) | StepKind::SetParameter(call) => {
					check_arity(alias, &call.function, &call.params, &call.args)?;
				},
				StepKind::DeployProxyPair(pair) => {
					if pair.proxy == pair.implementation {
						return Err(ProgramError::DuplicateAlias(pair.proxy.clone()));
					}
					if let Some(init) = &pair.init {
						check_arity(alias, &init.function, &init.params, &init.args)?;
					}
				},
				StepKind::GrantRole(_) => {},
			}
		}
		Ok(())
	}
}

fn check_arity(
	alias: &str,
	function: &str,
	params: &[String],
	args: &[CallArgument],
) -> Result<(), ProgramError> {
	if params.len() != args.len() {
		return Err(ProgramError::ArityMismatch {
			alias: alias.to_string(),
			function: function.to_string(),
			params: params.len(),
			args: args.len(),
		});
	}
	Ok(())
}

/// Lifecycle of a single step within a run.
///
/// `Recorded`, `Skipped`, and `Failed` are terminal; any `Failed` step
/// aborts the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepState {
	/// Not reached yet.
	Pending,
	/// Submitted to the chain (or resolving its inputs).
	Executing,
	/// The configured confirmation depth was observed.
	Confirmed,
	/// Registry, checkpoint and ledger updates are durable.
	Recorded,
	/// Skipped on resume; no chain interaction.
	Skipped,
	/// The step failed and the run aborts.
	Failed,
}

impl StepState {
	/// Whether moving from `self` to `next` is a legal transition.
	pub fn can_transition(self, next: StepState) -> bool {
		matches!(
			(self, next),
			(StepState::Pending, StepState::Executing)
				| (StepState::Pending, StepState::Skipped)
				| (StepState::Executing, StepState::Confirmed)
				| (StepState::Executing, StepState::Failed)
				| (StepState::Confirmed, StepState::Recorded)
				| (StepState::Confirmed, StepState::Failed)
		)
	}

	/// Whether this state ends the step's lifecycle.
	pub fn is_terminal(self) -> bool {
		matches!(
			self,
			StepState::Recorded | StepState::Skipped | StepState::Failed
		)
	}
}

fn default_function() -> String {
	"initialize".to_string()
}

fn default_proxy_contract() -> String {
	"TransparentUpgradeableProxy".to_string()
}

fn default_admin_contract() -> String {
	"ProxyAdmin".to_string()
}

fn default_confirmations() -> u64 {
	1
}

fn default_true() -> bool {
	true
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse_program(toml_text: &str) -> StepProgram {
		toml::from_str(toml_text).expect("program should parse")
	}

	#[test]
	fn test_program_parses_from_toml() {
		let program = parse_program(
			r#"
			name = "launch"

			[[steps]]
			kind = "deploy"
			alias = "FFactory"
			contract = "FFactory"
			confirmations = 3

			[[steps]]
			kind = "deploy_proxy_pair"
			implementation = "FFactory"
			proxy = "FFactoryProxy"
			admin = "ProxyAdmin"
			confirmations = 3

			[[steps]]
			kind = "initialize"
			alias = "FFactoryProxy"
			params = ["address", "uint256", "uint256"]
			args = ["@FeeReceiveProxy", "100", "100"]

			[[steps]]
			kind = "grant_role"
			alias = "FFactoryProxy"
			role_getter = "ADMIN_ROLE"
			grantee = "@signer"
			"#,
		);

		assert_eq!(program.name, "launch");
		assert_eq!(program.steps.len(), 4);
		assert_eq!(program.steps[0].confirmations, 3);
		// Defaults: confirmations 1, initialize function name.
		assert_eq!(program.steps[2].confirmations, 1);
		match &program.steps[2].kind {
			StepKind::Initialize(call) => {
				assert_eq!(call.function, "initialize");
				assert_eq!(call.args[0], CallArgument::Alias("FeeReceiveProxy".to_string()));
			},
			other => panic!("expected initialize step, got {:?}", other),
		}
		match &program.steps[1].kind {
			StepKind::DeployProxyPair(pair) => {
				assert_eq!(pair.proxy_contract, "TransparentUpgradeableProxy");
				assert_eq!(pair.admin_contract, "ProxyAdmin");
				assert_eq!(pair.contract_name(), "FFactory");
				assert!(pair.verify_slots);
			},
			other => panic!("expected proxy pair step, got {:?}", other),
		}
		program.validate().expect("program should validate");
	}

	#[test]
	fn test_validate_rejects_duplicate_alias() {
		let program = parse_program(
			r#"
			name = "dup"

			[[steps]]
			kind = "deploy"
			alias = "FFactory"
			contract = "FFactory"

			[[steps]]
			kind = "deploy"
			alias = "FFactory"
			contract = "FFactory"
			"#,
		);
		assert!(matches!(
			program.validate(),
			Err(ProgramError::DuplicateAlias(alias)) if alias == "FFactory"
		));
	}

	#[test]
	fn test_validate_rejects_zero_confirmations() {
		let program = parse_program(
			r#"
			name = "zero"

			[[steps]]
			kind = "deploy"
			alias = "FFactory"
			contract = "FFactory"
			confirmations = 0
			"#,
		);
		assert!(matches!(
			program.validate(),
			Err(ProgramError::ZeroConfirmations { alias }) if alias == "FFactory"
		));
	}

	#[test]
	fn test_validate_rejects_arity_mismatch() {
		let program = parse_program(
			r#"
			name = "arity"

			[[steps]]
			kind = "set_parameter"
			alias = "FFactoryProxy"
			function = "setRouter"
			params = ["address"]
			args = []
			"#,
		);
		assert!(matches!(
			program.validate(),
			Err(ProgramError::ArityMismatch { function, .. }) if function == "setRouter"
		));
	}

	#[test]
	fn test_validate_rejects_proxy_alias_equal_to_implementation() {
		let program = parse_program(
			r#"
			name = "selfproxy"

			[[steps]]
			kind = "deploy_proxy_pair"
			implementation = "FFactory"
			proxy = "FFactory"
			admin = "ProxyAdmin"
			"#,
		);
		assert!(matches!(
			program.validate(),
			Err(ProgramError::DuplicateAlias(alias)) if alias == "FFactory"
		));
	}

	#[test]
	fn test_digest_is_stable_and_distinguishes_steps() {
		let program = parse_program(
			r#"
			name = "digest"

			[[steps]]
			kind = "deploy"
			alias = "A"
			contract = "A"

			[[steps]]
			kind = "deploy"
			alias = "B"
			contract = "B"
			"#,
		);
		let first = program.steps[0].digest().unwrap();
		let again = program.steps[0].digest().unwrap();
		let second = program.steps[1].digest().unwrap();
		assert_eq!(first, again);
		assert_ne!(first, second);
	}

	#[test]
	fn test_step_state_transitions() {
		assert!(StepState::Pending.can_transition(StepState::Executing));
		assert!(StepState::Pending.can_transition(StepState::Skipped));
		assert!(StepState::Executing.can_transition(StepState::Confirmed));
		assert!(StepState::Executing.can_transition(StepState::Failed));
		assert!(StepState::Confirmed.can_transition(StepState::Recorded));

		assert!(!StepState::Pending.can_transition(StepState::Recorded));
		assert!(!StepState::Recorded.can_transition(StepState::Executing));
		assert!(!StepState::Skipped.can_transition(StepState::Executing));
		assert!(!StepState::Failed.can_transition(StepState::Executing));

		assert!(StepState::Recorded.is_terminal());
		assert!(StepState::Skipped.is_terminal());
		assert!(StepState::Failed.is_terminal());
		assert!(!StepState::Executing.is_terminal());
	}
}
