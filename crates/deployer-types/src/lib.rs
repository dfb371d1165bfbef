//! Shared types for the deployment orchestrator.
//!
//! This crate defines the data model exchanged between the orchestrator
//! crates: step programs and their validation, the typed function-call
//! descriptor used for all ABI encoding, deployment records and proxy
//! bindings kept by the address registry, and the append-only ledger
//! entry format.
//!
//! Everything here is plain data. Behavior (execution, persistence,
//! encoding) lives in the crates that consume these types.

/// Typed function-call descriptors and program argument values.
pub mod call;

/// Append-only transaction ledger entries.
pub mod ledger;

/// Proxy bindings and proxy storage-slot views.
pub mod proxy;

/// Deployment records and deploy results.
pub mod record;

/// Deployment steps, step programs, and the step state machine.
pub mod step;

/// Small shared helpers.
pub mod utils;

pub use call::{CallArgument, FunctionCall};
pub use ledger::LedgerEntry;
pub use proxy::{ProxyBinding, ProxySlots};
pub use record::{Deployment, DeploymentRecord};
pub use step::{
	CallStep, DeployStep, DeploymentStep, GrantRoleStep, InitData, ProgramError, ProxyPairStep,
	StepKind, StepProgram, StepState,
};
pub use utils::current_timestamp;
