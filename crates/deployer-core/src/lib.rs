//! Core orchestration for contract deployments.
//!
//! This crate turns a validated step program into confirmed on-chain
//! state: the [`sequencer::StepSequencer`] executes steps in order against
//! a [`deployer_chain::ChainClient`], registering every deployed address,
//! checkpointing progress after each step, and appending confirmed calls
//! to the transaction ledger. Supporting modules read compiled artifacts,
//! persist run checkpoints, and inspect standardized proxy storage slots.

pub mod artifacts;
pub mod checkpoint;
pub mod inspector;
pub mod sequencer;

#[cfg(test)]
pub(crate) mod testutil;

pub use artifacts::{ArtifactError, ArtifactStore};
pub use checkpoint::{CheckpointError, CheckpointStore, RunCheckpoint};
pub use inspector::ProxySlotInspector;
pub use sequencer::{RunError, RunReport, StepError, StepSequencer};
