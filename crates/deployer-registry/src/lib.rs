//! Persistent deployment state for the orchestrator.
//!
//! Two stores live here. The [`AddressRegistry`] is the source of truth for
//! what has been deployed: an ordered alias-to-record map persisted as two
//! JSON views after every completed step, so a crash at any point loses at
//! most the step in flight. The [`TransactionLedger`] is an append-only
//! audit trail of the function calls sent during runs; it is advisory, and
//! a ledger write failure never fails a step.

pub mod ledger;
pub mod registry;

pub use ledger::TransactionLedger;
pub use registry::{AddressRegistry, RegistryError};
