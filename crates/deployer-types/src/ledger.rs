//! Transaction ledger entries.
//!
//! The ledger is an append-only audit trail of function calls sent during
//! runs. Deployments are not logged here; their record is the registry
//! entry itself.

use crate::call::FunctionCall;
use crate::utils::current_timestamp;
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// One confirmed function call, as appended to the ledger file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
	/// Unix timestamp (seconds) when the entry was written.
	pub timestamp: u64,
	/// Alias the call targeted.
	pub alias: String,
	/// Canonical signature, e.g. `initialize(address,uint256,uint256)`.
	pub function_signature: String,
	/// Signer that sent the transaction.
	pub calling_signer: Address,
	/// Resolved target address.
	pub target_address: Address,
	/// Transaction hash.
	pub tx_hash: B256,
	/// Arguments after alias resolution, as display strings.
	pub arguments: Vec<String>,
	/// Ether sent with the call, in wei.
	pub ether_value: U256,
}

impl LedgerEntry {
	/// Builds an entry for a confirmed call, stamped with the current time.
	pub fn new(
		alias: impl Into<String>,
		call: &FunctionCall,
		calling_signer: Address,
		target_address: Address,
		tx_hash: B256,
		ether_value: U256,
	) -> Self {
		Self {
			timestamp: current_timestamp(),
			alias: alias.into(),
			function_signature: call.signature(),
			calling_signer,
			target_address,
			tx_hash,
			arguments: call.args.clone(),
			ether_value,
		}
	}
}
