//! Chain access for the deployment orchestrator.
//!
//! Everything the orchestrator does on chain goes through the
//! [`ChainClient`] trait: deploying creation bytecode, sending and reading
//! function calls, waiting out confirmation depth, and reading raw storage
//! slots. The one production implementation is Alloy-backed; tests swap in
//! a mock or a scripted fake.

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use deployer_types::{Deployment, FunctionCall};
use thiserror::Error;

pub mod abi;

/// Re-export implementations
pub mod implementations {
	pub mod alloy;
}

/// Errors from chain interaction.
///
/// `Rejected` means the chain processed the request and refused it; its
/// message carries the node's error verbatim, revert reasons included.
/// `Transport` means the chain could not be reached or answered outside
/// the protocol.
#[derive(Debug, Error)]
pub enum ChainError {
	/// Network or RPC failure outside contract execution.
	#[error("transport: {0}")]
	Transport(String),
	/// The node rejected the request or the transaction reverted.
	#[error("rejected by chain: {0}")]
	Rejected(String),
	/// The transaction did not reach the required depth in time.
	#[error("confirmation timeout for transaction {tx_hash}")]
	ConfirmationTimeout { tx_hash: B256 },
	/// Calldata or constructor arguments could not be encoded.
	#[error("encoding: {0}")]
	Encoding(String),
}

/// Interface to one chain through one signing account.
///
/// Submission and confirmation are split: `send` returns as soon as the
/// transaction is accepted into the mempool, and `wait_for_confirmations`
/// blocks until the configured depth is observed and the transaction
/// succeeded. `deploy` folds both together because the contract address is
/// only known from the receipt.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
	/// Address of the signing account behind this client.
	fn signer_address(&self) -> Address;

	/// Submits creation bytecode and waits for `confirmations` blocks.
	///
	/// `contract` is only used for logging and error messages.
	async fn deploy(
		&self,
		contract: &str,
		init_code: Vec<u8>,
		value: U256,
		confirmations: u64,
	) -> Result<Deployment, ChainError>;

	/// Executes a read-only call and returns the raw return data.
	async fn call(&self, to: Address, call: &FunctionCall) -> Result<Bytes, ChainError>;

	/// Signs and submits a state-changing call; returns the transaction
	/// hash without waiting for inclusion.
	async fn send(&self, to: Address, call: &FunctionCall, value: U256)
		-> Result<B256, ChainError>;

	/// Waits until `tx_hash` is `confirmations` blocks deep and its
	/// receipt reports success.
	async fn wait_for_confirmations(
		&self,
		tx_hash: B256,
		confirmations: u64,
	) -> Result<(), ChainError>;

	/// Reads a raw 32-byte storage slot.
	async fn read_storage_slot(&self, address: Address, slot: B256) -> Result<B256, ChainError>;
}
