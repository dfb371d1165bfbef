//! Alloy-backed chain client.
//!
//! Wraps a single HTTP provider with retry, nonce, gas and chain-id
//! fillers, signing locally with one private key. Revert reasons from the
//! node are passed through verbatim so a failed run reports exactly what
//! the chain said.

use crate::{abi, ChainClient, ChainError};
use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::{
	fillers::{ChainIdFiller, GasFiller, NonceFiller, SimpleNonceManager},
	DynProvider, PendingTransactionConfig, PendingTransactionError, Provider, ProviderBuilder,
	WatchTxError,
};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::{layers::RetryBackoffLayer, TransportError};
use async_trait::async_trait;
use deployer_types::{Deployment, FunctionCall};
use std::time::Duration;
use url::Url;

/// Chain client for a single EVM network and signing account.
pub struct AlloyChainClient {
	provider: DynProvider,
	signer_address: Address,
	/// Upper bound on waiting for any single transaction's confirmations.
	confirmation_timeout: Duration,
}

impl AlloyChainClient {
	/// Builds the provider stack for `rpc_url`, signing with `signer`.
	pub fn new(rpc_url: Url, signer: PrivateKeySigner, confirmation_timeout: Duration) -> Self {
		let signer_address = signer.address();
		let wallet = EthereumWallet::from(signer);

		// Retries cover transient network errors and rate limits.
		let retry_layer = RetryBackoffLayer::new(
			5,    // max_retry: retry up to 5 times
			1000, // backoff: initial backoff in milliseconds
			10,   // cups: compute units per second
		);
		let client = RpcClient::builder().layer(retry_layer).http(rpc_url);

		let provider = ProviderBuilder::new()
			.filler(NonceFiller::new(SimpleNonceManager::default()))
			.filler(GasFiller)
			.filler(ChainIdFiller::default())
			.wallet(wallet)
			.connect_client(client);

		provider
			.client()
			.set_poll_interval(std::time::Duration::from_secs(7));

		Self {
			provider: provider.erased(),
			signer_address,
			confirmation_timeout,
		}
	}
}

#[async_trait]
impl ChainClient for AlloyChainClient {
	fn signer_address(&self) -> Address {
		self.signer_address
	}

	async fn deploy(
		&self,
		contract: &str,
		init_code: Vec<u8>,
		value: U256,
		confirmations: u64,
	) -> Result<Deployment, ChainError> {
		let request = TransactionRequest::default()
			.with_deploy_code(init_code)
			.value(value);

		tracing::debug!(contract, %value, "submitting deployment transaction");
		let pending = self
			.provider
			.send_transaction(request)
			.await
			.map_err(classify_transport)?;
		let tx_hash = *pending.tx_hash();

		let receipt = pending
			.with_required_confirmations(confirmations)
			.with_timeout(Some(self.confirmation_timeout))
			.get_receipt()
			.await
			.map_err(|err| classify_pending(tx_hash, err))?;

		if !receipt.status() {
			return Err(ChainError::Rejected(format!(
				"deployment of {contract} reverted in transaction {tx_hash}"
			)));
		}
		let address = receipt.contract_address.ok_or_else(|| {
			ChainError::Rejected(format!("receipt for {tx_hash} carries no contract address"))
		})?;

		tracing::debug!(contract, %address, %tx_hash, "deployment confirmed");
		Ok(Deployment { address, tx_hash })
	}

	async fn call(&self, to: Address, call: &FunctionCall) -> Result<Bytes, ChainError> {
		let data = abi::encode_call(call)?;
		let request = TransactionRequest::default().to(to).input(data.into());
		self.provider
			.call(request)
			.await
			.map_err(classify_transport)
	}

	async fn send(
		&self,
		to: Address,
		call: &FunctionCall,
		value: U256,
	) -> Result<B256, ChainError> {
		let data = abi::encode_call(call)?;
		let request = TransactionRequest::default()
			.to(to)
			.input(data.into())
			.value(value);

		tracing::debug!(%to, function = %call.signature(), "submitting transaction");
		let pending = self
			.provider
			.send_transaction(request)
			.await
			.map_err(classify_transport)?;
		Ok(*pending.tx_hash())
	}

	async fn wait_for_confirmations(
		&self,
		tx_hash: B256,
		confirmations: u64,
	) -> Result<(), ChainError> {
		let config = PendingTransactionConfig::new(tx_hash)
			.with_required_confirmations(confirmations)
			.with_timeout(Some(self.confirmation_timeout));

		let pending = self
			.provider
			.watch_pending_transaction(config)
			.await
			.map_err(|err| classify_pending(tx_hash, err))?;
		pending
			.await
			.map_err(|err| classify_pending(tx_hash, err))?;

		// Depth alone does not prove success; the receipt status does.
		match self.provider.get_transaction_receipt(tx_hash).await {
			Ok(Some(receipt)) if receipt.status() => Ok(()),
			Ok(Some(_)) => Err(ChainError::Rejected(format!(
				"transaction {tx_hash} reverted"
			))),
			Ok(None) => Err(ChainError::Transport(format!(
				"transaction {tx_hash} confirmed but its receipt was not found"
			))),
			Err(err) => Err(classify_transport(err)),
		}
	}

	async fn read_storage_slot(&self, address: Address, slot: B256) -> Result<B256, ChainError> {
		let value = self
			.provider
			.get_storage_at(address, U256::from_be_bytes(slot.0))
			.await
			.map_err(classify_transport)?;
		Ok(B256::from(value))
	}
}

/// Node error responses (reverts included) become `Rejected` with the
/// server message verbatim; everything else is `Transport`.
fn classify_transport(err: TransportError) -> ChainError {
	match err.as_error_resp() {
		Some(payload) => ChainError::Rejected(payload.message.to_string()),
		None => ChainError::Transport(err.to_string()),
	}
}

fn classify_pending(tx_hash: B256, err: PendingTransactionError) -> ChainError {
	match err {
		PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
			ChainError::ConfirmationTimeout { tx_hash }
		},
		PendingTransactionError::TransportError(err) => classify_transport(err),
		other => ChainError::Transport(other.to_string()),
	}
}
