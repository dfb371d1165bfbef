//! Implementation, admin, and proxy deployment as one unit.
//!
//! A pair step deploys in a fixed order: implementation, then the shared
//! ProxyAdmin, then the transparent proxy pointing at both. Each component
//! is reused when its alias is already registered, which is what makes a
//! single admin alias shared across every pair of a program, and what makes
//! a half-finished pair resumable. After the proxy lands, its standardized
//! storage slots are read back and checked against the addresses that were
//! passed to the constructor.

use crate::artifacts::ArtifactStore;
use crate::inspector::{ADMIN_SLOT, IMPLEMENTATION_SLOT};
use crate::sequencer::deploy::{deploy_contract, DeployRequest};
use crate::sequencer::StepError;
use alloy_primitives::{hex, Address, U256};
use deployer_chain::{abi, ChainClient};
use deployer_registry::AddressRegistry;
use deployer_types::{FunctionCall, ProxyBinding, ProxyPairStep};
use tracing::{debug, info};

/// A pair step with its initializer call already resolved.
///
/// Initializer arguments resolve against the registry as it stood before
/// the step, so init data cannot reference the pair's own aliases.
pub(crate) struct PairRequest<'a> {
	pub step: &'a ProxyPairStep,
	pub init_call: Option<FunctionCall>,
	pub confirmations: u64,
}

pub(crate) async fn deploy_pair(
	client: &dyn ChainClient,
	artifacts: &ArtifactStore,
	registry: &mut AddressRegistry,
	request: PairRequest<'_>,
) -> Result<ProxyBinding, StepError> {
	let step = request.step;

	let implementation = match registry.address_of(&step.implementation) {
		Some(address) => {
			info!(alias = %step.implementation, %address, "reusing registered implementation");
			address
		},
		None => {
			let (record, deployment) = deploy_contract(
				client,
				artifacts,
				DeployRequest {
					alias: &step.implementation,
					contract: step.contract_name(),
					source_file: step.source_file.as_deref(),
					params: &[],
					args: Vec::new(),
					value: U256::ZERO,
					confirmations: request.confirmations,
				},
			)
			.await?;
			registry.insert(step.implementation.clone(), record);
			registry.flush()?;
			deployment.address
		},
	};

	let admin = match registry.address_of(&step.admin) {
		Some(address) => {
			info!(alias = %step.admin, %address, "reusing registered proxy admin");
			address
		},
		None => {
			let (record, deployment) = deploy_contract(
				client,
				artifacts,
				DeployRequest {
					alias: &step.admin,
					contract: &step.admin_contract,
					source_file: None,
					params: &[],
					args: Vec::new(),
					value: U256::ZERO,
					confirmations: request.confirmations,
				},
			)
			.await?;
			registry.insert(step.admin.clone(), record);
			registry.flush()?;
			deployment.address
		},
	};

	let proxy = match registry.address_of(&step.proxy) {
		Some(address) => {
			info!(alias = %step.proxy, %address, "reusing registered proxy");
			address
		},
		None => {
			let init_data = match &request.init_call {
				Some(call) => abi::encode_call(call)?,
				None => Vec::new(),
			};
			let args = vec![
				implementation.to_string(),
				admin.to_string(),
				hex::encode_prefixed(&init_data),
			];
			let (record, deployment) = deploy_contract(
				client,
				artifacts,
				DeployRequest {
					alias: &step.proxy,
					contract: &step.proxy_contract,
					source_file: None,
					params: &[
						"address".to_string(),
						"address".to_string(),
						"bytes".to_string(),
					],
					args,
					value: U256::ZERO,
					confirmations: request.confirmations,
				},
			)
			.await?;
			registry.insert(step.proxy.clone(), record);
			registry.flush()?;
			deployment.address
		},
	};

	if step.verify_slots {
		verify_wiring(client, &step.proxy, proxy, implementation, admin).await?;
	}

	Ok(ProxyBinding {
		implementation_alias: step.implementation.clone(),
		proxy_alias: step.proxy.clone(),
		admin_alias: step.admin.clone(),
	})
}

/// Reads the proxy's implementation and admin slots and checks them against
/// the constructor inputs. Catches wiring mistakes while the deployment is
/// still the only thing pointing at the proxy.
async fn verify_wiring(
	client: &dyn ChainClient,
	proxy_alias: &str,
	proxy: Address,
	implementation: Address,
	admin: Address,
) -> Result<(), StepError> {
	let word = client.read_storage_slot(proxy, IMPLEMENTATION_SLOT).await?;
	let found = Address::from_word(word);
	if found != implementation {
		return Err(StepError::ProxyVerification {
			proxy: proxy_alias.to_string(),
			reason: format!("implementation slot holds {found}, expected {implementation}"),
		});
	}

	let word = client.read_storage_slot(proxy, ADMIN_SLOT).await?;
	let found = Address::from_word(word);
	if found != admin {
		return Err(StepError::ProxyVerification {
			proxy: proxy_alias.to_string(),
			reason: format!("admin slot holds {found}, expected {admin}"),
		});
	}

	debug!(proxy = %proxy_alias, "proxy wiring verified");
	Ok(())
}
