//! Single-contract deployment.

use crate::artifacts::ArtifactStore;
use crate::sequencer::StepError;
use alloy_primitives::U256;
use deployer_chain::{abi, ChainClient};
use deployer_types::{Deployment, DeploymentRecord};
use tracing::info;

/// One contract to deploy, arguments already resolved to display strings.
pub(crate) struct DeployRequest<'a> {
	pub alias: &'a str,
	pub contract: &'a str,
	pub source_file: Option<&'a str>,
	pub params: &'a [String],
	pub args: Vec<String>,
	pub value: U256,
	pub confirmations: u64,
}

/// Deploys one contract and builds the registry record for it.
///
/// Creation bytecode comes from the artifact store; constructor arguments
/// are ABI-coded and appended. The record keeps the argument strings so the
/// deployment can be verified against the source later.
pub(crate) async fn deploy_contract(
	client: &dyn ChainClient,
	artifacts: &ArtifactStore,
	request: DeployRequest<'_>,
) -> Result<(DeploymentRecord, Deployment), StepError> {
	let mut init_code = artifacts.creation_bytecode(request.contract, request.source_file)?;
	let encoded_args = abi::encode_constructor_args(request.params, &request.args)?;
	init_code.extend_from_slice(&encoded_args);

	info!(
		alias = %request.alias,
		contract = %request.contract,
		"deploying contract"
	);
	let deployment = client
		.deploy(
			request.contract,
			init_code,
			request.value,
			request.confirmations,
		)
		.await?;
	info!(
		alias = %request.alias,
		address = %deployment.address,
		tx_hash = %deployment.tx_hash,
		"contract deployed"
	);

	let file_stem = request.source_file.unwrap_or(request.contract);
	let record = DeploymentRecord {
		contract_name: request.contract.to_string(),
		contract_file: format!("{file_stem}.sol"),
		address: deployment.address,
		constructor_args: request.args,
	};
	Ok((record, deployment))
}
