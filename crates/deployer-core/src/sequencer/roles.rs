//! Role grants with on-chain verification.

use crate::sequencer::StepError;
use alloy_primitives::{Address, B256, U256};
use deployer_chain::abi::{self, DynSolValue};
use deployer_chain::{ChainClient, ChainError};
use deployer_types::FunctionCall;
use tracing::{debug, info};

/// Grants a role to `grantee` on the contract at `target`.
///
/// The role identifier is read from the contract through its getter rather
/// than taken from the program, so a program cannot drift from the deployed
/// contract version. When `verify` is set, membership is read back after
/// the grant confirms; a grant the contract silently ignored fails the step.
///
/// Returns the grant call and its transaction hash for the ledger.
pub(crate) async fn grant_role(
	client: &dyn ChainClient,
	alias: &str,
	target: Address,
	role_getter: &str,
	grantee: Address,
	verify: bool,
	confirmations: u64,
) -> Result<(FunctionCall, B256), StepError> {
	let getter = FunctionCall::no_args(role_getter);
	let data = client.call(target, &getter).await?;
	let role = decode_role(role_getter, &data)?;
	debug!(%alias, role_getter, role = %role, "resolved role identifier");

	let grant = FunctionCall::new(
		"grantRole",
		vec!["bytes32".to_string(), "address".to_string()],
		vec![role.to_string(), grantee.to_string()],
	);
	info!(%alias, role_getter, %grantee, "granting role");
	let tx_hash = client.send(target, &grant, U256::ZERO).await?;
	client.wait_for_confirmations(tx_hash, confirmations).await?;

	if verify {
		let check = FunctionCall::new(
			"hasRole",
			vec!["bytes32".to_string(), "address".to_string()],
			vec![role.to_string(), grantee.to_string()],
		);
		let data = client.call(target, &check).await?;
		let confirmed = abi::decode_single("bool", &data)?
			.as_bool()
			.unwrap_or(false);
		if !confirmed {
			return Err(StepError::PermissionNotConfirmed {
				role: role_getter.to_string(),
				grantee,
			});
		}
		debug!(%alias, role_getter, %grantee, "role membership verified");
	}

	Ok((grant, tx_hash))
}

fn decode_role(role_getter: &str, data: &[u8]) -> Result<B256, StepError> {
	match abi::decode_single("bytes32", data)? {
		DynSolValue::FixedBytes(word, 32) => Ok(word),
		other => Err(ChainError::Encoding(format!(
			"{role_getter}() returned {other:?}, expected bytes32"
		))
		.into()),
	}
}
