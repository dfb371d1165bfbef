//! Registry records for deployed contracts.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// What the registry stores per alias: enough to review a deployment
/// and to re-run verification tooling against it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
	/// Contract name inside the artifact.
	pub contract_name: String,
	/// Source file the artifact was compiled from, e.g. `FFactory.sol`.
	pub contract_file: String,
	/// Deployed address.
	pub address: Address,
	/// Constructor arguments as passed, for later verification.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub constructor_args: Vec<String>,
}

/// Outcome of a confirmed contract deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
	/// Address the contract was created at.
	pub address: Address,
	/// Hash of the deployment transaction.
	pub tx_hash: B256,
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	#[test]
	fn test_record_serializes_camel_case() {
		let record = DeploymentRecord {
			contract_name: "FFactory".to_string(),
			contract_file: "FFactory.sol".to_string(),
			address: address!("00000000000000000000000000000000000000aa"),
			constructor_args: Vec::new(),
		};
		let json = serde_json::to_value(&record).unwrap();
		assert_eq!(json["contractName"], "FFactory");
		assert_eq!(json["contractFile"], "FFactory.sol");
		// Empty constructor args are omitted entirely.
		assert!(json.get("constructorArgs").is_none());
	}

	#[test]
	fn test_record_round_trips_constructor_args() {
		let record = DeploymentRecord {
			contract_name: "NetmindAgentNFT".to_string(),
			contract_file: "AgentNFT.sol".to_string(),
			address: address!("00000000000000000000000000000000000000bb"),
			constructor_args: vec!["0x00000000000000000000000000000000000000cc".to_string()],
		};
		let json = serde_json::to_string(&record).unwrap();
		let back: DeploymentRecord = serde_json::from_str(&json).unwrap();
		assert_eq!(back, record);
	}
}
