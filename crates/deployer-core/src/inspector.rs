//! Standardized proxy storage slot inspection.

use alloy_primitives::{b256, Address, B256};
use deployer_chain::{ChainClient, ChainError};
use deployer_types::ProxySlots;
use std::sync::Arc;

/// Implementation slot: `keccak256("eip1967.proxy.implementation") - 1`.
pub const IMPLEMENTATION_SLOT: B256 =
	b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// Admin slot: `keccak256("eip1967.proxy.admin") - 1`.
pub const ADMIN_SLOT: B256 =
	b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

/// Beacon slot: `keccak256("eip1967.proxy.beacon") - 1`.
pub const BEACON_SLOT: B256 =
	b256!("a3f0ad74e5423aebfd80d3ef4346578335a9a72aeaee59ff6cb3582b35133d50");

/// Reads the standardized proxy slots of an arbitrary address.
///
/// Works on any contract: a non-proxy simply reads as three empty slots,
/// which callers treat as "not a proxy" rather than an error.
pub struct ProxySlotInspector {
	client: Arc<dyn ChainClient>,
}

impl ProxySlotInspector {
	pub fn new(client: Arc<dyn ChainClient>) -> Self {
		Self { client }
	}

	/// Reads the implementation, admin and beacon slots of `address`.
	pub async fn inspect(&self, address: Address) -> Result<ProxySlots, ChainError> {
		Ok(ProxySlots {
			implementation: self.read_slot_address(address, IMPLEMENTATION_SLOT).await?,
			admin: self.read_slot_address(address, ADMIN_SLOT).await?,
			beacon: self.read_slot_address(address, BEACON_SLOT).await?,
		})
	}

	async fn read_slot_address(
		&self,
		address: Address,
		slot: B256,
	) -> Result<Option<Address>, ChainError> {
		let word = self.client.read_storage_slot(address, slot).await?;
		Ok(address_from_word(word))
	}
}

/// Low 20 bytes of a storage word as an address; zero reads as `None`.
fn address_from_word(word: B256) -> Option<Address> {
	let address = Address::from_word(word);
	(!address.is_zero()).then_some(address)
}
