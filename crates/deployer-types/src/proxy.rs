//! Proxy wiring descriptions and slot inspection results.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// The three aliases a proxy pair deployment ties together.
///
/// Later steps address the pair through `proxy_alias`; the implementation
/// and admin aliases exist for review and upgrades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyBinding {
	/// Alias of the implementation contract.
	pub implementation_alias: String,
	/// Functional alias of the proxy.
	pub proxy_alias: String,
	/// Alias of the ProxyAdmin controlling upgrades.
	pub admin_alias: String,
}

/// Addresses read from a contract's standardized proxy storage slots.
///
/// A slot holding zero reads as `None`; a non-proxy contract yields all
/// `None`, which is a valid answer rather than an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProxySlots {
	/// Implementation the proxy delegates to.
	pub implementation: Option<Address>,
	/// Admin allowed to upgrade the proxy.
	pub admin: Option<Address>,
	/// Beacon, for beacon-style proxies.
	pub beacon: Option<Address>,
}

impl ProxySlots {
	/// Whether any slot is populated, i.e. the address looks like a proxy.
	pub fn is_proxy(&self) -> bool {
		self.implementation.is_some() || self.admin.is_some() || self.beacon.is_some()
	}
}
