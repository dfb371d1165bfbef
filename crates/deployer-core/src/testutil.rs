//! Scripted in-memory chain for sequencer tests.

use crate::inspector::{ADMIN_SLOT, IMPLEMENTATION_SLOT};
use alloy_primitives::{Address, Bytes, B256, U160, U256};
use async_trait::async_trait;
use deployer_chain::{ChainClient, ChainError};
use deployer_types::{Deployment, FunctionCall};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct DeployCall {
	pub contract: String,
	pub address: Address,
	pub value: U256,
	pub confirmations: u64,
	pub init_code: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SendCall {
	pub to: Address,
	pub signature: String,
	pub args: Vec<String>,
	pub value: U256,
	pub tx_hash: B256,
}

/// In-memory [`ChainClient`] with deterministic addresses and scriptable
/// results.
///
/// Deployments get sequential addresses. When a contract named
/// `TransparentUpgradeableProxy` is deployed, its implementation and admin
/// slots are wired from the most recent implementation and `ProxyAdmin`
/// deployments, mirroring what the proxy constructor records on a real
/// chain. Read-only call results are scripted per function name; an
/// unscripted call returns a zero word.
pub struct FakeChain {
	signer: Address,
	deploys: Mutex<Vec<DeployCall>>,
	sends: Mutex<Vec<SendCall>>,
	calls: Mutex<Vec<(Address, String)>>,
	call_results: Mutex<HashMap<String, VecDeque<Bytes>>>,
	waits: Mutex<Vec<(B256, u64)>>,
	wait_failures: Mutex<VecDeque<ChainError>>,
	storage: Mutex<HashMap<(Address, B256), B256>>,
	slot_reads: Mutex<usize>,
	wire_proxies: AtomicBool,
	next_nonce: Mutex<u64>,
}

impl FakeChain {
	pub fn new() -> Self {
		Self {
			signer: Address::repeat_byte(0xee),
			deploys: Mutex::new(Vec::new()),
			sends: Mutex::new(Vec::new()),
			calls: Mutex::new(Vec::new()),
			call_results: Mutex::new(HashMap::new()),
			waits: Mutex::new(Vec::new()),
			wait_failures: Mutex::new(VecDeque::new()),
			storage: Mutex::new(HashMap::new()),
			slot_reads: Mutex::new(0),
			wire_proxies: AtomicBool::new(true),
			next_nonce: Mutex::new(0),
		}
	}

	/// Stops wiring proxy slots on deployment, leaving them zeroed.
	pub fn disable_proxy_wiring(&self) {
		self.wire_proxies.store(false, Ordering::Relaxed);
	}

	/// Queues the return data for the next read-only call of `function`.
	pub fn script_call_result(&self, function: &str, data: impl Into<Bytes>) {
		self.call_results
			.lock()
			.unwrap()
			.entry(function.to_string())
			.or_default()
			.push_back(data.into());
	}

	/// Makes the next `wait_for_confirmations` fail with `error`.
	pub fn script_wait_failure(&self, error: ChainError) {
		self.wait_failures.lock().unwrap().push_back(error);
	}

	pub fn deploys(&self) -> Vec<DeployCall> {
		self.deploys.lock().unwrap().clone()
	}

	pub fn sends(&self) -> Vec<SendCall> {
		self.sends.lock().unwrap().clone()
	}

	pub fn calls(&self) -> Vec<(Address, String)> {
		self.calls.lock().unwrap().clone()
	}

	pub fn waits(&self) -> Vec<(B256, u64)> {
		self.waits.lock().unwrap().clone()
	}

	/// Number of state-changing submissions so far.
	pub fn mutating_calls(&self) -> usize {
		self.deploys.lock().unwrap().len() + self.sends.lock().unwrap().len()
	}

	/// Total chain interactions of any kind, reads included.
	pub fn total_interactions(&self) -> usize {
		self.mutating_calls()
			+ self.calls.lock().unwrap().len()
			+ *self.slot_reads.lock().unwrap()
	}

	pub fn storage_at(&self, address: Address, slot: B256) -> B256 {
		self.storage
			.lock()
			.unwrap()
			.get(&(address, slot))
			.copied()
			.unwrap_or(B256::ZERO)
	}

	fn next_address(&self) -> Address {
		let mut nonce = self.next_nonce.lock().unwrap();
		*nonce += 1;
		Address::from(U160::from(0x1000 + *nonce))
	}

	fn next_tx_hash(&self) -> B256 {
		let nonce = {
			let mut nonce = self.next_nonce.lock().unwrap();
			*nonce += 1;
			*nonce
		};
		B256::from(U256::from(0xff00_0000u64 + nonce))
	}

	/// Mirrors the wiring the transparent proxy constructor performs: the
	/// implementation slot points at the latest non-infrastructure deploy
	/// and the admin slot at the latest `ProxyAdmin`.
	fn wire_proxy(&self, proxy: Address) {
		let deploys = self.deploys.lock().unwrap();
		let implementation = deploys
			.iter()
			.rev()
			.find(|call| {
				call.contract != "TransparentUpgradeableProxy" && call.contract != "ProxyAdmin"
			})
			.map(|call| call.address);
		let admin = deploys
			.iter()
			.rev()
			.find(|call| call.contract == "ProxyAdmin")
			.map(|call| call.address);
		drop(deploys);

		let mut storage = self.storage.lock().unwrap();
		if let Some(implementation) = implementation {
			storage.insert(
				(proxy, IMPLEMENTATION_SLOT),
				implementation.into_word(),
			);
		}
		if let Some(admin) = admin {
			storage.insert((proxy, ADMIN_SLOT), admin.into_word());
		}
	}
}

#[async_trait]
impl ChainClient for FakeChain {
	fn signer_address(&self) -> Address {
		self.signer
	}

	async fn deploy(
		&self,
		contract: &str,
		init_code: Vec<u8>,
		value: U256,
		confirmations: u64,
	) -> Result<Deployment, ChainError> {
		let address = self.next_address();
		if contract == "TransparentUpgradeableProxy" && self.wire_proxies.load(Ordering::Relaxed) {
			self.wire_proxy(address);
		}
		self.deploys.lock().unwrap().push(DeployCall {
			contract: contract.to_string(),
			address,
			value,
			confirmations,
			init_code,
		});
		Ok(Deployment {
			address,
			tx_hash: self.next_tx_hash(),
		})
	}

	async fn call(&self, to: Address, call: &FunctionCall) -> Result<Bytes, ChainError> {
		self.calls.lock().unwrap().push((to, call.signature()));
		let result = self
			.call_results
			.lock()
			.unwrap()
			.get_mut(&call.name)
			.and_then(|queue| queue.pop_front());
		Ok(result.unwrap_or_else(|| Bytes::from(vec![0u8; 32])))
	}

	async fn send(
		&self,
		to: Address,
		call: &FunctionCall,
		value: U256,
	) -> Result<B256, ChainError> {
		let tx_hash = self.next_tx_hash();
		self.sends.lock().unwrap().push(SendCall {
			to,
			signature: call.signature(),
			args: call.args.clone(),
			value,
			tx_hash,
		});
		Ok(tx_hash)
	}

	async fn wait_for_confirmations(
		&self,
		tx_hash: B256,
		confirmations: u64,
	) -> Result<(), ChainError> {
		if let Some(error) = self.wait_failures.lock().unwrap().pop_front() {
			return Err(error);
		}
		self.waits.lock().unwrap().push((tx_hash, confirmations));
		Ok(())
	}

	async fn read_storage_slot(&self, address: Address, slot: B256) -> Result<B256, ChainError> {
		*self.slot_reads.lock().unwrap() += 1;
		Ok(self.storage_at(address, slot))
	}
}
