//! The address registry: ordered alias-to-record map with two JSON views.

use alloy_primitives::Address;
use deployer_types::DeploymentRecord;
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Errors from loading or persisting the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
	#[error("registry io: {0}")]
	Io(#[from] std::io::Error),
	#[error("registry parse: {0}")]
	Parse(#[from] serde_json::Error),
}

/// Ordered map of alias to deployment record, persisted as two views:
/// the full records file and a compact alias-to-address list.
///
/// Aliases keep the position of their first insertion; re-registering an
/// alias replaces the record in place, so the files stay reviewable as a
/// chronological account of the deployment.
pub struct AddressRegistry {
	records_path: PathBuf,
	list_path: PathBuf,
	records: IndexMap<String, DeploymentRecord>,
	dirty: bool,
}

impl AddressRegistry {
	/// Opens the registry, loading existing records from `records_path`
	/// if the file is present. The list view is derived state and is
	/// never read back.
	pub fn open(
		records_path: impl Into<PathBuf>,
		list_path: impl Into<PathBuf>,
	) -> Result<Self, RegistryError> {
		let records_path = records_path.into();
		let list_path = list_path.into();
		let records = if records_path.exists() {
			let bytes = fs::read(&records_path)?;
			let records: IndexMap<String, DeploymentRecord> = serde_json::from_slice(&bytes)?;
			debug!(
				path = %records_path.display(),
				aliases = records.len(),
				"loaded existing registry"
			);
			records
		} else {
			IndexMap::new()
		};
		Ok(Self {
			records_path,
			list_path,
			records,
			dirty: false,
		})
	}

	pub fn contains(&self, alias: &str) -> bool {
		self.records.contains_key(alias)
	}

	pub fn get(&self, alias: &str) -> Option<&DeploymentRecord> {
		self.records.get(alias)
	}

	/// Address registered under `alias`, if any.
	pub fn address_of(&self, alias: &str) -> Option<Address> {
		self.records.get(alias).map(|record| record.address)
	}

	/// Registers `record` under `alias`. A repeated alias replaces the
	/// record but keeps its original position.
	pub fn insert(&mut self, alias: impl Into<String>, record: DeploymentRecord) {
		let alias = alias.into();
		debug!(%alias, address = %record.address, "registering deployment");
		self.records.insert(alias, record);
		self.dirty = true;
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Records in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &DeploymentRecord)> {
		self.records
			.iter()
			.map(|(alias, record)| (alias.as_str(), record))
	}

	/// Whether there are registrations not yet written to disk.
	pub fn is_dirty(&self) -> bool {
		self.dirty
	}

	/// Writes both views to disk atomically. A no-op when nothing changed
	/// since the last flush.
	pub fn flush(&mut self) -> Result<(), RegistryError> {
		if !self.dirty {
			return Ok(());
		}
		let list: IndexMap<&str, Address> = self
			.records
			.iter()
			.map(|(alias, record)| (alias.as_str(), record.address))
			.collect();
		write_atomic(&self.records_path, &serde_json::to_vec_pretty(&self.records)?)?;
		write_atomic(&self.list_path, &serde_json::to_vec_pretty(&list)?)?;
		self.dirty = false;
		debug!(
			path = %self.records_path.display(),
			aliases = self.records.len(),
			"flushed registry"
		);
		Ok(())
	}
}

/// Last-resort flush so registrations survive a panic mid-step. The
/// orchestrator flushes explicitly after every step; this only fires when
/// an unwind skips that.
impl Drop for AddressRegistry {
	fn drop(&mut self) {
		if self.dirty {
			if let Err(err) = self.flush() {
				warn!(%err, "failed to flush registry on drop");
			}
		}
	}
}

/// Writes to a temp file in the same directory, then renames into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			fs::create_dir_all(parent)?;
		}
	}
	let temp_path = path.with_extension("tmp");
	fs::write(&temp_path, bytes)?;
	fs::rename(&temp_path, path)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;
	use tempfile::TempDir;

	fn record(name: &str, addr: Address) -> DeploymentRecord {
		DeploymentRecord {
			contract_name: name.to_string(),
			contract_file: format!("{name}.sol"),
			address: addr,
			constructor_args: Vec::new(),
		}
	}

	#[test]
	fn test_flush_writes_both_views() {
		let dir = TempDir::new().unwrap();
		let records_path = dir.path().join("address.json");
		let list_path = dir.path().join("addressList.json");

		let mut registry = AddressRegistry::open(&records_path, &list_path).unwrap();
		registry.insert(
			"FFactory",
			record(
				"FFactory",
				address!("00000000000000000000000000000000000000aa"),
			),
		);
		registry.flush().unwrap();

		let records: serde_json::Value =
			serde_json::from_slice(&fs::read(&records_path).unwrap()).unwrap();
		assert_eq!(records["FFactory"]["contractName"], "FFactory");
		assert_eq!(records["FFactory"]["contractFile"], "FFactory.sol");

		let list: IndexMap<String, Address> =
			serde_json::from_slice(&fs::read(&list_path).unwrap()).unwrap();
		assert_eq!(
			list.get("FFactory"),
			Some(&address!("00000000000000000000000000000000000000aa"))
		);
	}

	#[test]
	fn test_reload_preserves_insertion_order() {
		let dir = TempDir::new().unwrap();
		let records_path = dir.path().join("address.json");
		let list_path = dir.path().join("addressList.json");

		{
			let mut registry = AddressRegistry::open(&records_path, &list_path).unwrap();
			registry.insert(
				"B",
				record("B", address!("00000000000000000000000000000000000000bb")),
			);
			registry.insert(
				"A",
				record("A", address!("00000000000000000000000000000000000000aa")),
			);
			registry.flush().unwrap();
		}

		let registry = AddressRegistry::open(&records_path, &list_path).unwrap();
		let aliases: Vec<&str> = registry.iter().map(|(alias, _)| alias).collect();
		assert_eq!(aliases, vec!["B", "A"]);

		// The serialized text keeps the same order.
		let text = fs::read_to_string(&records_path).unwrap();
		assert!(text.find("\"B\"").unwrap() < text.find("\"A\"").unwrap());
	}

	#[test]
	fn test_reinsert_replaces_in_place() {
		let dir = TempDir::new().unwrap();
		let mut registry = AddressRegistry::open(
			dir.path().join("address.json"),
			dir.path().join("addressList.json"),
		)
		.unwrap();
		registry.insert(
			"A",
			record("A", address!("00000000000000000000000000000000000000aa")),
		);
		registry.insert(
			"B",
			record("B", address!("00000000000000000000000000000000000000bb")),
		);
		registry.insert(
			"A",
			record("A2", address!("00000000000000000000000000000000000000cc")),
		);

		let aliases: Vec<&str> = registry.iter().map(|(alias, _)| alias).collect();
		assert_eq!(aliases, vec!["A", "B"]);
		assert_eq!(
			registry.address_of("A"),
			Some(address!("00000000000000000000000000000000000000cc"))
		);
	}

	#[test]
	fn test_flush_without_changes_is_a_noop() {
		let dir = TempDir::new().unwrap();
		let records_path = dir.path().join("address.json");
		let mut registry =
			AddressRegistry::open(&records_path, dir.path().join("addressList.json")).unwrap();

		registry.flush().unwrap();
		// Nothing registered and nothing dirty: no files created.
		assert!(!records_path.exists());

		registry.insert(
			"A",
			record("A", address!("00000000000000000000000000000000000000aa")),
		);
		registry.flush().unwrap();
		assert!(!registry.is_dirty());
		assert!(records_path.exists());
	}

	#[test]
	fn test_drop_flushes_pending_registrations() {
		let dir = TempDir::new().unwrap();
		let records_path = dir.path().join("address.json");
		{
			let mut registry =
				AddressRegistry::open(&records_path, dir.path().join("addressList.json"))
					.unwrap();
			registry.insert(
				"A",
				record("A", address!("00000000000000000000000000000000000000aa")),
			);
			// Dropped without an explicit flush.
		}
		assert!(records_path.exists());
	}
}
