//! Append-only transaction ledger.

use deployer_types::LedgerEntry;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Appends one JSON line per confirmed function call to the ledger file.
///
/// The ledger is a convenience record, not orchestration state: nothing
/// reads it back, and a failed append logs a warning and moves on rather
/// than failing the step that produced it.
pub struct TransactionLedger {
	path: PathBuf,
}

impl TransactionLedger {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Appends `entry` as one line of JSON. Errors are logged and swallowed.
	pub fn record(&self, entry: &LedgerEntry) {
		if let Err(err) = self.append(entry) {
			warn!(
				path = %self.path.display(),
				alias = %entry.alias,
				%err,
				"failed to append ledger entry; continuing"
			);
			return;
		}
		debug!(
			alias = %entry.alias,
			function = %entry.function_signature,
			tx_hash = %entry.tx_hash,
			"ledger entry appended"
		);
	}

	fn append(&self, entry: &LedgerEntry) -> Result<(), std::io::Error> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				std::fs::create_dir_all(parent)?;
			}
		}
		let mut line = serde_json::to_vec(entry).map_err(std::io::Error::other)?;
		line.push(b'\n');
		let mut file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(&self.path)?;
		file.write_all(&line)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, b256, U256};
	use deployer_types::FunctionCall;
	use tempfile::TempDir;

	fn entry(alias: &str) -> LedgerEntry {
		let call = FunctionCall::new(
			"initialize",
			vec!["address".to_string()],
			vec!["0x00000000000000000000000000000000000000aa".to_string()],
		);
		LedgerEntry::new(
			alias,
			&call,
			address!("00000000000000000000000000000000000000bb"),
			address!("00000000000000000000000000000000000000cc"),
			b256!("2222222222222222222222222222222222222222222222222222222222222222"),
			U256::ZERO,
		)
	}

	#[test]
	fn test_appends_one_line_per_entry() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("transactions.jsonl");
		let ledger = TransactionLedger::new(&path);

		ledger.record(&entry("FFactoryProxy"));
		ledger.record(&entry("FRouterProxy"));

		let text = std::fs::read_to_string(&path).unwrap();
		let lines: Vec<&str> = text.lines().collect();
		assert_eq!(lines.len(), 2);
		let first: LedgerEntry = serde_json::from_str(lines[0]).unwrap();
		assert_eq!(first.alias, "FFactoryProxy");
		let second: LedgerEntry = serde_json::from_str(lines[1]).unwrap();
		assert_eq!(second.alias, "FRouterProxy");
	}

	#[test]
	fn test_append_failure_does_not_panic() {
		let dir = TempDir::new().unwrap();
		// The ledger path is a directory: every append fails, record still
		// returns normally.
		let ledger = TransactionLedger::new(dir.path());
		ledger.record(&entry("FFactoryProxy"));
	}
}
