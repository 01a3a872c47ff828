//! Append-only stock ledger.
//!
//! Entries are chained by hash on the server. The client only checks that the
//! listing it received links up; it never recomputes a hash.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{EntityId, EntityKind};
use crate::record::{FieldChanges, Patch, Record, overwrite, present};

/// `previous_hash` of the first entry in the chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// What a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
	/// A new SKU entered the inventory.
	Register,
	/// Units left the stockroom.
	Purchase,
	/// Units arrived from a supplier.
	Restock,
}

impl fmt::Display for TransactionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Register => "register",
			Self::Purchase => "purchase",
			Self::Restock => "restock",
		})
	}
}

/// A single ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
	/// Identifier assigned by the server.
	pub id: EntityId,
	/// What happened.
	pub transaction_type: TransactionKind,
	/// Affected SKU.
	pub sku: String,
	/// Units involved.
	pub quantity: i64,
	/// Hash of the preceding entry.
	pub previous_hash: String,
	/// Time the entry was appended.
	#[serde(deserialize_with = "crate::time::deserialize")]
	pub timestamp: DateTime<Utc>,
	/// Hash of this entry.
	pub hash: String,
}

/// Sparse update for a [`LedgerEntry`].
///
/// Entries are immutable once appended, so in practice the ledger is only ever
/// re-read in full. The patch exists so the ledger can share the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPatch {
	/// Target entry.
	pub id: EntityId,
	/// Producer-assigned version, when the stream carries one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<u64>,
	/// Replacement kind.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub transaction_type: Option<TransactionKind>,
	/// Replacement SKU.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sku: Option<String>,
	/// Replacement quantity.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub quantity: Option<i64>,
	/// Replacement previous hash.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub previous_hash: Option<String>,
	/// Replacement hash.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub hash: Option<String>,
}

impl Record for LedgerEntry {
	type Patch = LedgerPatch;

	const KIND: EntityKind = EntityKind::Ledger;

	fn id(&self) -> &EntityId {
		&self.id
	}

	fn merge(&mut self, patch: &LedgerPatch) -> FieldChanges {
		let mut changes = FieldChanges::new();
		overwrite(&mut changes, "transaction_type", &mut self.transaction_type, patch.transaction_type.as_ref());
		overwrite(&mut changes, "sku", &mut self.sku, patch.sku.as_ref());
		overwrite(&mut changes, "quantity", &mut self.quantity, patch.quantity.as_ref());
		overwrite(&mut changes, "previous_hash", &mut self.previous_hash, patch.previous_hash.as_ref());
		overwrite(&mut changes, "hash", &mut self.hash, patch.hash.as_ref());
		changes
	}
}

impl Patch for LedgerPatch {
	fn id(&self) -> &EntityId {
		&self.id
	}

	fn version(&self) -> Option<u64> {
		self.version
	}

	fn field_names(&self) -> Vec<&'static str> {
		let mut names = Vec::new();
		present(&mut names, "transaction_type", &self.transaction_type);
		present(&mut names, "sku", &self.sku);
		present(&mut names, "quantity", &self.quantity);
		present(&mut names, "previous_hash", &self.previous_hash);
		present(&mut names, "hash", &self.hash);
		names
	}
}

/// A link that does not connect to the next-older entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBreak {
	/// Entry whose `previous_hash` does not match.
	pub id: EntityId,
	/// Hash the entry claims to follow.
	pub expected: String,
	/// Hash of the entry actually listed below it.
	pub found: String,
}

/// Result of [`verify_links`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainReport {
	/// Number of entries inspected.
	pub checked: usize,
	/// Links that do not connect.
	pub breaks: Vec<ChainBreak>,
	/// True when the oldest listed entry does not start at [`GENESIS_HASH`],
	/// i.e. the listing is a window onto a longer chain.
	pub truncated: bool,
}

impl ChainReport {
	/// Returns true when every listed link connects.
	pub fn is_intact(&self) -> bool {
		self.breaks.is_empty()
	}
}

/// Checks that a newest-first listing of ledger entries links up.
pub fn verify_links(entries: &[LedgerEntry]) -> ChainReport {
	let mut report = ChainReport {
		checked: entries.len(),
		..ChainReport::default()
	};

	for pair in entries.windows(2) {
		let (newer, older) = (&pair[0], &pair[1]);
		if newer.previous_hash != older.hash {
			report.breaks.push(ChainBreak {
				id: newer.id.clone(),
				expected: newer.previous_hash.clone(),
				found: older.hash.clone(),
			});
		}
	}

	if let Some(oldest) = entries.last() {
		report.truncated = oldest.previous_hash != GENESIS_HASH;
	}
	report
}

#[cfg(test)]
mod tests {
	use chrono::TimeZone;
	use pretty_assertions::assert_eq;

	use super::*;

	fn entry(id: &str, previous: &str, hash: &str) -> LedgerEntry {
		LedgerEntry {
			id: EntityId::new(id),
			transaction_type: TransactionKind::Restock,
			sku: "WID-1".into(),
			quantity: 1,
			previous_hash: previous.into(),
			timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
			hash: hash.into(),
		}
	}

	#[test]
	fn test_intact_chain_from_genesis() {
		let entries = vec![entry("T3", "bb", "cc"), entry("T2", "aa", "bb"), entry("T1", GENESIS_HASH, "aa")];
		let report = verify_links(&entries);
		assert!(report.is_intact());
		assert!(!report.truncated);
		assert_eq!(report.checked, 3);
	}

	#[test]
	fn test_broken_link_is_reported() {
		let entries = vec![entry("T3", "zz", "cc"), entry("T2", "aa", "bb")];
		let report = verify_links(&entries);
		assert_eq!(
			report.breaks,
			vec![ChainBreak {
				id: EntityId::new("T3"),
				expected: "zz".into(),
				found: "bb".into(),
			}]
		);
		assert!(report.truncated);
	}

	#[test]
	fn test_empty_listing_is_intact() {
		let report = verify_links(&[]);
		assert!(report.is_intact());
		assert!(!report.truncated);
	}
}
