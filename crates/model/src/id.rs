//! Entity identifiers and entity kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of an entity, unique within its collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
	/// Wraps a raw identifier.
	pub fn new(raw: impl Into<String>) -> Self {
		Self(raw.into())
	}

	/// Returns the identifier as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for EntityId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for EntityId {
	fn from(raw: &str) -> Self {
		Self::new(raw)
	}
}

impl From<String> for EntityId {
	fn from(raw: String) -> Self {
		Self(raw)
	}
}

/// The collections exposed by the dashboard API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
	/// Scheduled deliveries, updated live over a push channel.
	Delivery,
	/// Stock-keeping units and their quantities.
	Inventory,
	/// Append-only transaction ledger.
	Ledger,
}

impl EntityKind {
	/// Path segment of the bulk read endpoint, relative to the API root.
	pub const fn collection_path(self) -> &'static str {
		match self {
			Self::Delivery => "delivery",
			Self::Inventory => "inventory",
			Self::Ledger => "blockchain",
		}
	}

	/// Path of the push channel for this kind, if the server streams updates for it.
	pub const fn push_path(self) -> Option<&'static str> {
		match self {
			Self::Delivery => Some("/ws/delivery"),
			Self::Inventory | Self::Ledger => None,
		}
	}

	/// Short lowercase label used in logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Delivery => "delivery",
			Self::Inventory => "inventory",
			Self::Ledger => "ledger",
		}
	}
}

impl fmt::Display for EntityKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
