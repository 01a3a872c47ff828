//! Inventory items and stock mutations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{EntityId, EntityKind};
use crate::record::{FieldChanges, Patch, Record, nullable, overwrite, present};

/// A stock-keeping unit tracked by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
	/// Identifier assigned by the server.
	pub id: EntityId,
	/// Stock-keeping unit, unique across the inventory.
	pub sku: String,
	/// Display name.
	pub name: String,
	/// Longer description.
	pub description: String,
	/// Units on hand.
	pub quantity: i64,
	/// Quantity at or below which the item needs reordering.
	pub reorder_threshold: i64,
	/// Unit price.
	pub price: f64,
	/// Free-form category.
	pub category: String,
	/// Product image, if any.
	#[serde(default)]
	pub image_url: Option<String>,
	/// Creation time.
	#[serde(deserialize_with = "crate::time::deserialize")]
	pub created_at: DateTime<Utc>,
	/// Time of the last server-side change.
	#[serde(deserialize_with = "crate::time::deserialize")]
	pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
	/// Returns true when the quantity has reached the reorder threshold.
	pub fn is_low_stock(&self) -> bool {
		self.quantity <= self.reorder_threshold
	}
}

/// Sparse update for an [`InventoryItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryPatch {
	/// Target item.
	pub id: EntityId,
	/// Producer-assigned version, when the stream carries one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<u64>,
	/// New SKU.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sku: Option<String>,
	/// New name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// New description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// New quantity on hand.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub quantity: Option<i64>,
	/// New reorder threshold.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reorder_threshold: Option<i64>,
	/// New unit price.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub price: Option<f64>,
	/// New category.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	/// New image; `Some(None)` clears it.
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
	pub image_url: Option<Option<String>>,
	/// New modification time.
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::time::option::deserialize")]
	pub updated_at: Option<DateTime<Utc>>,
}

impl InventoryPatch {
	/// Creates an empty patch for `id`.
	pub fn new(id: impl Into<EntityId>) -> Self {
		Self {
			id: id.into(),
			version: None,
			sku: None,
			name: None,
			description: None,
			quantity: None,
			reorder_threshold: None,
			price: None,
			category: None,
			image_url: None,
			updated_at: None,
		}
	}

	/// Sets the quantity on hand.
	pub fn quantity(mut self, quantity: i64) -> Self {
		self.quantity = Some(quantity);
		self
	}
}

impl Record for InventoryItem {
	type Patch = InventoryPatch;

	const KIND: EntityKind = EntityKind::Inventory;

	fn id(&self) -> &EntityId {
		&self.id
	}

	fn merge(&mut self, patch: &InventoryPatch) -> FieldChanges {
		let mut changes = FieldChanges::new();
		overwrite(&mut changes, "sku", &mut self.sku, patch.sku.as_ref());
		overwrite(&mut changes, "name", &mut self.name, patch.name.as_ref());
		overwrite(&mut changes, "description", &mut self.description, patch.description.as_ref());
		overwrite(&mut changes, "quantity", &mut self.quantity, patch.quantity.as_ref());
		overwrite(&mut changes, "reorder_threshold", &mut self.reorder_threshold, patch.reorder_threshold.as_ref());
		overwrite(&mut changes, "price", &mut self.price, patch.price.as_ref());
		overwrite(&mut changes, "category", &mut self.category, patch.category.as_ref());
		overwrite(&mut changes, "image_url", &mut self.image_url, patch.image_url.as_ref());
		overwrite(&mut changes, "updated_at", &mut self.updated_at, patch.updated_at.as_ref());
		changes
	}
}

impl Patch for InventoryPatch {
	fn id(&self) -> &EntityId {
		&self.id
	}

	fn version(&self) -> Option<u64> {
		self.version
	}

	fn field_names(&self) -> Vec<&'static str> {
		let mut names = Vec::new();
		present(&mut names, "sku", &self.sku);
		present(&mut names, "name", &self.name);
		present(&mut names, "description", &self.description);
		present(&mut names, "quantity", &self.quantity);
		present(&mut names, "reorder_threshold", &self.reorder_threshold);
		present(&mut names, "price", &self.price);
		present(&mut names, "category", &self.category);
		present(&mut names, "image_url", &self.image_url);
		present(&mut names, "updated_at", &self.updated_at);
		names
	}
}

/// Request body for registering a new item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInventoryItem {
	/// Stock-keeping unit; the server rejects duplicates.
	pub sku: String,
	/// Display name.
	pub name: String,
	/// Longer description.
	pub description: String,
	/// Initial units on hand.
	pub quantity: i64,
	/// Reorder threshold.
	pub reorder_threshold: i64,
	/// Unit price.
	pub price: f64,
	/// Free-form category.
	pub category: String,
	/// Product image, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub image_url: Option<String>,
}

/// Direction of a stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAction {
	/// Units leave the stockroom.
	Purchase,
	/// Units arrive from a supplier.
	Restock,
}

impl StockAction {
	/// Wire name of the action.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Purchase => "purchase",
			Self::Restock => "restock",
		}
	}
}

impl fmt::Display for StockAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Request body for `PUT /inventory/{sku}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
	/// Units to add or remove.
	pub quantity: i64,
	/// Whether the units are added or removed.
	pub action: StockAction,
}

/// Response of a successful stock adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
	/// Human-readable confirmation.
	pub message: String,
	/// Quantity on hand after the adjustment.
	pub new_quantity: i64,
}
