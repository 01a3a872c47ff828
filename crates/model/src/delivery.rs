//! Delivery schedules and their live status updates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{EntityId, EntityKind};
use crate::record::{FieldChanges, Patch, Record, overwrite, present};

/// Named stages a delivery moves through, in order.
pub const ROUTE_STAGES: [&str; 6] = [
	"Warehouse",
	"Processing Center",
	"In Transit",
	"Local Hub",
	"Out for Delivery",
	"Delivered",
];

/// Lifecycle status of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
	/// Scheduled, not yet picked up.
	Pending,
	/// Somewhere between the warehouse and the customer.
	InTransit,
	/// Handed over.
	Delivered,
}

impl DeliveryStatus {
	/// Wire name of the status.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::InTransit => "in_transit",
			Self::Delivered => "delivered",
		}
	}
}

impl fmt::Display for DeliveryStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A scheduled delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
	/// Identifier assigned by the server.
	pub id: EntityId,
	/// Order this delivery fulfils.
	pub order_id: String,
	/// Stock-keeping unit being delivered.
	pub sku: String,
	/// Current status.
	pub status: DeliveryStatus,
	/// Free-form route description.
	pub route: String,
	/// Promised arrival time.
	#[serde(deserialize_with = "crate::time::deserialize")]
	pub estimated_delivery: DateTime<Utc>,
	/// Last reported location.
	#[serde(alias = "location")]
	pub current_location: String,
	/// Time of the last server-side change.
	#[serde(deserialize_with = "crate::time::deserialize")]
	pub updated_at: DateTime<Utc>,
}

impl Delivery {
	/// Returns true while the delivery still counts as outstanding.
	pub fn is_active(&self) -> bool {
		matches!(self.status, DeliveryStatus::Pending | DeliveryStatus::InTransit)
	}

	/// Position of the current location in [`ROUTE_STAGES`], if it is a named stage.
	pub fn stage_index(&self) -> Option<usize> {
		ROUTE_STAGES.iter().position(|stage| *stage == self.current_location)
	}
}

/// Sparse status update for a [`Delivery`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPatch {
	/// Target delivery.
	pub id: EntityId,
	/// Producer-assigned version, when the stream carries one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<u64>,
	/// New order reference.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub order_id: Option<String>,
	/// New SKU.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sku: Option<String>,
	/// New status.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<DeliveryStatus>,
	/// New route.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub route: Option<String>,
	/// New arrival estimate.
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::time::option::deserialize")]
	pub estimated_delivery: Option<DateTime<Utc>>,
	/// New location.
	#[serde(default, alias = "location", skip_serializing_if = "Option::is_none")]
	pub current_location: Option<String>,
	/// New modification time.
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::time::option::deserialize")]
	pub updated_at: Option<DateTime<Utc>>,
}

impl DeliveryPatch {
	/// Creates an empty patch for `id`.
	pub fn new(id: impl Into<EntityId>) -> Self {
		Self {
			id: id.into(),
			version: None,
			order_id: None,
			sku: None,
			status: None,
			route: None,
			estimated_delivery: None,
			current_location: None,
			updated_at: None,
		}
	}

	/// Sets the status.
	pub fn status(mut self, status: DeliveryStatus) -> Self {
		self.status = Some(status);
		self
	}

	/// Sets the current location.
	pub fn location(mut self, location: impl Into<String>) -> Self {
		self.current_location = Some(location.into());
		self
	}

	/// Stamps the patch with a producer version.
	pub fn version(mut self, version: u64) -> Self {
		self.version = Some(version);
		self
	}
}

impl Record for Delivery {
	type Patch = DeliveryPatch;

	const KIND: EntityKind = EntityKind::Delivery;

	fn id(&self) -> &EntityId {
		&self.id
	}

	fn merge(&mut self, patch: &DeliveryPatch) -> FieldChanges {
		let mut changes = FieldChanges::new();
		overwrite(&mut changes, "order_id", &mut self.order_id, patch.order_id.as_ref());
		overwrite(&mut changes, "sku", &mut self.sku, patch.sku.as_ref());
		overwrite(&mut changes, "status", &mut self.status, patch.status.as_ref());
		overwrite(&mut changes, "route", &mut self.route, patch.route.as_ref());
		overwrite(&mut changes, "estimated_delivery", &mut self.estimated_delivery, patch.estimated_delivery.as_ref());
		overwrite(&mut changes, "current_location", &mut self.current_location, patch.current_location.as_ref());
		overwrite(&mut changes, "updated_at", &mut self.updated_at, patch.updated_at.as_ref());
		changes
	}
}

impl Patch for DeliveryPatch {
	fn id(&self) -> &EntityId {
		&self.id
	}

	fn version(&self) -> Option<u64> {
		self.version
	}

	fn field_names(&self) -> Vec<&'static str> {
		let mut names = Vec::new();
		present(&mut names, "order_id", &self.order_id);
		present(&mut names, "sku", &self.sku);
		present(&mut names, "status", &self.status);
		present(&mut names, "route", &self.route);
		present(&mut names, "estimated_delivery", &self.estimated_delivery);
		present(&mut names, "current_location", &self.current_location);
		present(&mut names, "updated_at", &self.updated_at);
		names
	}
}

/// Request body for scheduling a delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDelivery {
	/// Order this delivery fulfils.
	pub order_id: String,
	/// Stock-keeping unit being delivered.
	pub sku: String,
	/// Free-form route description.
	pub route: String,
	/// Promised arrival time.
	pub estimated_delivery: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
	use chrono::TimeZone;
	use pretty_assertions::assert_eq;

	use super::*;

	fn depot_delivery() -> Delivery {
		let at = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
		Delivery {
			id: EntityId::new("D1"),
			order_id: "ORD-1".into(),
			sku: "SKU-1".into(),
			status: DeliveryStatus::Pending,
			route: "North".into(),
			estimated_delivery: at,
			current_location: "Depot".into(),
			updated_at: at,
		}
	}

	#[test]
	fn test_server_push_payload_decodes_as_patch() {
		let patch: DeliveryPatch = serde_json::from_str(
			r#"{"id":"D1","order_id":"ORD-1","current_location":"Local Hub","status":"in_transit"}"#,
		)
		.unwrap();
		assert_eq!(patch.status, Some(DeliveryStatus::InTransit));
		assert_eq!(patch.current_location.as_deref(), Some("Local Hub"));
		assert_eq!(patch.field_names(), vec!["order_id", "status", "current_location"]);
		assert_eq!(patch.version, None);
	}

	#[test]
	fn test_location_alias_is_accepted() {
		let patch: DeliveryPatch = serde_json::from_str(r#"{"id":"D1","location":"Hwy 10"}"#).unwrap();
		assert_eq!(patch.current_location.as_deref(), Some("Hwy 10"));
	}

	#[test]
	fn test_merge_touches_only_present_fields() {
		let mut delivery = depot_delivery();
		let before = delivery.clone();

		let changes = delivery.merge(&DeliveryPatch::new("D1").location("Exit 12"));

		assert_eq!(changes, vec!["current_location"]);
		assert_eq!(delivery.current_location, "Exit 12");
		assert_eq!(delivery.status, before.status);
		assert_eq!(delivery.route, before.route);
		assert_eq!(delivery.id, before.id);
	}

	#[test]
	fn test_merge_twice_reports_no_changes() {
		let mut delivery = depot_delivery();
		let patch = DeliveryPatch::new("D1").status(DeliveryStatus::Delivered).location("Delivered");

		assert_eq!(delivery.merge(&patch), vec!["status", "current_location"]);
		assert!(delivery.merge(&patch).is_empty());
		assert!(!delivery.is_active());
		assert_eq!(delivery.stage_index(), Some(5));
	}

	#[test]
	fn test_snapshot_record_with_naive_timestamps() {
		let delivery: Delivery = serde_json::from_str(
			r#"{"id":"D2","order_id":"ORD-2","sku":"SKU-9","status":"pending","route":"South",
			"estimated_delivery":"2025-06-02T09:00:00","current_location":"Warehouse",
			"updated_at":"2025-06-01T09:00:00.123456+00:00"}"#,
		)
		.unwrap();
		assert_eq!(delivery.stage_index(), Some(0));
		assert!(delivery.is_active());
	}
}
