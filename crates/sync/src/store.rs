//! Identifier-keyed entity store.
//!
//! Insertion order is the order of the last snapshot and never changes while
//! patches are applied, so projections stay stable.

use indexmap::IndexMap;
use stockroom_model::{EntityId, Record};

/// A record plus the highest patch version accepted for it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Slot<R> {
	pub record: R,
	pub version: Option<u64>,
}

/// Current known state of every entity of one kind.
///
/// Holds at most one record per identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Store<R: Record> {
	slots: IndexMap<EntityId, Slot<R>>,
}

impl<R: Record> Default for Store<R> {
	fn default() -> Self {
		Self::new()
	}
}

impl<R: Record> Store<R> {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self { slots: IndexMap::new() }
	}

	/// Builds a store from a snapshot.
	pub fn from_snapshot(records: impl IntoIterator<Item = R>) -> Self {
		let mut store = Self::new();
		store.replace_all(records);
		store
	}

	/// Replaces the entire contents with `records`, preserving their order.
	///
	/// A duplicated identifier keeps the position of its first occurrence and the
	/// value of its last. Entities that survive into the new snapshot keep their
	/// last accepted patch version; dropped entities forget theirs. Returns the
	/// number of records now held.
	pub fn replace_all(&mut self, records: impl IntoIterator<Item = R>) -> usize {
		let mut slots = IndexMap::new();
		for record in records {
			let id = record.id().clone();
			let version = self.version(&id);
			let slot = Slot { record, version };
			if let Some(previous) = slots.insert(id.clone(), slot) {
				tracing::warn!(
					entity_kind = %R::KIND,
					entity_id = %id,
					dropped = ?previous.record,
					"Duplicate identifier in snapshot; keeping the later record"
				);
			}
		}
		self.slots = slots;
		self.slots.len()
	}

	/// Removes every record.
	pub fn clear(&mut self) {
		self.slots.clear();
	}

	/// Number of records held.
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	/// Returns true if the store holds no records.
	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	/// Returns true if a record with `id` is held.
	pub fn contains(&self, id: &EntityId) -> bool {
		self.slots.contains_key(id)
	}

	/// Looks up a record by identifier.
	pub fn get(&self, id: &EntityId) -> Option<&R> {
		self.slots.get(id).map(|slot| &slot.record)
	}

	/// Position of `id` in snapshot order.
	pub fn position(&self, id: &EntityId) -> Option<usize> {
		self.slots.get_index_of(id)
	}

	/// Highest patch version accepted for `id` while it has been held.
	pub fn version(&self, id: &EntityId) -> Option<u64> {
		self.slots.get(id).and_then(|slot| slot.version)
	}

	/// First record, in snapshot order, matching `predicate`.
	pub fn find(&self, mut predicate: impl FnMut(&R) -> bool) -> Option<&R> {
		self.iter().find(|record| predicate(record))
	}

	/// Iterates records in snapshot order.
	pub fn iter(&self) -> impl Iterator<Item = &R> {
		self.slots.values().map(|slot| &slot.record)
	}

	pub(crate) fn slot_mut(&mut self, id: &EntityId) -> Option<&mut Slot<R>> {
		self.slots.get_mut(id)
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use chrono::{TimeZone, Utc};
	use proptest::prelude::*;
	use stockroom_model::{Delivery, DeliveryPatch, DeliveryStatus, ROUTE_STAGES};

	use super::*;
	use crate::reconcile::VersionPolicy;

	pub(crate) fn delivery(id: &str, status: DeliveryStatus, location: &str) -> Delivery {
		let at = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
		Delivery {
			id: EntityId::new(id),
			order_id: format!("ORD-{id}"),
			sku: "SKU-1".into(),
			status,
			route: "North".into(),
			estimated_delivery: at,
			current_location: location.into(),
			updated_at: at,
		}
	}

	fn arb_status() -> impl Strategy<Value = DeliveryStatus> {
		prop_oneof![
			Just(DeliveryStatus::Pending),
			Just(DeliveryStatus::InTransit),
			Just(DeliveryStatus::Delivered),
		]
	}

	fn arb_location() -> impl Strategy<Value = String> {
		let mut places: Vec<&str> = ROUTE_STAGES.to_vec();
		places.push("Depot");
		prop::sample::select(places).prop_map(String::from)
	}

	/// Snapshots of up to eight deliveries with distinct ids drawn from `D0..D7`,
	/// in arbitrary order.
	pub(crate) fn arb_snapshot() -> impl Strategy<Value = Vec<Delivery>> {
		prop::collection::btree_set(0u8..8, 0..8)
			.prop_flat_map(|ids| {
				let fields = prop::collection::vec((arb_status(), arb_location()), ids.len());
				(Just(ids.into_iter().collect::<Vec<_>>()).prop_shuffle(), fields)
			})
			.prop_map(|(ids, fields)| {
				ids.into_iter()
					.zip(fields)
					.map(|(id, (status, location))| delivery(&format!("D{id}"), status, &location))
					.collect()
			})
	}

	/// Patches for ids `D0..D9`, so some target entities no snapshot holds.
	pub(crate) fn arb_patch() -> impl Strategy<Value = DeliveryPatch> {
		(
			0u8..10,
			prop::option::of(arb_status()),
			prop::option::of(arb_location()),
			prop::option::of("[A-Z][a-z]{0,5}"),
			prop::option::of(0u64..6),
		)
			.prop_map(|(id, status, location, route, version)| {
				let mut patch = DeliveryPatch::new(format!("D{id}"));
				patch.status = status;
				patch.current_location = location;
				patch.route = route;
				patch.version = version;
				patch
			})
	}

	pub(crate) fn arb_policy() -> impl Strategy<Value = VersionPolicy> {
		prop_oneof![Just(VersionPolicy::ArrivalOrder), Just(VersionPolicy::Monotonic)]
	}

	fn ids(store: &Store<Delivery>) -> Vec<&str> {
		store.iter().map(|d| d.id.as_str()).collect()
	}

	#[test]
	fn test_snapshot_order_is_preserved() {
		let store = Store::from_snapshot([
			delivery("D3", DeliveryStatus::Pending, "Warehouse"),
			delivery("D1", DeliveryStatus::Pending, "Warehouse"),
			delivery("D2", DeliveryStatus::Pending, "Warehouse"),
		]);
		assert_eq!(ids(&store), vec!["D3", "D1", "D2"]);
		assert_eq!(store.position(&EntityId::new("D1")), Some(1));
	}

	#[test]
	fn test_duplicate_identifier_keeps_first_position_last_value() {
		let store = Store::from_snapshot([
			delivery("D1", DeliveryStatus::Pending, "Warehouse"),
			delivery("D2", DeliveryStatus::Pending, "Warehouse"),
			delivery("D1", DeliveryStatus::InTransit, "Local Hub"),
		]);
		assert_eq!(store.len(), 2);
		assert_eq!(ids(&store), vec!["D1", "D2"]);
		assert_eq!(store.get(&EntityId::new("D1")).unwrap().current_location, "Local Hub");
	}

	#[test]
	fn test_replace_all_is_idempotent() {
		let snapshot = vec![
			delivery("D1", DeliveryStatus::Pending, "Warehouse"),
			delivery("D2", DeliveryStatus::Delivered, "Delivered"),
		];
		let mut store = Store::new();
		store.replace_all(snapshot.clone());
		let once = store.clone();
		store.replace_all(snapshot);
		assert_eq!(store, once);
	}

	#[test]
	fn test_replace_all_drops_entities_missing_from_snapshot() {
		let mut store = Store::from_snapshot([
			delivery("D1", DeliveryStatus::Pending, "Warehouse"),
			delivery("D2", DeliveryStatus::Pending, "Warehouse"),
		]);
		store.replace_all([delivery("D2", DeliveryStatus::Pending, "Warehouse")]);
		assert!(!store.contains(&EntityId::new("D1")));
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn test_replace_all_keeps_versions_of_surviving_entities() {
		let mut store = Store::from_snapshot([
			delivery("D1", DeliveryStatus::Pending, "Warehouse"),
			delivery("D2", DeliveryStatus::Pending, "Warehouse"),
		]);
		store.slot_mut(&EntityId::new("D1")).unwrap().version = Some(7);
		store.slot_mut(&EntityId::new("D2")).unwrap().version = Some(3);

		store.replace_all([delivery("D1", DeliveryStatus::Delivered, "Delivered")]);
		assert_eq!(store.version(&EntityId::new("D1")), Some(7));

		store.replace_all([
			delivery("D1", DeliveryStatus::Delivered, "Delivered"),
			delivery("D2", DeliveryStatus::Pending, "Warehouse"),
		]);
		assert_eq!(store.version(&EntityId::new("D2")), None);
	}

	#[test]
	fn test_find_returns_first_match_in_order() {
		let store = Store::from_snapshot([
			delivery("D1", DeliveryStatus::Delivered, "Delivered"),
			delivery("D2", DeliveryStatus::InTransit, "Local Hub"),
			delivery("D3", DeliveryStatus::InTransit, "In Transit"),
		]);
		let found = store.find(|d| d.status == DeliveryStatus::InTransit).unwrap();
		assert_eq!(found.id.as_str(), "D2");
	}
}
