//! Render-ready views of a [`Store`].

use stockroom_model::Record;

use crate::store::Store;

/// Every record in snapshot order.
///
/// Pure: projecting twice without an intervening mutation yields equal vectors.
pub fn project<R: Record>(store: &Store<R>) -> Vec<R> {
	store.iter().cloned().collect()
}

/// Records matching `predicate`, in snapshot order.
pub fn project_where<R: Record>(store: &Store<R>, mut predicate: impl FnMut(&R) -> bool) -> Vec<R> {
	store.iter().filter(|record| predicate(record)).cloned().collect()
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use proptest::prelude::*;
	use stockroom_model::{Delivery, DeliveryPatch, DeliveryStatus};

	use super::*;
	use crate::reconcile::{VersionPolicy, apply};
	use crate::store::tests::{arb_patch, arb_policy, arb_snapshot, delivery};

	fn ids(view: &[Delivery]) -> Vec<&str> {
		view.iter().map(|d| d.id.as_str()).collect()
	}

	#[test]
	fn test_projection_is_pure() {
		let store = Store::from_snapshot([
			delivery("D2", DeliveryStatus::Pending, "Warehouse"),
			delivery("D1", DeliveryStatus::InTransit, "Local Hub"),
		]);
		assert_eq!(project(&store), project(&store));
		assert_eq!(ids(&project(&store)), vec!["D2", "D1"]);
	}

	#[test]
	fn test_updates_do_not_reorder_projection() {
		let mut store = Store::from_snapshot([
			delivery("D1", DeliveryStatus::Pending, "Warehouse"),
			delivery("D2", DeliveryStatus::Pending, "Warehouse"),
			delivery("D3", DeliveryStatus::Pending, "Warehouse"),
		]);
		apply(&mut store, &DeliveryPatch::new("D3").status(DeliveryStatus::Delivered), VersionPolicy::Monotonic);
		apply(&mut store, &DeliveryPatch::new("D1").location("Local Hub"), VersionPolicy::Monotonic);

		assert_eq!(ids(&project(&store)), vec!["D1", "D2", "D3"]);
	}

	#[test]
	fn test_filtered_projection_keeps_order() {
		let store = Store::from_snapshot([
			delivery("D1", DeliveryStatus::Delivered, "Delivered"),
			delivery("D2", DeliveryStatus::InTransit, "In Transit"),
			delivery("D3", DeliveryStatus::Pending, "Warehouse"),
			delivery("D4", DeliveryStatus::InTransit, "Local Hub"),
		]);
		let active = project_where(&store, Delivery::is_active);
		assert_eq!(ids(&active), vec!["D2", "D3", "D4"]);
	}

	#[test]
	fn test_empty_store_projects_empty() {
		let store = Store::<Delivery>::new();
		assert!(project(&store).is_empty());
	}

	proptest! {
		/// No sequence of patches adds, removes or reorders projected records.
		#[test]
		fn prop_patches_preserve_snapshot_order(
			snapshot in arb_snapshot(),
			patches in prop::collection::vec(arb_patch(), 0..16),
			policy in arb_policy(),
		) {
			let expected: Vec<String> = snapshot.iter().map(|d| d.id.to_string()).collect();
			let mut store = Store::from_snapshot(snapshot);
			for patch in &patches {
				apply(&mut store, patch, policy);
			}

			let view = project(&store);
			prop_assert_eq!(ids(&view), expected.iter().map(String::as_str).collect::<Vec<_>>());
			prop_assert_eq!(project(&store), view.clone());

			let active = project_where(&store, Delivery::is_active);
			let expected_active: Vec<_> = view.iter().filter(|d| d.is_active()).cloned().collect();
			prop_assert_eq!(active, expected_active);
		}
	}
}
