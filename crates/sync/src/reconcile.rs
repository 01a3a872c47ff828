//! Reconciliation policy: how a partial update merges into the store.
//!
//! A patch for an unknown identifier is dropped; the stream never creates
//! entities. A patch for a known identifier overwrites exactly the fields it
//! carries. When patches carry a producer version, [`VersionPolicy::Monotonic`]
//! drops any patch not newer than the last one accepted for that entity;
//! unversioned patches always apply in arrival order.

use serde::{Deserialize, Serialize};
use stockroom_model::{FieldChanges, Patch, Record};

use crate::store::Store;

/// Conflict policy for patches that carry a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionPolicy {
	/// Later arrivals always win, regardless of version.
	ArrivalOrder,
	/// A versioned patch must be strictly newer than the last accepted one.
	#[default]
	Monotonic,
}

/// What happened to a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
	/// The patch changed at least one field.
	Applied {
		/// Fields whose value changed.
		changed: FieldChanges,
	},
	/// The patch matched an entity but every carried field already had that value.
	Unchanged,
	/// No entity with the patch's identifier is held; the patch was dropped.
	UnknownEntity,
	/// The patch was older than one already accepted and was dropped.
	Stale {
		/// Version already accepted.
		seen: u64,
		/// Version carried by the dropped patch.
		offered: u64,
	},
}

impl Outcome {
	/// Returns true if the store changed.
	pub fn is_applied(&self) -> bool {
		matches!(self, Self::Applied { .. })
	}
}

/// Merges `patch` into `store` under `policy`.
pub fn apply<R: Record>(store: &mut Store<R>, patch: &R::Patch, policy: VersionPolicy) -> Outcome {
	let Some(slot) = store.slot_mut(patch.id()) else {
		tracing::debug!(entity_kind = %R::KIND, entity_id = %patch.id(), "Dropping patch for unknown entity");
		return Outcome::UnknownEntity;
	};

	let offered = patch.version();
	if policy == VersionPolicy::Monotonic
		&& let (Some(offered), Some(seen)) = (offered, slot.version)
		&& offered <= seen
	{
		tracing::debug!(entity_kind = %R::KIND, entity_id = %patch.id(), seen, offered, "Dropping stale patch");
		return Outcome::Stale { seen, offered };
	}

	let changed = slot.record.merge(patch);
	if let Some(offered) = offered {
		slot.version = Some(match policy {
			VersionPolicy::Monotonic => slot.version.map_or(offered, |seen| seen.max(offered)),
			VersionPolicy::ArrivalOrder => offered,
		});
	}

	if changed.is_empty() {
		Outcome::Unchanged
	} else {
		tracing::trace!(entity_kind = %R::KIND, entity_id = %patch.id(), ?changed, "Applied patch");
		Outcome::Applied { changed }
	}
}
