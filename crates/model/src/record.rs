//! Full records and the sparse patches that update them.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::id::{EntityId, EntityKind};

/// Names of the fields whose value changed while merging a patch.
pub type FieldChanges = Vec<&'static str>;

/// A complete entity as returned by a bulk read.
///
/// The identifier is immutable: [`Record::merge`] never touches it.
pub trait Record: Clone + Debug + PartialEq + DeserializeOwned + Send + Sync + 'static {
	/// The sparse update shape for this record.
	type Patch: Patch;

	/// The collection this record belongs to.
	const KIND: EntityKind;

	/// Returns the record's identifier.
	fn id(&self) -> &EntityId;

	/// Overwrites exactly the fields present in `patch`, leaving all others untouched.
	///
	/// Returns the names of the fields whose value actually changed. Merging the
	/// same patch twice yields an empty list the second time.
	fn merge(&mut self, patch: &Self::Patch) -> FieldChanges;
}

/// A partial update: an identifier plus any subset of a record's mutable fields.
pub trait Patch: Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static {
	/// Identifier of the record this patch targets.
	fn id(&self) -> &EntityId;

	/// Monotonic version stamped by the producer, if any.
	fn version(&self) -> Option<u64>;

	/// Names of the fields carried by this patch.
	fn field_names(&self) -> Vec<&'static str>;

	/// Returns true if the patch carries no field at all.
	fn is_empty(&self) -> bool {
		self.field_names().is_empty()
	}
}

/// Writes `value` into `slot` when present, recording `name` if the value changed.
pub(crate) fn overwrite<T>(changes: &mut FieldChanges, name: &'static str, slot: &mut T, value: Option<&T>)
where
	T: PartialEq + Clone,
{
	if let Some(value) = value
		&& slot != value
	{
		*slot = value.clone();
		changes.push(name);
	}
}

/// Pushes `name` when the patch field is present.
pub(crate) fn present<T>(names: &mut Vec<&'static str>, name: &'static str, field: &Option<T>) {
	if field.is_some() {
		names.push(name);
	}
}

/// Deserializes a nullable patch field so that an explicit `null` is kept apart
/// from an absent key.
///
/// Pair with `#[serde(default)]`: absent becomes `None`, `null` becomes
/// `Some(None)` and a value becomes `Some(Some(value))`.
pub(crate) fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	Option::<T>::deserialize(de).map(Some)
}
