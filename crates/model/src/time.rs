//! Lenient timestamp decoding.
//!
//! The API emits RFC 3339 timestamps, but records written before timezone
//! handling was added come back without an offset. Those are read as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Parses an RFC 3339 timestamp, falling back to an offset-less one read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
	if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
		return Some(parsed.with_timezone(&Utc));
	}
	NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
		.ok()
		.map(|naive| naive.and_utc())
}

/// Serde adapter for required timestamp fields.
pub fn deserialize<'de, D>(de: D) -> Result<DateTime<Utc>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(de)?;
	parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// Serde adapter for optional timestamp fields in patches.
pub mod option {
	use chrono::{DateTime, Utc};
	use serde::{Deserialize, Deserializer};

	/// Deserializes `Option<DateTime<Utc>>` leniently; pair with `#[serde(default)]`.
	pub fn deserialize<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Option::<String>::deserialize(de)? {
			None => Ok(None),
			Some(raw) => super::parse_timestamp(&raw)
				.map(Some)
				.ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
		}
	}
}
