//! Authentication payloads.
//!
//! Tokens are opaque to the client; the API validates them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::EntityId;

/// Access level of a dashboard user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	/// Store manager.
	Manager,
	/// Supplier delivering stock.
	Supplier,
	/// Read-only customer.
	#[default]
	Customer,
}

impl Role {
	/// Returns true if the role may mutate inventory and deliveries.
	pub const fn can_manage(self) -> bool {
		matches!(self, Self::Manager | Self::Supplier)
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Manager => "manager",
			Self::Supplier => "supplier",
			Self::Customer => "customer",
		})
	}
}

/// Login request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
	/// Account email.
	pub email: String,
	/// Plain-text password, sent over TLS.
	pub password: String,
}

/// Sign-up request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
	/// Account email.
	pub email: String,
	/// Plain-text password, sent over TLS.
	pub password: String,
	/// Display name.
	pub full_name: String,
	/// Requested role.
	#[serde(default)]
	pub role: Role,
}

/// Public view of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Account identifier.
	pub id: EntityId,
	/// Account email.
	pub email: String,
	/// Display name.
	pub full_name: String,
	/// Access level.
	pub role: Role,
}

/// Response of a successful login or sign-up.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
	/// Bearer token for subsequent requests.
	pub access_token: String,
	/// Always `bearer`.
	pub token_type: String,
	/// The authenticated user.
	pub user: UserProfile,
}

impl fmt::Debug for AccessToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AccessToken")
			.field("token_type", &self.token_type)
			.field("user", &self.user)
			.finish_non_exhaustive()
	}
}
