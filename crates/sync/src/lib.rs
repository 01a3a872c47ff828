//! Entity stream reconciler for the stockroom dashboard.
//!
//! A view mounts a [`Session`], seeds it from a bulk read, and from then on
//! folds sparse updates from a push channel into an insertion-ordered store:
//!
//! * [`Store`]: identifier-keyed records in snapshot order.
//! * [`SnapshotSource`]: the bulk read that seeds and re-seeds the store.
//! * [`PushTransport`]: the push channel, driven by a background listener task.
//! * [`reconcile`]: the field-level merge policy for incoming patches.
//! * [`project`]: the ordered, render-ready view of the store.
//!
//! The store is owned by the session and only ever mutated through `&mut self`,
//! so the snapshot loader and the update consumer can never interleave.
//!
//! # Example
//!
//! ```ignore
//! use stockroom_model::Delivery;
//! use stockroom_sync::{ApiClient, ClientConfig, Session, SessionEvent, WsTransport};
//!
//! let config = ClientConfig::load_default()?;
//! let api = ApiClient::new(&config.api);
//! let stream = WsTransport::for_kind(&config.api, stockroom_model::EntityKind::Delivery)?;
//!
//! let mut session = Session::<Delivery>::builder(api.snapshot_source())
//!     .config(&config)
//!     .optional_stream(stream)
//!     .mount();
//! session.load_snapshot().await?;
//!
//! while let Some(event) = session.next_event().await {
//!     if let SessionEvent::Reconciled { .. } = event {
//!         render(session.view());
//!     }
//! }
//! ```

#![warn(missing_docs)]

mod backoff;
pub mod config;
pub mod http;
mod lifecycle;
pub mod listener;
pub mod project;
pub mod reconcile;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod ws;

pub use config::{ApiConfig, ClientConfig, ConfigError, RetryPolicy, StreamConfig};
pub use http::{ApiClient, HttpSnapshotSource};
pub use lifecycle::UnmountHandle;
pub use listener::{ConnectionState, PushConnection, PushTransport};
pub use project::{project, project_where};
pub use reconcile::{Outcome, VersionPolicy};
pub use session::{Session, SessionBuilder, SessionEvent};
pub use snapshot::SnapshotSource;
pub use store::Store;
pub use ws::WsTransport;

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced by the reconciler and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// The API or push channel could not be reached, or timed out.
	#[error("network error: {0}")]
	Network(String),
	/// The API rejected the bearer credential.
	#[error("authentication rejected ({status}): {detail}")]
	Auth {
		/// HTTP status code.
		status: u16,
		/// Server-provided reason.
		detail: String,
	},
	/// A push payload could not be decoded as a partial update.
	#[error("malformed push message: {0}")]
	MalformedMessage(String),
	/// The push channel closed unexpectedly and could not be re-established.
	#[error("push channel error: {0}")]
	Channel(String),
	/// The API refused a request for a reason other than credentials.
	#[error("request rejected ({status}): {detail}")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Server-provided reason.
		detail: String,
	},
	/// A response body did not have the expected shape.
	#[error("undecodable response: {0}")]
	Decode(String),
	/// The owning view unmounted before the operation completed.
	#[error("view unmounted")]
	Stopped,
}

impl Error {
	/// Returns true for failures worth retrying with the same request.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Network(_) | Self::Channel(_))
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::Decode(err.to_string())
	}
}
