//! Per-view reconciliation session.
//!
//! A [`Session`] lives exactly as long as the view that mounted it. It owns
//! the [`Store`] and is its only writer: snapshot loads and stream patches are
//! both applied through `&mut self`, so they are serialized by construction.
//! Dropping the session, or calling [`UnmountHandle::unmount`] from any task,
//! closes the push channel and discards the store.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use stockroom_model::{EntityId, Patch, Record};
use tokio::sync::watch;
use tokio_util::sync::DropGuard;

use crate::config::{ClientConfig, RetryPolicy, StreamConfig};
use crate::lifecycle::{UnmountHandle, ViewToken};
use crate::listener::{self, ConnectionState, Listener, ListenerEvent, PushTransport};
use crate::project::{project, project_where};
use crate::reconcile::{self, Outcome, VersionPolicy};
use crate::snapshot::{SnapshotSource, fetch_with_retry};
use crate::store::Store;
use crate::{Error, Result};

/// Something the view may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
	/// A patch from the stream was reconciled against the store.
	Reconciled {
		/// Target entity.
		id: EntityId,
		/// What the patch did.
		outcome: Outcome,
	},
	/// The push channel changed state.
	Connection(ConnectionState),
	/// The push channel gave up. The store keeps its last state but is no
	/// longer updated; the view may offer a reconnect by remounting.
	ChannelFailed(Error),
}

/// Builds a [`Session`].
pub struct SessionBuilder<R: Record> {
	source: Arc<dyn SnapshotSource<R>>,
	stream: Option<Arc<dyn PushTransport>>,
	stream_config: StreamConfig,
	snapshot_retry: RetryPolicy,
	policy: Option<VersionPolicy>,
}

impl<R: Record> SessionBuilder<R> {
	/// Applies snapshot retry and stream settings from `config`.
	pub fn config(mut self, config: &ClientConfig) -> Self {
		self.stream_config = config.stream.clone();
		self.snapshot_retry = config.api.snapshot_retry;
		self
	}

	/// Attaches a push channel.
	pub fn stream(mut self, transport: impl PushTransport) -> Self {
		self.stream = Some(Arc::new(transport));
		self
	}

	/// Attaches a push channel if there is one; `None` leaves the session snapshot-only.
	pub fn optional_stream<T: PushTransport>(self, transport: Option<T>) -> Self {
		match transport {
			Some(transport) => self.stream(transport),
			None => self,
		}
	}

	/// Overrides the version policy from the stream configuration.
	pub fn policy(mut self, policy: VersionPolicy) -> Self {
		self.policy = Some(policy);
		self
	}

	/// Mounts the view: opens a new generation and, if a stream is attached,
	/// starts its listener.
	///
	/// # Panics
	///
	/// Panics outside a Tokio runtime when a stream is attached.
	pub fn mount(self) -> Session<R> {
		let token = ViewToken::mount();
		let listener = self
			.stream
			.map(|transport| Stream::new(listener::spawn(R::KIND, transport, &self.stream_config, token.child())));
		tracing::debug!(
			entity_kind = %R::KIND,
			generation = token.generation(),
			streaming = listener.is_some(),
			"Mounted view"
		);

		Session {
			store: Store::new(),
			source: self.source,
			listener,
			policy: self.policy.unwrap_or(self.stream_config.version_policy),
			snapshot_retry: self.snapshot_retry,
			_guard: token.drop_guard(),
			token,
		}
	}
}

struct Stream<P> {
	listener: Listener<P>,
	state_open: bool,
	events_open: bool,
}

impl<P> Stream<P> {
	fn new(listener: Listener<P>) -> Self {
		Self {
			listener,
			state_open: true,
			events_open: true,
		}
	}

	/// True once no further event or state change can arrive.
	fn is_exhausted(&self) -> bool {
		!self.events_open && (!self.state_open || !self.listener.state.has_changed().unwrap_or(false))
	}
}

enum Step<P> {
	Stopped,
	State(ConnectionState),
	StateClosed,
	Event(ListenerEvent<P>),
	EventsClosed,
}

/// The store of one entity kind for one mounted view.
pub struct Session<R: Record> {
	store: Store<R>,
	source: Arc<dyn SnapshotSource<R>>,
	listener: Option<Stream<R::Patch>>,
	policy: VersionPolicy,
	snapshot_retry: RetryPolicy,
	token: ViewToken,
	_guard: DropGuard,
}

impl<R: Record> Session<R> {
	/// Starts building a session seeded from `source`.
	pub fn builder(source: impl SnapshotSource<R>) -> SessionBuilder<R> {
		SessionBuilder {
			source: Arc::new(source),
			stream: None,
			stream_config: StreamConfig::default(),
			snapshot_retry: RetryPolicy::NONE,
			policy: None,
		}
	}

	/// Replaces the store with a fresh bulk read.
	///
	/// On failure the store is left exactly as it was. A read that resolves
	/// after unmount is discarded and reported as [`Error::Stopped`].
	/// Returns the number of records now held.
	pub async fn load_snapshot(&mut self) -> Result<usize> {
		if self.check_torn_down() {
			return Err(Error::Stopped);
		}

		let fetched = tokio::select! {
			biased;
			_ = self.token.cancelled() => None,
			res = fetch_with_retry(self.source.as_ref(), self.snapshot_retry) => Some(res),
		};

		if self.check_torn_down() {
			tracing::debug!(
				entity_kind = %R::KIND,
				generation = self.token.generation(),
				"Discarding snapshot that resolved after unmount"
			);
			return Err(Error::Stopped);
		}
		let records = match fetched {
			Some(Ok(records)) => records,
			Some(Err(err)) => {
				tracing::warn!(entity_kind = %R::KIND, error = %err, "Snapshot load failed; keeping current store");
				return Err(err);
			}
			None => return Err(Error::Stopped),
		};

		let count = self.store.replace_all(records);
		tracing::info!(entity_kind = %R::KIND, count, "Loaded snapshot");
		Ok(count)
	}

	/// Re-reads the snapshot, typically after a mutation whose effect the
	/// stream will not carry.
	pub async fn refresh(&mut self) -> Result<usize> {
		tracing::debug!(entity_kind = %R::KIND, "Refreshing snapshot");
		self.load_snapshot().await
	}

	/// Applies a locally produced patch, e.g. the effect of a mutation the
	/// API just acknowledged.
	pub fn apply_local(&mut self, patch: &R::Patch) -> Result<Outcome> {
		if self.check_torn_down() {
			return Err(Error::Stopped);
		}
		Ok(reconcile::apply(&mut self.store, patch, self.policy))
	}

	/// Waits for the next stream event, reconciling patches as they arrive.
	///
	/// Returns `None` after unmount, when no stream is attached, or once the
	/// listener has ended and every pending event has been delivered.
	pub async fn next_event(&mut self) -> Option<SessionEvent> {
		loop {
			if self.check_torn_down() {
				return None;
			}
			let stream = self.listener.as_mut()?;
			if stream.is_exhausted() {
				return None;
			}

			let step = tokio::select! {
				biased;
				_ = self.token.cancelled() => Step::Stopped,
				changed = stream.listener.state.changed(), if stream.state_open => match changed {
					Ok(()) => Step::State(*stream.listener.state.borrow_and_update()),
					Err(_) => Step::StateClosed,
				},
				event = stream.listener.events.recv(), if stream.events_open => match event {
					Some(event) => Step::Event(event),
					None => Step::EventsClosed,
				},
			};

			match step {
				Step::Stopped => {
					self.check_torn_down();
					return None;
				}
				Step::State(state) => return Some(SessionEvent::Connection(state)),
				Step::StateClosed => stream.state_open = false,
				Step::EventsClosed => stream.events_open = false,
				Step::Event(ListenerEvent::Failed(err)) => return Some(SessionEvent::ChannelFailed(err)),
				Step::Event(ListenerEvent::Patch(patch)) => {
					let outcome = reconcile::apply(&mut self.store, &patch, self.policy);
					return Some(SessionEvent::Reconciled {
						id: patch.id().clone(),
						outcome,
					});
				}
			}
		}
	}

	/// Current records in snapshot order. Empty after unmount.
	pub fn view(&self) -> Vec<R> {
		if self.token.is_cancelled() {
			return Vec::new();
		}
		project(&self.store)
	}

	/// Current records matching `predicate`, in snapshot order.
	pub fn view_where(&self, predicate: impl FnMut(&R) -> bool) -> Vec<R> {
		if self.token.is_cancelled() {
			return Vec::new();
		}
		project_where(&self.store, predicate)
	}

	/// Looks up one record.
	pub fn get(&self, id: &EntityId) -> Option<&R> {
		if self.token.is_cancelled() {
			return None;
		}
		self.store.get(id)
	}

	/// The underlying store. Empty after unmount.
	pub fn store(&mut self) -> &Store<R> {
		self.check_torn_down();
		&self.store
	}

	/// Push channel state. Snapshot-only and unmounted sessions report
	/// [`ConnectionState::Disconnected`].
	pub fn connection(&self) -> ConnectionState {
		if self.token.is_cancelled() {
			return ConnectionState::Disconnected;
		}
		self.listener
			.as_ref()
			.map_or(ConnectionState::Disconnected, |stream| *stream.listener.state.borrow())
	}

	/// Watches push channel state, if a stream is attached.
	pub fn subscribe_connection(&self) -> Option<watch::Receiver<ConnectionState>> {
		self.listener.as_ref().map(|stream| stream.listener.state.clone())
	}

	/// Push payloads discarded because they could not be decoded.
	pub fn malformed_count(&self) -> u64 {
		self.listener
			.as_ref()
			.map_or(0, |stream| stream.listener.malformed.load(Ordering::Relaxed))
	}

	/// Version policy in effect.
	pub fn policy(&self) -> VersionPolicy {
		self.policy
	}

	/// Handle for tearing the session down from another task.
	pub fn unmount_handle(&self) -> UnmountHandle {
		self.token.handle()
	}

	/// Returns true until the session is unmounted.
	pub fn is_mounted(&self) -> bool {
		!self.token.is_cancelled()
	}

	/// Tears the view down: closes the channel and discards the store.
	pub fn unmount(&mut self) {
		self.token.handle().unmount();
		self.check_torn_down();
	}

	/// Discards the store once unmounted. Returns true if torn down.
	fn check_torn_down(&mut self) -> bool {
		if !self.token.is_cancelled() {
			return false;
		}
		if !self.store.is_empty() {
			tracing::debug!(entity_kind = %R::KIND, generation = self.token.generation(), "Discarding store");
			self.store.clear();
		}
		true
	}
}
