//! Update stream listener.
//!
//! One background task per mounted view owns the push connection. It decodes
//! each payload into the kind's patch type and forwards it, in transport order,
//! over a bounded channel to the session that owns the store. The task never
//! touches the store itself.
//!
//! State machine:
//!
//! ```text
//! Disconnected -> Connecting -> Connected
//!                    ^              |
//!                    +-- backoff <--+  (transient drop or handshake failure)
//!                    |
//!                    +-> Failed        (auth rejected or retries exhausted)
//! any -> Disconnected                  (unmount)
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use stockroom_model::{EntityKind, Patch};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::backoff::Backoff;
use crate::config::{RetryPolicy, StreamConfig};
use crate::{Error, Result};

/// Push channel connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
	/// No channel is open.
	#[default]
	Disconnected,
	/// A handshake is in progress.
	Connecting,
	/// Patches are flowing.
	Connected,
	/// The channel could not be (re-)established; updates are no longer applied.
	Failed,
}

impl ConnectionState {
	/// Lowercase label for display and logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Disconnected => "disconnected",
			Self::Connecting => "connecting",
			Self::Connected => "connected",
			Self::Failed => "failed",
		}
	}
}

impl fmt::Display for ConnectionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Opens push connections.
///
/// Each call performs a full handshake. Implementations report a rejected
/// credential as [`Error::Auth`] so the listener does not retry it.
#[async_trait]
pub trait PushTransport: Send + Sync + 'static {
	/// Opens a connection.
	async fn connect(&self) -> Result<Box<dyn PushConnection>>;
}

#[async_trait]
impl<T: PushTransport + ?Sized> PushTransport for Arc<T> {
	async fn connect(&self) -> Result<Box<dyn PushConnection>> {
		(**self).connect().await
	}
}

/// An open push connection delivering raw payloads.
#[async_trait]
pub trait PushConnection: Send {
	/// Next payload in transport order. `None` once the peer closed the channel.
	async fn recv(&mut self) -> Option<Result<Vec<u8>>>;

	/// Closes the channel. Must be safe to call more than once.
	async fn close(&mut self);
}

/// Message from the listener task to its session.
#[derive(Debug)]
pub(crate) enum ListenerEvent<P> {
	Patch(P),
	Failed(Error),
}

/// Session side of a running listener.
#[derive(Debug)]
pub(crate) struct Listener<P> {
	pub events: mpsc::Receiver<ListenerEvent<P>>,
	pub state: watch::Receiver<ConnectionState>,
	pub malformed: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy)]
struct Settings {
	kind: EntityKind,
	handshake_timeout: Duration,
	reconnect: RetryPolicy,
}

/// Spawns the listener task. Must be called within a Tokio runtime.
///
/// The task runs until `cancel` fires or the session side is dropped.
pub(crate) fn spawn<P: Patch>(
	kind: EntityKind,
	transport: Arc<dyn PushTransport>,
	config: &StreamConfig,
	cancel: CancellationToken,
) -> Listener<P> {
	let (event_tx, events) = mpsc::channel(config.buffer.max(1));
	let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
	let malformed = Arc::new(AtomicU64::new(0));
	let settings = Settings {
		kind,
		handshake_timeout: config.handshake_timeout(),
		reconnect: config.reconnect,
	};

	tokio::spawn(run(settings, transport, cancel, event_tx, state_tx, Arc::clone(&malformed)));

	Listener { events, state, malformed }
}

/// How a connected pump ended.
enum PumpEnd {
	Cancelled,
	SessionGone,
	Dropped(Error),
}

async fn run<P: Patch>(
	settings: Settings,
	transport: Arc<dyn PushTransport>,
	cancel: CancellationToken,
	event_tx: mpsc::Sender<ListenerEvent<P>>,
	state_tx: watch::Sender<ConnectionState>,
	malformed: Arc<AtomicU64>,
) {
	let kind = settings.kind;
	let mut backoff = Backoff::new(settings.reconnect);

	let failure = loop {
		set_state(&state_tx, kind, ConnectionState::Connecting);

		let attempt = tokio::select! {
			biased;
			_ = cancel.cancelled() => break None,
			res = tokio::time::timeout(settings.handshake_timeout, transport.connect()) => match res {
				Ok(res) => res,
				Err(_) => Err(Error::Network(format!(
					"handshake timed out after {}s",
					settings.handshake_timeout.as_secs()
				))),
			},
		};

		let err = match attempt {
			Ok(mut conn) => {
				set_state(&state_tx, kind, ConnectionState::Connected);
				backoff.reset();
				let end = pump(kind, conn.as_mut(), &cancel, &event_tx, &malformed).await;
				match end {
					PumpEnd::Cancelled | PumpEnd::SessionGone => {
						conn.close().await;
						break None;
					}
					PumpEnd::Dropped(err) => {
						conn.close().await;
						err
					}
				}
			}
			Err(err) => err,
		};

		if !err.is_transient() {
			break Some(err);
		}
		let Some(delay) = backoff.next_delay() else {
			break Some(Error::Channel(format!(
				"gave up after {} reconnect attempts: {err}",
				backoff.attempt()
			)));
		};
		tracing::warn!(
			entity_kind = %kind,
			attempt = backoff.attempt(),
			delay_ms = delay.as_millis() as u64,
			error = %err,
			"Push channel unavailable; reconnecting"
		);
		tokio::select! {
			biased;
			_ = cancel.cancelled() => break None,
			_ = tokio::time::sleep(delay) => {}
		}
	};

	if let Some(err) = failure {
		tracing::error!(entity_kind = %kind, error = %err, "Push channel failed");
		set_state(&state_tx, kind, ConnectionState::Failed);
		let _ = event_tx.send(ListenerEvent::Failed(err)).await;
		// Closing the event channel tells the session no more patches will arrive.
		drop(event_tx);
		cancel.cancelled().await;
	}

	set_state(&state_tx, kind, ConnectionState::Disconnected);
}

async fn pump<P: Patch>(
	kind: EntityKind,
	conn: &mut dyn PushConnection,
	cancel: &CancellationToken,
	event_tx: &mpsc::Sender<ListenerEvent<P>>,
	malformed: &AtomicU64,
) -> PumpEnd {
	loop {
		let payload = tokio::select! {
			biased;
			_ = cancel.cancelled() => return PumpEnd::Cancelled,
			payload = conn.recv() => payload,
		};

		let bytes = match payload {
			Some(Ok(bytes)) => bytes,
			Some(Err(err)) => return PumpEnd::Dropped(err),
			None => return PumpEnd::Dropped(Error::Channel("closed by peer".into())),
		};

		let patch = match decode::<P>(&bytes) {
			Ok(patch) => patch,
			Err(err) => {
				malformed.fetch_add(1, Ordering::Relaxed);
				tracing::warn!(entity_kind = %kind, error = %err, len = bytes.len(), "Discarding push message");
				continue;
			}
		};

		tokio::select! {
			biased;
			_ = cancel.cancelled() => return PumpEnd::Cancelled,
			sent = event_tx.send(ListenerEvent::Patch(patch)) => {
				if sent.is_err() {
					return PumpEnd::SessionGone;
				}
			}
		}
	}
}

/// Decodes one push payload as a patch.
pub(crate) fn decode<P: Patch>(bytes: &[u8]) -> Result<P> {
	serde_json::from_slice(bytes).map_err(|e| Error::MalformedMessage(e.to_string()))
}

fn set_state(state_tx: &watch::Sender<ConnectionState>, kind: EntityKind, next: ConnectionState) {
	let prev = state_tx.send_replace(next);
	if prev != next {
		tracing::debug!(entity_kind = %kind, from = %prev, state = %next, "Push channel state changed");
	}
}
