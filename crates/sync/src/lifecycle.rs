//! Mount lifetimes.
//!
//! Every mount of a view draws a fresh generation and a cancellation token.
//! Work started under one generation checks its token before touching the
//! store, so results that arrive after unmount are discarded.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::{CancellationToken, DropGuard};

static MOUNTS: MountClock = MountClock::new();

/// Monotonic generation clock for mounts.
#[derive(Debug, Default)]
pub(crate) struct MountClock {
	next: AtomicU64,
}

impl MountClock {
	pub const fn new() -> Self {
		Self { next: AtomicU64::new(0) }
	}

	/// Returns the next generation ID, starting at 1.
	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}
}

/// Generation-scoped cancellation token for one mount.
#[derive(Debug, Clone)]
pub(crate) struct ViewToken {
	generation: u64,
	cancel: CancellationToken,
}

impl ViewToken {
	/// Opens a new mount generation.
	pub fn mount() -> Self {
		Self {
			generation: MOUNTS.next(),
			cancel: CancellationToken::new(),
		}
	}

	pub const fn generation(&self) -> u64 {
		self.generation
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Token handed to background tasks of this mount.
	pub fn child(&self) -> CancellationToken {
		self.cancel.child_token()
	}

	/// Guard that cancels this mount when dropped.
	pub fn drop_guard(&self) -> DropGuard {
		self.cancel.clone().drop_guard()
	}

	pub fn handle(&self) -> UnmountHandle {
		UnmountHandle {
			generation: self.generation,
			cancel: self.cancel.clone(),
		}
	}
}

/// Cloneable handle that tears down a mounted session from anywhere.
///
/// Unmounting closes the push channel, stops the listener, and makes any
/// in-flight snapshot resolve to [`Error::Stopped`](crate::Error::Stopped).
#[derive(Debug, Clone)]
pub struct UnmountHandle {
	generation: u64,
	cancel: CancellationToken,
}

impl UnmountHandle {
	/// Requests teardown. Idempotent.
	pub fn unmount(&self) {
		if !self.cancel.is_cancelled() {
			tracing::debug!(generation = self.generation, "Unmounting view");
		}
		self.cancel.cancel();
	}

	/// Returns true once teardown was requested through any handle or the session.
	pub fn is_unmounted(&self) -> bool {
		self.cancel.is_cancelled()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_generations_increase() {
		let a = ViewToken::mount();
		let b = ViewToken::mount();
		assert!(b.generation() > a.generation());
	}

	#[test]
	fn test_unmount_cancels_children() {
		let token = ViewToken::mount();
		let child = token.child();
		let handle = token.handle();

		handle.unmount();
		handle.unmount();

		assert!(token.is_cancelled());
		assert!(child.is_cancelled());
		assert!(handle.is_unmounted());
		assert!(handle.clone().is_unmounted());
	}
}
