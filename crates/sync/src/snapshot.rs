//! Bulk reads that seed the store.

use async_trait::async_trait;
use stockroom_model::Record;

use crate::Result;
use crate::backoff::Backoff;
use crate::config::RetryPolicy;

/// Returns the full current set of records for one entity kind.
///
/// Implementations must not partially succeed: a fetch either yields the whole
/// collection or an error.
#[async_trait]
pub trait SnapshotSource<R: Record>: Send + Sync + 'static {
	/// Fetches every record.
	async fn fetch(&self) -> Result<Vec<R>>;
}

#[async_trait]
impl<R: Record, S: SnapshotSource<R> + ?Sized> SnapshotSource<R> for std::sync::Arc<S> {
	async fn fetch(&self) -> Result<Vec<R>> {
		(**self).fetch().await
	}
}

/// Fetches from `source`, retrying transient failures per `policy`.
pub(crate) async fn fetch_with_retry<R: Record>(source: &dyn SnapshotSource<R>, policy: RetryPolicy) -> Result<Vec<R>> {
	let mut backoff = Backoff::new(policy);
	loop {
		match source.fetch().await {
			Ok(records) => return Ok(records),
			Err(err) if err.is_transient() => {
				let Some(delay) = backoff.next_delay() else {
					return Err(err);
				};
				tracing::warn!(
					entity_kind = %R::KIND,
					attempt = backoff.attempt(),
					delay_ms = delay.as_millis() as u64,
					error = %err,
					"Snapshot fetch failed; retrying"
				);
				tokio::time::sleep(delay).await;
			}
			Err(err) => return Err(err),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use stockroom_model::Delivery;

	use super::*;
	use crate::Error;

	struct Scripted {
		replies: Mutex<Vec<Result<Vec<Delivery>>>>,
		calls: AtomicUsize,
	}

	impl Scripted {
		fn new(mut replies: Vec<Result<Vec<Delivery>>>) -> Self {
			replies.reverse();
			Self {
				replies: Mutex::new(replies),
				calls: AtomicUsize::new(0),
			}
		}
	}

	#[async_trait]
	impl SnapshotSource<Delivery> for Scripted {
		async fn fetch(&self) -> Result<Vec<Delivery>> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.replies.lock().unwrap().pop().unwrap_or(Ok(Vec::new()))
		}
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn test_network_errors_are_retried() {
		let source = Scripted::new(vec![Err(Error::Network("reset".into())), Ok(Vec::new())]);
		let records = fetch_with_retry(&source, RetryPolicy::new(3, 10, 100)).await.unwrap();
		assert!(records.is_empty());
		assert_eq!(source.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn test_auth_errors_are_not_retried() {
		let source = Scripted::new(vec![Err(Error::Auth {
			status: 401,
			detail: "Could not validate credentials".into(),
		})]);
		let err = fetch_with_retry(&source, RetryPolicy::new(3, 10, 100)).await.unwrap_err();
		assert!(matches!(err, Error::Auth { status: 401, .. }));
		assert_eq!(source.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn test_retries_stop_when_policy_is_exhausted() {
		let source = Scripted::new(vec![
			Err(Error::Network("a".into())),
			Err(Error::Network("b".into())),
			Err(Error::Network("c".into())),
		]);
		let err = fetch_with_retry(&source, RetryPolicy::new(2, 10, 100)).await.unwrap_err();
		assert_eq!(err, Error::Network("c".into()));
		assert_eq!(source.calls.load(Ordering::SeqCst), 3);
	}
}
