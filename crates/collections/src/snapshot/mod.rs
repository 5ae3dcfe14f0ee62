//! One-shot lazy walk over a map, delivered through a bounded queue.
//!
//! [`iterate`] spawns a single producer task that visits every entry of the
//! source once and pushes it into a bounded queue. The returned [`Snapshot`]
//! drains that queue lazily. The producer waits whenever the queue is full, so
//! at most `capacity` entries are in flight no matter how large the source is.
//! When the walk ends the producer closes the queue, and the consumer sees
//! `None`.
//!
//! Enumeration order follows the source map and is unspecified.
//!
//! The source is shared as `Arc<HashMap>`: nobody can mutate it while the walk
//! runs. To walk a map that keeps changing, take a copy first (see
//! [`crate::GuardedMap::snapshot`]).

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use coolthings_worker::{GenerationClock, QueueReceiver, QueueSender, StopToken, TaskClass, bounded, spawn};
use serde::Deserialize;
use tokio::task::{JoinError, JoinHandle};


/// Queue capacity used by [`iterate`].
pub const DEFAULT_CAPACITY: usize = 32;

static WALKS: LazyLock<GenerationClock> = LazyLock::new(GenerationClock::new);

/// Tuning for one walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotOptions {
	/// Maximum number of entries buffered between producer and consumer.
	pub capacity: usize,
}

impl SnapshotOptions {
	pub const fn with_capacity(capacity: usize) -> Self {
		Self { capacity }
	}
}

impl Default for SnapshotOptions {
	fn default() -> Self {
		Self::with_capacity(DEFAULT_CAPACITY)
	}
}

/// One key/value pair emitted by a walk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry<K = String, V = i64> {
	pub key: K,
	pub value: V,
}

impl<K, V> From<Entry<K, V>> for (K, V) {
	fn from(entry: Entry<K, V>) -> Self {
		(entry.key, entry.value)
	}
}

/// How a producer finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkOutcome {
	/// Every entry was pushed and the queue closed.
	Completed,
	/// The stop token fired before the walk finished.
	Cancelled,
	/// The consumer went away before the walk finished.
	ConsumerGone,
	/// The producer panicked, e.g. in a key or value `Clone`.
	Panicked(String),
}

/// Summary returned by [`Snapshot::cancel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkReport {
	pub generation: u64,
	/// Entries pushed into the queue.
	pub emitted: usize,
	/// Entries in the source when the walk began.
	pub total: usize,
	pub outcome: WalkOutcome,
}

/// Consumer handle for one walk. Single pass, not restartable.
///
/// Dropping the handle stops the producer: its token is cancelled and the
/// queue closed, so an abandoned walk never pins the producer task.
pub struct Snapshot<K = String, V = i64> {
	rx: QueueReceiver<Entry<K, V>>,
	token: StopToken,
	producer: Option<JoinHandle<WalkReport>>,
	emitted: Arc<AtomicUsize>,
	consumed: usize,
	total: usize,
}

/// Walks `source` with [`SnapshotOptions::default`].
pub fn iterate<K, V>(source: impl Into<Arc<HashMap<K, V>>>) -> Snapshot<K, V>
where
	K: Clone + Send + Sync + 'static,
	V: Clone + Send + Sync + 'static,
{
	iterate_with(source, SnapshotOptions::default())
}

/// Walks `source` with explicit options.
///
/// # Panics
///
/// Panics if `options.capacity` is zero.
pub fn iterate_with<K, V>(source: impl Into<Arc<HashMap<K, V>>>, options: SnapshotOptions) -> Snapshot<K, V>
where
	K: Clone + Send + Sync + 'static,
	V: Clone + Send + Sync + 'static,
{
	iterate_with_token(source, options, StopToken::new(WALKS.next()))
}

/// Walks `source`, stopping early when `token` is cancelled.
///
/// The walk runs under a child of `token`: cancelling `token` stops the walk,
/// while dropping the returned [`Snapshot`] leaves `token` untouched. After a
/// stop the consumer still drains what was already buffered, then sees `None`.
pub fn iterate_with_token<K, V>(source: impl Into<Arc<HashMap<K, V>>>, options: SnapshotOptions, token: StopToken) -> Snapshot<K, V>
where
	K: Clone + Send + Sync + 'static,
	V: Clone + Send + Sync + 'static,
{
	let source = source.into();
	let total = source.len();
	let (tx, rx) = bounded(options.capacity);
	let token = token.child();
	let emitted = Arc::new(AtomicUsize::new(0));

	let producer = spawn(TaskClass::Producer, walk(source, tx, token.clone(), Arc::clone(&emitted)));

	Snapshot {
		rx,
		token,
		producer: Some(producer),
		emitted,
		consumed: 0,
		total,
	}
}

async fn walk<K, V>(source: Arc<HashMap<K, V>>, tx: QueueSender<Entry<K, V>>, token: StopToken, emitted: Arc<AtomicUsize>) -> WalkReport
where
	K: Clone,
	V: Clone,
{
	let generation = token.generation();
	let total = source.len();
	tracing::debug!(generation, total, capacity = tx.capacity(), "snapshot.walk.start");

	let mut outcome = WalkOutcome::Completed;
	for (key, value) in source.iter() {
		let entry = Entry {
			key: key.clone(),
			value: value.clone(),
		};
		tokio::select! {
			biased;
			() = token.cancelled() => {
				outcome = WalkOutcome::Cancelled;
				break;
			}
			sent = tx.send(entry) => {
				if sent.is_err() {
					outcome = WalkOutcome::ConsumerGone;
					break;
				}
			}
		}
		emitted.fetch_add(1, Ordering::Release);
	}
	tx.close();

	let emitted = emitted.load(Ordering::Acquire);
	tracing::debug!(generation, total, emitted, ?outcome, "snapshot.walk.finish");
	WalkReport {
		generation,
		emitted,
		total,
		outcome,
	}
}

impl<K, V> Snapshot<K, V> {
	/// Next entry, waiting while the queue is empty. `None` ends the sequence.
	pub async fn next(&mut self) -> Option<Entry<K, V>> {
		let entry = self.rx.recv().await?;
		self.consumed += 1;
		Some(entry)
	}

	/// Collects every remaining entry.
	pub async fn drain(mut self) -> Vec<Entry<K, V>> {
		let mut entries = Vec::with_capacity(self.total.saturating_sub(self.consumed));
		while let Some(entry) = self.next().await {
			entries.push(entry);
		}
		entries
	}

	/// Stops the walk and waits for the producer to exit.
	///
	/// On a fully drained snapshot this reports [`WalkOutcome::Completed`].
	pub async fn cancel(mut self) -> WalkReport {
		self.token.cancel();
		self.rx.close();

		let generation = self.token.generation();
		// Unreachable: only `cancel` takes the producer, and it consumes `self`.
		let Some(producer) = self.producer.take() else {
			return WalkReport {
				generation,
				emitted: self.emitted(),
				total: self.total,
				outcome: WalkOutcome::Cancelled,
			};
		};

		match producer.await {
			Ok(report) => report,
			Err(err) => WalkReport {
				generation,
				emitted: self.emitted(),
				total: self.total,
				outcome: join_error_outcome(err),
			},
		}
	}

	/// Number of entries in the source when the walk began.
	pub fn len_hint(&self) -> usize {
		self.total
	}

	/// Entries pushed by the producer so far.
	pub fn emitted(&self) -> usize {
		self.emitted.load(Ordering::Acquire)
	}

	/// Entries handed out by [`Self::next`] so far.
	pub fn consumed(&self) -> usize {
		self.consumed
	}

	/// Entries currently waiting in the queue.
	pub fn buffered(&self) -> usize {
		self.rx.len()
	}

	/// Deepest the queue has been during this walk.
	pub fn high_water(&self) -> usize {
		self.rx.high_water()
	}

	pub fn capacity(&self) -> usize {
		self.rx.capacity()
	}

	pub fn generation(&self) -> u64 {
		self.token.generation()
	}

	/// Token controlling this walk. Cancelling it stops the producer.
	pub fn stop_token(&self) -> &StopToken {
		&self.token
	}
}

impl<K, V> Drop for Snapshot<K, V> {
	fn drop(&mut self) {
		self.token.cancel();
	}
}

impl<K, V> fmt::Debug for Snapshot<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Snapshot")
			.field("generation", &self.token.generation())
			.field("total", &self.total)
			.field("consumed", &self.consumed)
			.field("buffered", &self.rx.len())
			.field("capacity", &self.rx.capacity())
			.finish()
	}
}

fn join_error_outcome(err: JoinError) -> WalkOutcome {
	match err.try_into_panic() {
		Ok(payload) => {
			let message = payload
				.downcast_ref::<&str>()
				.map(|s| (*s).to_owned())
				.or_else(|| payload.downcast_ref::<String>().cloned())
				.unwrap_or_else(|| "non-string panic payload".to_owned());
			WalkOutcome::Panicked(message)
		}
		Err(_) => WalkOutcome::Cancelled,
	}
}
