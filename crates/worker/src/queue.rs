//! Bounded single-producer/single-consumer queue with explicit close.
//!
//! The sender waits while the queue is full and the receiver waits while it is
//! empty and open. Closing (explicitly, or by dropping either half) is the only
//! end-of-stream signal: the receiver drains what is left, then sees `None`.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Error returned by [`QueueSender::send`] once the queue is closed. Carries the
/// rejected item back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendError<T>(pub T);

impl<T> SendError<T> {
	pub fn into_inner(self) -> T {
		self.0
	}
}

impl<T> fmt::Display for SendError<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("queue closed")
	}
}

impl<T: fmt::Debug> std::error::Error for SendError<T> {}

/// Error returned by [`QueueSender::try_send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrySendError<T> {
	/// Queue is at capacity.
	Full(T),
	/// Queue is closed.
	Closed(T),
}

impl<T> TrySendError<T> {
	pub fn into_inner(self) -> T {
		match self {
			Self::Full(item) | Self::Closed(item) => item,
		}
	}
}

impl<T> fmt::Display for TrySendError<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Full(_) => f.write_str("queue full"),
			Self::Closed(_) => f.write_str("queue closed"),
		}
	}
}

impl<T: fmt::Debug> std::error::Error for TrySendError<T> {}

struct QueueState<T> {
	items: VecDeque<T>,
	closed: bool,
	high_water: usize,
}

impl<T> QueueState<T> {
	fn push(&mut self, item: T) {
		self.items.push_back(item);
		self.high_water = self.high_water.max(self.items.len());
	}
}

struct QueueInner<T> {
	capacity: usize,
	state: Mutex<QueueState<T>>,
	notify_recv: Notify,
	notify_send: Notify,
}

impl<T> QueueInner<T> {
	fn close(&self) {
		let mut state = self.state.lock();
		if state.closed {
			return;
		}
		state.closed = true;
		drop(state);
		self.notify_recv.notify_waiters();
		self.notify_send.notify_waiters();
	}
}

/// Producing half. Not `Clone`: one queue, one writer.
pub struct QueueSender<T> {
	inner: Arc<QueueInner<T>>,
}

/// Consuming half. Not `Clone`: one queue, one reader.
pub struct QueueReceiver<T> {
	inner: Arc<QueueInner<T>>,
}

/// Creates a bounded queue holding at most `capacity` items.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn bounded<T>(capacity: usize) -> (QueueSender<T>, QueueReceiver<T>) {
	assert!(capacity > 0, "queue capacity must be > 0");
	let inner = Arc::new(QueueInner {
		capacity,
		state: Mutex::new(QueueState {
			items: VecDeque::new(),
			closed: false,
			high_water: 0,
		}),
		notify_recv: Notify::new(),
		notify_send: Notify::new(),
	});
	(QueueSender { inner: Arc::clone(&inner) }, QueueReceiver { inner })
}

impl<T> QueueSender<T> {
	/// Enqueues `item`, waiting for capacity while the queue is full.
	pub async fn send(&self, item: T) -> Result<(), SendError<T>> {
		loop {
			// Register before checking so a pop between unlock and await is not missed.
			let notified = self.inner.notify_send.notified();
			{
				let mut state = self.inner.state.lock();
				if state.closed {
					return Err(SendError(item));
				}
				if state.items.len() < self.inner.capacity {
					state.push(item);
					drop(state);
					self.inner.notify_recv.notify_one();
					return Ok(());
				}
			}
			notified.await;
		}
	}

	/// Enqueues `item` without waiting.
	pub fn try_send(&self, item: T) -> Result<(), TrySendError<T>> {
		let mut state = self.inner.state.lock();
		if state.closed {
			return Err(TrySendError::Closed(item));
		}
		if state.items.len() >= self.inner.capacity {
			return Err(TrySendError::Full(item));
		}
		state.push(item);
		drop(state);
		self.inner.notify_recv.notify_one();
		Ok(())
	}

	/// Closes the queue. Queued items stay readable. Idempotent.
	pub fn close(&self) {
		self.inner.close();
	}

	pub fn is_closed(&self) -> bool {
		self.inner.state.lock().closed
	}

	pub fn len(&self) -> usize {
		self.inner.state.lock().items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn capacity(&self) -> usize {
		self.inner.capacity
	}
}

impl<T> Drop for QueueSender<T> {
	fn drop(&mut self) {
		self.inner.close();
	}
}

impl<T> QueueReceiver<T> {
	/// Receives one item. Returns `None` once the queue is closed and drained.
	pub async fn recv(&self) -> Option<T> {
		loop {
			let notified = self.inner.notify_recv.notified();
			{
				let mut state = self.inner.state.lock();
				if let Some(item) = state.items.pop_front() {
					drop(state);
					self.inner.notify_send.notify_one();
					return Some(item);
				}
				if state.closed {
					return None;
				}
			}
			notified.await;
		}
	}

	/// Closes the queue from the reading side, waking a blocked sender.
	pub fn close(&self) {
		self.inner.close();
	}

	pub fn is_closed(&self) -> bool {
		self.inner.state.lock().closed
	}

	pub fn len(&self) -> usize {
		self.inner.state.lock().items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn capacity(&self) -> usize {
		self.inner.capacity
	}

	/// Deepest the queue has ever been. Never exceeds [`Self::capacity`].
	pub fn high_water(&self) -> usize {
		self.inner.state.lock().high_water
	}
}

impl<T> Drop for QueueReceiver<T> {
	fn drop(&mut self) {
		self.inner.close();
		// Nobody can read these any more.
		self.inner.state.lock().items.clear();
	}
}

impl<T> fmt::Debug for QueueSender<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("QueueSender")
			.field("capacity", &self.inner.capacity)
			.field("len", &self.len())
			.finish()
	}
}

impl<T> fmt::Debug for QueueReceiver<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("QueueReceiver")
			.field("capacity", &self.inner.capacity)
			.field("len", &self.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[tokio::test]
	async fn try_send_reports_full_then_drains_fifo() {
		let (tx, rx) = bounded(3);

		assert_eq!(tx.try_send(1u32), Ok(()));
		assert_eq!(tx.try_send(2), Ok(()));
		assert_eq!(tx.try_send(3), Ok(()));
		assert_eq!(tx.try_send(4), Err(TrySendError::Full(4)));

		tx.close();
		assert_eq!(rx.recv().await, Some(1));
		assert_eq!(rx.recv().await, Some(2));
		assert_eq!(rx.recv().await, Some(3));
		assert_eq!(rx.recv().await, None);
		assert_eq!(rx.recv().await, None);
	}

	#[tokio::test]
	async fn send_blocks_until_capacity_freed() {
		let (tx, rx) = bounded(2);
		tx.send(1u32).await.unwrap();
		tx.send(2).await.unwrap();

		let send_task = tokio::spawn(async move {
			let result = tx.send(3).await;
			(tx, result)
		});

		tokio::time::sleep(Duration::from_millis(10)).await;
		assert!(!send_task.is_finished(), "send must wait while full");

		assert_eq!(rx.recv().await, Some(1));

		let (tx, result) = tokio::time::timeout(Duration::from_millis(100), send_task)
			.await
			.expect("send should unblock after pop")
			.unwrap();
		assert_eq!(result, Ok(()));

		drop(tx);
		assert_eq!(rx.recv().await, Some(2));
		assert_eq!(rx.recv().await, Some(3));
		assert_eq!(rx.recv().await, None);
	}

	#[tokio::test]
	async fn recv_blocks_on_empty_open_queue() {
		let (tx, rx) = bounded(4);

		let pending = tokio::time::timeout(Duration::from_millis(20), rx.recv()).await;
		assert!(pending.is_err(), "recv on empty open queue should wait");

		tx.send(42u32).await.unwrap();
		assert_eq!(rx.recv().await, Some(42));
	}

	#[tokio::test]
	async fn close_wakes_waiting_receiver() {
		let (tx, rx) = bounded::<u32>(4);
		let recv_task = tokio::spawn(async move { rx.recv().await });

		tokio::time::sleep(Duration::from_millis(10)).await;
		tx.close();

		let got = tokio::time::timeout(Duration::from_millis(100), recv_task)
			.await
			.expect("receiver should wake on close")
			.unwrap();
		assert_eq!(got, None);
	}

	#[tokio::test]
	async fn dropping_sender_closes_queue() {
		let (tx, rx) = bounded(4);
		tx.send("a").await.unwrap();
		drop(tx);

		assert!(rx.is_closed());
		assert_eq!(rx.recv().await, Some("a"));
		assert_eq!(rx.recv().await, None);
	}

	#[tokio::test]
	async fn dropping_receiver_releases_blocked_sender() {
		let (tx, rx) = bounded(1);
		tx.send(1u32).await.unwrap();

		let send_task = tokio::spawn(async move { tx.send(2).await });
		tokio::time::sleep(Duration::from_millis(10)).await;

		drop(rx);

		let result = tokio::time::timeout(Duration::from_millis(100), send_task)
			.await
			.expect("blocked send should wake when receiver goes away")
			.unwrap();
		assert_eq!(result, Err(SendError(2)));
	}

	#[tokio::test]
	async fn send_after_close_hands_item_back() {
		let (tx, _rx) = bounded(4);
		tx.close();
		tx.close();

		assert_eq!(tx.send(String::from("late")).await.map_err(SendError::into_inner), Err(String::from("late")));
		assert_eq!(tx.try_send(String::from("later")).map_err(TrySendError::into_inner), Err(String::from("later")));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn slow_consumer_never_sees_more_than_capacity() {
		const ITEMS: u32 = 500;
		let (tx, rx) = bounded(4);

		let producer = tokio::spawn(async move {
			for i in 0..ITEMS {
				tx.send(i).await.unwrap();
			}
		});

		let mut received = Vec::with_capacity(ITEMS as usize);
		while let Some(item) = rx.recv().await {
			assert!(rx.len() <= rx.capacity());
			if item % 50 == 0 {
				tokio::time::sleep(Duration::from_millis(1)).await;
			}
			received.push(item);
		}
		producer.await.unwrap();

		assert_eq!(received, (0..ITEMS).collect::<Vec<_>>());
		assert!(rx.high_water() <= 4, "high water {} exceeded capacity", rx.high_water());
		assert!(rx.high_water() > 0);
	}

	#[tokio::test]
	async fn capacity_is_a_ceiling_not_a_reservation() {
		let (tx, rx) = bounded::<[u8; 1024]>(usize::MAX >> 1);
		tx.try_send([1; 1024]).unwrap();
		tx.try_send([2; 1024]).unwrap();
		drop(tx);
		assert_eq!(rx.recv().await.map(|item| item[0]), Some(1));
		assert_eq!(rx.recv().await.map(|item| item[0]), Some(2));
		assert_eq!(rx.recv().await, None);
		assert_eq!(rx.high_water(), 2);
	}

	#[test]
	#[should_panic(expected = "queue capacity must be > 0")]
	fn zero_capacity_is_rejected() {
		let _ = bounded::<u8>(0);
	}
}
