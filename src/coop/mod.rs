
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use log::trace;
use tokio::sync::Notify;

/// Control a supervisor holds over a cooperative task: put it to sleep indefinitely, or wake it.
/// A sleeping task stops at its next yield point and stays there until woken.
pub trait TaskControl {
	fn sleep(&self);
	fn wake(&self);
}

struct GateState {
	asleep: AtomicBool,
	wakeup: Notify,
	yields: AtomicU64,
}

/// Yield points and timed waits for a long-running task on a single-threaded tokio runtime.
/// Clones share state, so the supervisor keeps one handle and the task the other.
#[derive(Clone)]
pub struct TaskGate {
	state: Arc<GateState>,
}

impl Default for TaskGate {
	fn default() -> Self { Self::new() }
}

impl TaskGate {

	pub fn new() -> Self {
		Self { state: Arc::new(GateState{ asleep: AtomicBool::new(false), wakeup: Notify::new(), yields: AtomicU64::new(0) }) }
	}

	pub fn is_asleep(&self) -> bool { self.state.asleep.load(Ordering::Acquire) }

	/// Yield points passed so far
	pub fn yields(&self) -> u64 { self.state.yields.load(Ordering::Relaxed) }

	/// Hands the CPU back to the runtime, then parks here for as long as the task is asleep
	pub async fn next_task(&self, at:&'static str) {
		self.state.yields.fetch_add(1, Ordering::Relaxed);
		trace!("yield: {}", at);
		tokio::task::yield_now().await;
		self.park().await;
	}

	pub async fn sleep_ms(&self, ms:u64) { self.sleep_for(Duration::from_millis(ms)).await; }
	pub async fn sleep_us(&self, us:u64) { self.sleep_for(Duration::from_micros(us)).await; }

	/// Timed wait; true if the task was put to sleep before it could carry on
	pub async fn backoff_ms(&self, ms:u64) -> bool { self.sleep_for(Duration::from_millis(ms)).await }

	async fn sleep_for(&self, d:Duration) -> bool {
		if !d.is_zero() { tokio::time::sleep(d).await; }
		self.park().await
	}

	/// Returns whether it had to wait for a wake
	async fn park(&self) -> bool {
		let mut parked = false;
		loop {
			// Register interest before checking the flag so a wake in between is not lost
			let woken = self.state.wakeup.notified();
			if !self.is_asleep() { return parked; }
			parked = true;
			woken.await;
		}
	}

}

impl TaskControl for TaskGate {

	fn sleep(&self) { self.state.asleep.store(true, Ordering::Release); }

	fn wake(&self) {
		self.state.asleep.store(false, Ordering::Release);
		self.state.wakeup.notify_waiters();
	}

}

#[cfg(test)]
mod tests {

	use std::sync::atomic::AtomicUsize;

	use super::*;

	#[tokio::test]
	async fn yields_are_counted() {
		let gate = TaskGate::new();
		gate.next_task("a").await;
		gate.next_task("b").await;
		assert_eq!(gate.yields(), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn sleeping_task_parks_until_woken() {
		let gate = TaskGate::new();
		let progress = Arc::new(AtomicUsize::new(0));

		let task_gate = gate.clone();
		let task_progress = progress.clone();
		let handle = tokio::spawn(async move {
			for _ in 0..3 {
				task_gate.next_task("loop").await;
				task_progress.fetch_add(1, Ordering::SeqCst);
			}
		});

		gate.sleep();
		tokio::time::sleep(Duration::from_millis(50)).await;
		assert_eq!(progress.load(Ordering::SeqCst), 0);

		gate.wake();
		handle.await.unwrap();
		assert_eq!(progress.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn timed_sleep_elapses() {
		let gate = TaskGate::new();
		let start = tokio::time::Instant::now();
		gate.sleep_ms(1000).await;
		assert!(start.elapsed() >= Duration::from_millis(1000));
	}

	#[tokio::test(start_paused = true)]
	async fn backoff_reports_suspension() {
		let gate = TaskGate::new();
		assert!(!gate.backoff_ms(100).await);

		let supervisor = gate.clone();
		let (suspended, _) = tokio::join!(gate.backoff_ms(1000), async move {
			tokio::time::sleep(Duration::from_millis(500)).await;
			supervisor.sleep();
			tokio::time::sleep(Duration::from_millis(2000)).await;
			supervisor.wake();
		});
		assert!(suspended);
		assert!(!gate.is_asleep());
	}

}
