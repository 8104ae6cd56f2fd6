
use log::info;
use serde::{Serialize, Deserialize};

use crate::coop::TaskControl;
use crate::status::{StatusEvent, StatusSink};

/// Below this many tracked satellites there are not enough for fresh fixes, so keep searching
pub const MIN_GOOD_SATS:usize = 5;

/// The receiver-wide facts the run decision is made from, read fresh on every tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverState {
	/// Clock corrections applied from GPS so far
	pub clock_corrections: u64,
	pub active_users: usize,
	/// Satellites currently tracked well enough to contribute to a fix
	pub good_sats: usize,
	pub always_acquire: bool,
	pub enabled: bool,
	pub update_in_progress: bool,
	pub sd_copy_in_progress: bool,
	pub backup_in_progress: bool,
}

impl ReceiverState {

	/// Whether the search should be running at all given current load
	pub fn wants_search(&self) -> bool {
		let mut start = self.clock_corrections == 0
			|| self.active_users == 0
			|| self.good_sats < MIN_GOOD_SATS
			|| self.always_acquire;

		if self.update_in_progress || self.sd_copy_in_progress || self.backup_in_progress { start = false; }
		if !self.enabled { start = false; }
		start
	}

}

/// Suspends the search task while the receiver is loaded and wakes it when it is not.  Sleep and
/// wake are only issued on a change of state.
pub struct SearchControl<C: TaskControl> {
	task: Option<C>,
	acquiring: bool,
}

impl<C: TaskControl> Default for SearchControl<C> {
	fn default() -> Self { Self::new() }
}

impl<C: TaskControl> SearchControl<C> {

	pub fn new() -> Self { Self { task: None, acquiring: true } }

	pub fn register(&mut self, task:C) { self.task = Some(task); }

	pub fn is_acquiring(&self) -> bool { self.acquiring }

	/// Evaluates one decision tick and returns whether acquisition is administratively enabled
	pub fn should_run(&mut self, state:&ReceiverState, status:&mut dyn StatusSink) -> bool {
		let task = match &self.task {
			Some(task) => task,
			None => return false,
		};

		let start = state.wants_search();
		if self.acquiring && !start {
			info!("search suspended");
			self.acquiring = false;
			status.emit(StatusEvent::Acquiring{ active: false });
			task.sleep();
		} else if !self.acquiring && start {
			info!("search resumed");
			self.acquiring = true;
			status.emit(StatusEvent::Acquiring{ active: true });
			task.wake();
		}

		state.enabled
	}

}
