
use std::sync::{Arc, Mutex};

use log::{debug, info};
use serde::Serialize;

use crate::gnss::satellite::{CodeParams, Satellite};

/// Selects the QZSS preload path in the tracking code generator
pub const G2_INIT:u32 = 0x400;
/// Selects the E1B memory code path in the tracking code generator
pub const E1B_MODE:u32 = 0x800;

/// Everything a tracking channel needs to pick up an acquired signal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelStart {
	pub ch: usize,
	pub sat: usize,
	pub label: String,
	/// When the capture was taken, microseconds since the search task started
	pub sample_time_us: u64,
	pub generator_init: u32,
	pub doppler_hz: i32,
	/// Code phase in raw samples
	pub code_phase: usize,
	pub snr: f32,
}

/// The tracking side as the search task sees it
pub trait TrackingChannels {
	/// Reserves a free channel for `sat`, if there is one
	fn allocate_channel(&mut self, sat:usize) -> Option<usize>;
	/// Returns a reserved channel that will not be started
	fn release_channel(&mut self, ch:usize);
	fn start_channel(&mut self, start:ChannelStart);
}

impl<T: TrackingChannels + ?Sized> TrackingChannels for Box<T> {
	fn allocate_channel(&mut self, sat:usize) -> Option<usize> { (**self).allocate_channel(sat) }
	fn release_channel(&mut self, ch:usize) { (**self).release_channel(ch) }
	fn start_channel(&mut self, start:ChannelStart) { (**self).start_channel(start) }
}

/// Code generator setting for the satellite's tracking channel
pub fn generator_init(sp:&Satellite) -> u32 {
	match sp.code {
		CodeParams::Taps{ t1, t2 } => ((t1 as u32) << 4) + (t2 as u32),
		CodeParams::G2Init(state)  => G2_INIT | (state as u32),
		CodeParams::E1bPrn         => E1B_MODE | (sp.prn.saturating_sub(1) as u32),
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
	Free,
	Reserved(usize),
	Tracking(usize),
}

/// In-memory channel bank.  Channels are handed out lowest index first; started channels stay
/// taken until `signal_lost`.  Every start is appended to a shared log.
#[derive(Debug, Clone)]
pub struct ChannelBank {
	states: Vec<ChannelState>,
	starts: Arc<Mutex<Vec<ChannelStart>>>,
}

impl ChannelBank {

	pub fn new(groups:usize, per_group:usize) -> Self {
		Self { states: vec![ChannelState::Free; groups * per_group], starts: Arc::new(Mutex::new(vec![])) }
	}

	pub fn len(&self) -> usize { self.states.len() }
	pub fn is_empty(&self) -> bool { self.states.is_empty() }

	pub fn state(&self, ch:usize) -> ChannelState { self.states[ch] }

	pub fn tracking(&self) -> usize {
		self.states.iter().filter(|s| matches!(s, ChannelState::Tracking(_))).count()
	}

	/// Shared handle on the start log
	pub fn starts(&self) -> Arc<Mutex<Vec<ChannelStart>>> { self.starts.clone() }

	/// Frees a tracking channel, returning the satellite it was on
	pub fn signal_lost(&mut self, ch:usize) -> Option<usize> {
		match self.states.get(ch).copied() {
			Some(ChannelState::Tracking(sat)) => {
				self.states[ch] = ChannelState::Free;
				Some(sat)
			},
			_ => None,
		}
	}

}

impl TrackingChannels for ChannelBank {

	fn allocate_channel(&mut self, sat:usize) -> Option<usize> {
		let ch = self.states.iter().position(|s| *s == ChannelState::Free)?;
		self.states[ch] = ChannelState::Reserved(sat);
		Some(ch)
	}

	fn release_channel(&mut self, ch:usize) {
		if let Some(ChannelState::Reserved(_)) = self.states.get(ch) {
			self.states[ch] = ChannelState::Free;
		}
	}

	fn start_channel(&mut self, start:ChannelStart) {
		info!("ch{:02} {} start: Doppler {} Hz, code phase {}, SNR {:.0}", start.ch+1, start.label, start.doppler_hz, start.code_phase, start.snr);
		self.states[start.ch] = ChannelState::Tracking(start.sat);
		match self.starts.lock() {
			Ok(mut log) => log.push(start),
			Err(e) => debug!("start log unavailable: {}", e),
		}
	}

}
