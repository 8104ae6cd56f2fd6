
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::AcqErr;
use crate::config::{AcqConfig, CaptureFaultPolicy};
use crate::coop::TaskGate;
use crate::gnss::acquisition::{Acquisition, SearchResult};
use crate::gnss::channel::{self, ChannelStart, TrackingChannels};
use crate::gnss::codes::E1bCodeBook;
use crate::gnss::satellite::{Constellation, SatTable};
use crate::io::SampleTransport;
use crate::status::{StatusEvent, StatusSink};

mod control;
pub use control::{ReceiverState, SearchControl, MIN_GOOD_SATS};

#[cfg(test)]
mod tests;

/// What one pass through the loop did with its candidate
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
	/// Constellation not enabled
	Disabled(usize),
	/// Already being tracked
	Busy(usize),
	/// Every channel taken and other channel groups exist
	NoChannel(usize),
	BelowThreshold{ ch:usize, sat:usize, result:SearchResult },
	Acquired(ChannelStart),
	/// Capture failed and the task backed off
	CaptureFault,
}

/// The tracking side's way back into the search: report a lost signal, optionally asking for the
/// satellite to be searched again straight away.
#[derive(Debug, Clone)]
pub struct SearchHandle {
	sats: Arc<SatTable>,
	restart: mpsc::UnboundedSender<usize>,
}

impl SearchHandle {

	pub fn signal_lost(&self, ch:usize, sat:usize, restart:bool) {
		let sp = match self.sats.get(sat) {
			Some(sp) => sp,
			None => return,
		};
		sp.set_busy(false);
		debug!("ch{:02} {} {}", ch+1, sp.label, if restart { "restart" } else { "signal lost" });
		if restart && self.restart.send(sat).is_err() {
			debug!("search task has exited, restart of {} dropped", sp.label);
		}
	}

}

/// The acquisition loop.  Walks the satellite table forever, searching every satellite that is
/// enabled and not already tracked, and hands detections to the tracking channels.
pub struct SearchTask<T: SampleTransport, C: TrackingChannels, S: StatusSink> {
	cfg: AcqConfig,
	sats: Arc<SatTable>,
	acq: Acquisition<T>,
	tracking: C,
	status: S,
	gate: TaskGate,
	restarts: mpsc::UnboundedReceiver<usize>,
	cursor: usize,
	resume_at: Option<usize>,
	searched_this_pass: bool,
	last_ch: Option<usize>,
	last_snr: f32,
	epoch: Instant,
}

impl<T: SampleTransport, C: TrackingChannels, S: StatusSink> SearchTask<T, C, S> {

	/// Builds the code table up front; any inconsistency in the constants or tables fails here
	pub fn new(cfg:AcqConfig, sats:Arc<SatTable>, e1b:&E1bCodeBook, transport:T, tracking:C, status:S, gate:TaskGate) -> Result<(Self, SearchHandle), AcqErr> {
		cfg.validate()?;
		if sats.is_empty() {
			return Err(AcqErr::InvalidParams("empty satellite table".into()));
		}
		if sats.len() >= cfg.params.max_sats {
			return Err(AcqErr::TooManySatellites{ count: sats.len(), max: cfg.params.max_sats });
		}

		let acq = Acquisition::new(&cfg.params, &sats, e1b, transport)?;
		let (tx, rx) = mpsc::unbounded_channel();
		let handle = SearchHandle{ sats: sats.clone(), restart: tx };

		Ok((Self {
			cfg, sats, acq, tracking, status, gate,
			restarts: rx,
			cursor: 0,
			resume_at: None,
			searched_this_pass: false,
			last_ch: None,
			last_snr: 0.0,
			epoch: Instant::now(),
		}, handle))
	}

	pub fn gate(&self) -> &TaskGate { &self.gate }
	pub fn tracking(&self) -> &C { &self.tracking }
	pub fn status(&self) -> &S { &self.status }

	/// Runs until a capture fault the policy does not absorb
	pub async fn run(&mut self) -> Result<(), AcqErr> {
		self.gate.sleep_ms(self.cfg.startup_delay_ms).await;
		self.epoch = Instant::now();

		let params = self.acq.params();
		self.status.emit(StatusEvent::SearchParams{ decim: params.decim, fft_len: params.fft_len(), min_sig: self.cfg.min_sig });
		self.status.emit(StatusEvent::Acquiring{ active: true });

		loop {
			self.step().await?;
		}
	}

	/// Restarts go first; once they drain, iteration picks up where the first one interrupted it
	async fn next_candidate(&mut self) -> usize {
		if let Ok(sat) = self.restarts.try_recv() {
			if self.resume_at.is_none() { self.resume_at = Some(self.cursor); }
			return sat;
		}
		if let Some(resume) = self.resume_at.take() { self.cursor = resume; }

		if self.cursor >= self.sats.len() {
			self.cursor = 0;
			if !self.searched_this_pass {
				debug!("nothing to search, backing off {} ms", self.cfg.idle_backoff_ms);
				self.gate.sleep_ms(self.cfg.idle_backoff_ms).await;
			}
			self.searched_this_pass = false;
		}
		let sat = self.cursor;
		self.cursor += 1;
		sat
	}

	async fn allocate(&mut self, sat:usize) -> Option<usize> {
		loop {
			if let Some(ch) = self.tracking.allocate_channel(sat) { return Some(ch); }
			if self.cfg.channel_groups > 1 { return None; }
			debug!("all channels busy");
			self.gate.sleep_ms(self.cfg.channel_busy_backoff_ms).await;
		}
	}

	async fn capture_fault(&mut self, ch:usize, e:AcqErr) -> Result<StepOutcome, AcqErr> {
		self.tracking.release_channel(ch);
		let transient = matches!(e, AcqErr::ShortRead{..} | AcqErr::Io(_));
		if !transient || self.cfg.capture_fault == CaptureFaultPolicy::Terminate {
			return Err(e);
		}

		warn!("capture failed, retrying in {} ms: {}", self.cfg.idle_backoff_ms, e);
		self.status.emit(StatusEvent::Acquiring{ active: false });
		// A suspension during the backoff hands resume reporting to whoever woke the task
		if !self.gate.backoff_ms(self.cfg.idle_backoff_ms).await {
			self.status.emit(StatusEvent::Acquiring{ active: true });
		}
		Ok(StepOutcome::CaptureFault)
	}

	/// Considers one satellite: allocate a channel, capture, correlate and hand off or release
	pub async fn step(&mut self) -> Result<StepOutcome, AcqErr> {
		let sat = self.next_candidate().await;
		let sats = self.sats.clone();
		let sp = &sats[sat];

		if !self.cfg.is_enabled(sp.constellation) {
			return Ok(StepOutcome::Disabled(sat));
		}
		if sp.is_busy() {
			self.gate.next_task("busy1").await;
			return Ok(StepOutcome::Busy(sat));
		}

		let ch = match self.allocate(sat).await {
			Some(ch) => ch,
			None => return Ok(StepOutcome::NoChannel(sat)),
		};

		if let Some(last) = self.last_ch {
			if last != ch && self.last_snr < self.cfg.min_sig {
				self.status.emit(StatusEvent::ClearChannel{ ch: last });
			}
		}

		debug!("FFT-{}", sp.label);
		let t_sample = self.epoch.elapsed().as_micros() as u64;
		let started = Instant::now();
		let result = match self.acq.search(sat, &self.gate).await {
			Ok(result) => result,
			Err(e) => return self.capture_fault(ch, e).await,
		};
		let elapsed_us = started.elapsed().as_micros() as u64;
		self.searched_this_pass = true;

		let below = result.snr < self.cfg.min_sig;
		let code_phase = result.code_phase * self.cfg.params.decim;
		self.status.emit(StatusEvent::Satellite{ ch, sat: sp.label.clone(), snr: result.snr, below_threshold: below, elapsed_us });
		self.last_ch = Some(ch);
		self.last_snr = result.snr;

		if self.cfg.test_mode || (sp.constellation == Constellation::E1b && !below) {
			info!("FFT-{} {:.3} secs SNR={:.1}", sp.label, elapsed_us as f64 / 1.0e6, result.snr);
		}

		if below {
			self.tracking.release_channel(ch);
			return Ok(StepOutcome::BelowThreshold{ ch, sat, result });
		}

		let doppler_hz = result.doppler_hz(self.acq.params());
		self.status.emit(StatusEvent::Doppler{ ch, doppler_hz, code_phase });
		sp.set_busy(true);

		let start = ChannelStart {
			ch, sat,
			label: sp.label.clone(),
			sample_time_us: t_sample,
			generator_init: channel::generator_init(sp),
			doppler_hz,
			code_phase,
			snr: result.snr,
		};
		self.tracking.start_channel(start.clone());
		Ok(StepOutcome::Acquired(start))
	}

}
