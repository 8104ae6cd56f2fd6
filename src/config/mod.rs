
use std::fs::File;
use std::io::BufReader;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::AcqErr;
use crate::gnss::satellite::Constellation;

pub const DEFAULT_MIN_SIG:f32 = 16.0;
pub const DEFAULT_MAX_SATS:usize = 96;

/// Front-end and search-grid constants.  Everything else the acquisition engine sizes itself
/// with is derived from these, and `validate` has to pass before any buffer is allocated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
	pub fs_hz:u32,
	pub fc_hz:u32,
	pub chip_rate:u32,
	pub bin_size_hz:u32,
	pub decim:usize,
	pub doppler_max_hz:u32,
	pub max_sats:usize,
	pub packet_bytes:usize,
	/// Expected FFT length; derived from the other fields when absent
	pub fft_len:Option<usize>,
}

impl Default for SearchParams {
	fn default() -> Self {
		Self { fs_hz: 16_368_000, fc_hz: 4_092_000, chip_rate: 1_023_000, bin_size_hz: 250, decim: 8,
			doppler_max_hz: 5000, max_sats: DEFAULT_MAX_SATS, packet_bytes: 512, fft_len: None }
	}
}

impl SearchParams {

	/// Raw 1-bit samples in one capture
	pub fn nsamples(&self) -> usize { (self.fs_hz / self.bin_size_hz) as usize }

	pub fn fft_len(&self) -> usize { self.fft_len.unwrap_or(self.nsamples() / self.decim) }

	/// Sample rate after decimation
	pub fn sample_rate(&self) -> usize { self.fs_hz as usize / self.decim }

	pub fn doppler_bins(&self) -> RangeInclusive<i32> {
		let n = (self.doppler_max_hz / self.bin_size_hz) as i32;
		-n..=n
	}

	/// Samples covering one code period at the working rate
	pub fn window_len(&self, code_period_ms:usize) -> usize { (self.sample_rate() / 1000) * code_period_ms }

	pub fn settle_us(&self) -> u64 { (0.5 + 1.0e6 / (self.bin_size_hz as f64)) as u64 }

	/// Local oscillator phase increment per raw sample, in quarter cycles
	pub fn lo_rate(&self) -> f32 { 4.0 * (self.fc_hz as f32) / (self.fs_hz as f32) }

	/// Code chips per raw sample
	pub fn chip_rate_per_sample(&self) -> f32 { (self.chip_rate as f32) / (self.fs_hz as f32) }

	/// Number of halving stages, zero when decimation is skipped
	pub fn decimation_stages(&self) -> usize { self.decim.trailing_zeros() as usize }

	pub fn validate(&self) -> Result<(), AcqErr> {
		if self.fs_hz == 0 || self.bin_size_hz == 0 || self.chip_rate == 0 {
			return Err(AcqErr::InvalidParams("sample rate, bin size and chip rate must be nonzero".into()));
		}
		if self.fs_hz % self.bin_size_hz != 0 {
			return Err(AcqErr::InvalidParams(format!("bin size {} Hz does not divide sample rate {} Hz", self.bin_size_hz, self.fs_hz)));
		}
		if self.decim != 1 && !(self.decim.is_power_of_two() && self.decim >= 4) {
			return Err(AcqErr::InvalidParams(format!("decimation {} is neither 1 nor a power of two >= 4", self.decim)));
		}

		// Every stage halves with truncation, so the cascade has to land exactly on the FFT length
		let mut n = self.nsamples();
		for _ in 0..self.decimation_stages() { n /= 2; }
		if n != self.fft_len() || self.nsamples() != self.fft_len() * self.decim {
			return Err(AcqErr::DecimationMismatch{ got: n, expected: self.fft_len() });
		}

		if self.fs_hz as usize % self.decim != 0 || self.sample_rate() % 1000 != 0 {
			return Err(AcqErr::InvalidParams(format!("working rate {} Hz is not a whole number of samples per ms", self.fs_hz as f64 / self.decim as f64)));
		}
		if self.window_len(Constellation::Navstar.code_period_ms()) > self.fft_len() {
			return Err(AcqErr::InvalidParams("FFT shorter than one C/A code period".into()));
		}
		if *self.doppler_bins().end() as usize >= self.fft_len() / 2 {
			return Err(AcqErr::InvalidParams(format!("Doppler span +/-{} Hz exceeds half the FFT", self.doppler_max_hz)));
		}
		if self.packet_bytes == 0 {
			return Err(AcqErr::InvalidParams("packet size must be nonzero".into()));
		}
		Ok(())
	}

}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureFaultPolicy {
	/// Hand the transport error back to the caller of the search task
	Terminate,
	/// Back off and carry on with the next satellite
	Retry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcqConfig {
	pub params: SearchParams,
	pub min_sig: f32,
	pub test_mode: bool,
	pub always_acquire: bool,
	pub enable: bool,
	pub startup_delay_ms: u64,
	pub channel_busy_backoff_ms: u64,
	pub idle_backoff_ms: u64,
	pub channel_groups: usize,
	pub channels_per_group: usize,
	pub constellations: Vec<Constellation>,
	pub capture_fault: CaptureFaultPolicy,
}

impl Default for AcqConfig {
	fn default() -> Self {
		Self {
			params: SearchParams::default(),
			min_sig: DEFAULT_MIN_SIG,
			test_mode: false,
			always_acquire: false,
			enable: true,
			startup_delay_ms: 20_000,
			channel_busy_backoff_ms: 1000,
			idle_backoff_ms: 1000,
			channel_groups: 1,
			channels_per_group: 12,
			constellations: vec![Constellation::Navstar, Constellation::Qzss, Constellation::E1b],
			capture_fault: CaptureFaultPolicy::Terminate,
		}
	}
}

impl AcqConfig {

	pub fn from_json_str(s:&str) -> Result<Self, AcqErr> {
		let cfg:Self = serde_json::from_str(s)?;
		cfg.validate()?;
		Ok(cfg)
	}

	pub fn from_json_file<P: AsRef<Path>>(path:P) -> Result<Self, AcqErr> {
		let rdr = BufReader::new(File::open(path)?);
		let cfg:Self = serde_json::from_reader(rdr)?;
		cfg.validate()?;
		Ok(cfg)
	}

	pub fn validate(&self) -> Result<(), AcqErr> {
		self.params.validate()?;
		if self.channel_groups == 0 || self.channels_per_group == 0 {
			return Err(AcqErr::InvalidParams("at least one tracking channel is required".into()));
		}
		Ok(())
	}

	pub fn is_enabled(&self, c:Constellation) -> bool { self.constellations.contains(&c) }

}
