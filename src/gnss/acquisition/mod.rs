
use num_complex::Complex32;

use crate::AcqErr;
use crate::config::SearchParams;
use crate::coop::TaskGate;
use crate::fourier_analysis::FftPair;
use crate::gnss::codes::E1bCodeBook;
use crate::gnss::satellite::SatTable;
use crate::io::SampleTransport;

pub mod code_table;
pub mod correlator;
pub mod sampler;

#[cfg(test)]
pub(crate) mod synth;

pub use code_table::CodeTable;
pub use correlator::Correlator;
pub use sampler::Sampler;

/// Best Doppler hypothesis and code phase found for one satellite in one capture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
	pub doppler_bin:i32,
	/// Index of the correlation peak within the code-period window, in decimated samples
	pub code_phase:usize,
	/// Peak power over average power in the window
	pub snr:f32,
}

impl SearchResult {
	pub fn doppler_hz(&self, params:&SearchParams) -> i32 { self.doppler_bin * params.bin_size_hz as i32 }
}

/// Everything one satellite search needs, owned by the search task: the FFT plan pair,
/// the code spectra, the capture path and the correlation scratch.
pub struct Acquisition<T: SampleTransport> {
	params: SearchParams,
	fft: FftPair,
	table: CodeTable,
	sampler: Sampler<T>,
	correlator: Correlator,
}

impl<T: SampleTransport> Acquisition<T> {

	pub fn new(params:&SearchParams, sats:&SatTable, e1b:&E1bCodeBook, transport:T) -> Result<Self, AcqErr> {
		params.validate()?;
		let mut fft = FftPair::new(params.fft_len());
		let table = CodeTable::init(params, sats, e1b, &mut fft)?;
		let sampler = Sampler::new(params, transport);
		let correlator = Correlator::new(params);
		Ok(Self { params: params.clone(), fft, table, sampler, correlator })
	}

	pub fn params(&self) -> &SearchParams { &self.params }
	pub fn code_table(&self) -> &CodeTable { &self.table }

	/// Captures a fresh block of samples and correlates it against one satellite
	pub async fn search(&mut self, sat:usize, gate:&TaskGate) -> Result<SearchResult, AcqErr> {
		let data:&[Complex32] = self.sampler.capture_and_transform(&mut self.fft, gate).await?;
		Ok(self.correlator.correlate(&self.table, sat, data, &mut self.fft, gate).await)
	}

}
