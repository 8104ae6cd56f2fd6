
use std::ops::RangeInclusive;

use log::debug;
use num_complex::Complex32;

use crate::config::SearchParams;
use crate::coop::TaskGate;
use crate::fourier_analysis::FftPair;
use super::{CodeTable, SearchResult};

/// Sweeps the Doppler bins for one satellite.  Each bin is a conjugate multiply against the
/// shifted code spectrum, an inverse FFT, and a peak/average power search over one code period.
pub struct Correlator {
	bins: RangeInclusive<i32>,
	prod: Vec<Complex32>,
}

impl Correlator {

	pub fn new(params:&SearchParams) -> Self {
		Self { bins: params.doppler_bins(), prod: vec![Complex32::new(0.0, 0.0); params.fft_len()] }
	}

	pub async fn correlate(&mut self, table:&CodeTable, sat:usize, data:&[Complex32], fft:&mut FftPair, gate:&TaskGate) -> SearchResult {
		let window = table.window_len(sat);
		let mut best = SearchResult{ doppler_bin: 0, code_phase: 0, snr: 0.0 };

		for dop in self.bins.clone() {
			let code = table.shifted(sat, dop);
			for ((p, d), c) in self.prod.iter_mut().zip(data.iter()).zip(code.iter()) {
				*p = d.conj() * c;
			}
			gate.next_task("corr FFT long run").await;
			fft.inverse(&mut self.prod);
			gate.next_task("corr FFT end").await;

			let mut max_pwr:f32 = 0.0;
			let mut max_idx:usize = 0;
			let mut tot_pwr:f32 = 0.0;
			for (idx, p) in self.prod[..window].iter().enumerate() {
				let pwr = p.norm_sqr();
				if pwr > max_pwr {
					max_pwr = pwr;
					max_idx = idx;
				}
				tot_pwr += pwr;
			}
			gate.next_task("corr pwr").await;

			let ave_pwr = tot_pwr / (window as f32);
			let snr = max_pwr / ave_pwr;
			if snr > best.snr {
				best = SearchResult{ doppler_bin: dop, code_phase: max_idx, snr };
			}
		}

		debug!("correlate sat {}: SNR {:.1} Doppler bin {} phase {}", sat, best.snr, best.doppler_bin, best.code_phase);
		best
	}

}
