
use log::debug;
use num_complex::Complex32;

use crate::AcqErr;
use crate::config::SearchParams;
use crate::filters::{self, NTAPS};
use crate::fourier_analysis::FftPair;
use crate::gnss::codes::{CaCode, ChipSource, E1bCodeBook};
use crate::gnss::satellite::{CodeParams, SatTable, Satellite};
use crate::utils::bipolar;

/// Code spectra at the working rate, one per satellite.  Each entry holds the spectrum twice
/// back to back so a Doppler-shifted view is always a contiguous slice.
pub struct CodeTable {
	fft_len: usize,
	codes: Vec<Vec<Complex32>>,
	windows: Vec<usize>,
}

fn generator(sp:&Satellite, e1b:&E1bCodeBook) -> Result<Box<dyn ChipSource>, AcqErr> {
	let gen:Box<dyn ChipSource> = match sp.code {
		CodeParams::Taps{ t1, t2 } => Box::new(CaCode::gps(t1, t2)),
		CodeParams::G2Init(init)   => Box::new(CaCode::qzss(init)),
		CodeParams::E1bPrn         => Box::new(e1b.code(sp.prn)?),
	};
	Ok(gen)
}

/// Samples a chip sequence at the raw rate into `buf` with a chip-rate NCO.  A sample that
/// straddles a chip boundary is blended from both chips by the fractional phase.
pub fn replica(gen:&mut dyn ChipSource, params:&SearchParams, buf:&mut [Complex32]) {
	let rate = params.chip_rate_per_sample();
	let mut phase:f32 = 0.0;
	for c in buf[..params.nsamples()].iter_mut() {
		let mut chip = bipolar(gen.chip());
		phase += rate;
		if phase >= 1.0 {
			phase -= 1.0;
			gen.clock();
			chip *= 1.0 - phase;
			chip += phase * bipolar(gen.chip());
		}
		*c = Complex32::new(chip, 0.0);
	}
}

impl CodeTable {

	pub fn init(params:&SearchParams, sats:&SatTable, e1b:&E1bCodeBook, fft:&mut FftPair) -> Result<Self, AcqErr> {
		let fft_len = params.fft_len();
		let nsamples = params.nsamples();
		let mut buf:Vec<Complex32> = vec![Complex32::new(0.0, 0.0); nsamples + NTAPS];

		let mut codes = Vec::with_capacity(sats.len());
		let mut windows = Vec::with_capacity(sats.len());
		for sp in sats.iter() {
			let window = params.window_len(sp.constellation.code_period_ms());
			if window > fft_len {
				return Err(AcqErr::InvalidParams(format!("{} needs a {} sample window but the FFT is {} long", sp.label, window, fft_len)));
			}

			let mut gen = generator(sp, e1b)?;
			replica(&mut *gen, params, &mut buf);

			let n = filters::decimate(&mut buf, nsamples, params.decim);
			if n != fft_len {
				return Err(AcqErr::DecimationMismatch{ got: n, expected: fft_len });
			}
			fft.forward(&mut buf);

			let mut code = Vec::with_capacity(2*fft_len);
			code.extend_from_slice(&buf[..fft_len]);
			code.extend_from_slice(&buf[..fft_len]);
			codes.push(code);
			windows.push(window);
		}
		debug!("code table: {} satellites, FFT length {}", codes.len(), fft_len);

		Ok(Self { fft_len, codes, windows })
	}

	pub fn fft_len(&self) -> usize { self.fft_len }
	pub fn len(&self) -> usize { self.codes.len() }
	pub fn is_empty(&self) -> bool { self.codes.is_empty() }

	/// Both copies of the spectrum, `2*fft_len` long
	pub fn code(&self, sat:usize) -> &[Complex32] { &self.codes[sat] }

	/// The spectrum advanced by `dop` bins, so element `i` is the code at bin `i - dop`
	pub fn shifted(&self, sat:usize, dop:i32) -> &[Complex32] {
		let n = self.fft_len as i32;
		let start = (n - dop).rem_euclid(n) as usize;
		&self.codes[sat][start..start+self.fft_len]
	}

	/// Correlation samples covering one code period
	pub fn window_len(&self, sat:usize) -> usize { self.windows[sat] }

}
