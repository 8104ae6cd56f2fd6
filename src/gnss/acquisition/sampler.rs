
use log::trace;
use num_complex::Complex32;

use crate::AcqErr;
use crate::config::SearchParams;
use crate::coop::TaskGate;
use crate::filters::{self, NTAPS};
use crate::fourier_analysis::FftPair;
use crate::io::SampleTransport;

// Quadrature local oscillators at a quarter of the sample rate
const LO_SIN:[u8; 4] = [1, 1, 0, 0];
const LO_COS:[u8; 4] = [1, 0, 0, 1];

/// Captures a burst of 1-bit samples, mixes it to baseband, decimates it to the working rate and
/// transforms it.  All buffers are allocated once and overwritten on every capture.
pub struct Sampler<T: SampleTransport> {
	transport: T,
	nsamples: usize,
	fft_len: usize,
	decim: usize,
	settle_us: u64,
	lo_rate: f32,
	packet: Vec<u8>,
	bits: Vec<[u8; 2]>,
	buf: Vec<Complex32>,
}

impl<T: SampleTransport> Sampler<T> {

	pub fn new(params:&SearchParams, transport:T) -> Self {
		let nsamples = params.nsamples();
		Self {
			transport,
			nsamples,
			fft_len: params.fft_len(),
			decim: params.decim,
			settle_us: params.settle_us(),
			lo_rate: params.lo_rate(),
			packet: vec![0u8; params.packet_bytes],
			bits: vec![[0u8; 2]; nsamples],
			buf: vec![Complex32::new(0.0, 0.0); nsamples + NTAPS],
		}
	}

	pub fn transport(&self) -> &T { &self.transport }

	/// Triggers the front end, waits out the capture and reads the packets back, down-converting
	/// each bit into an I/Q pair.  Bits are taken LSB first; the excess of the last packet is dropped.
	async fn capture(&mut self, gate:&TaskGate) -> Result<(), AcqErr> {
		self.transport.trigger_capture()?;
		gate.sleep_us(self.settle_us).await;

		let mut lo_phase:f32 = 0.0;
		let mut i = 0;
		while i < self.nsamples {
			let wanted = self.packet.len();
			let got = self.transport.read_packet(&mut self.packet)?;
			if got < wanted {
				return Err(AcqErr::ShortRead{ got, wanted });
			}

			'packet: for byte in self.packet.iter() {
				let mut byte = *byte;
				for _ in 0..8 {
					if i >= self.nsamples { break 'packet; }
					let bit = byte & 1;
					let p = lo_phase as usize;
					self.bits[i] = [bit ^ LO_SIN[p], bit ^ LO_COS[p]];
					lo_phase += self.lo_rate;
					if lo_phase >= 4.0 { lo_phase -= 4.0; }
					byte >>= 1;
					i += 1;
				}
			}
		}
		trace!("captured {} samples", i);
		Ok(())
	}

	/// Returns the spectrum of a fresh capture, `fft_len` samples long
	pub async fn capture_and_transform(&mut self, fft:&mut FftPair, gate:&TaskGate) -> Result<&[Complex32], AcqErr> {
		self.capture(gate).await?;
		gate.next_task("samp0").await;

		let mut n = self.nsamples;
		if self.decim == 1 {
			filters::bits_to_bipolar(&self.bits, &mut self.buf);
		} else {
			n = filters::decimate_by_2_binary(&self.bits, &mut self.buf, gate).await;
			gate.next_task("samp2").await;
			let mut i = self.decim >> 1;
			while i > 1 {
				n = filters::decimate_by_2_coop(&mut self.buf, n, gate).await;
				gate.next_task("samp3").await;
				i >>= 1;
			}
		}

		if n != self.fft_len {
			return Err(AcqErr::DecimationMismatch{ got: n, expected: self.fft_len });
		}
		gate.next_task("samp4").await;
		fft.forward(&mut self.buf);
		gate.next_task("samp5").await;

		Ok(&self.buf[..self.fft_len])
	}

}
