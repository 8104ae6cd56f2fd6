
use std::sync::Arc;

use rustfft::{Fft, FftPlanner};
use num_complex::Complex32;
use num_traits::Zero;

/// Forward and inverse plans of one length, planned once and reused for every capture and
/// correlation.  Neither transform normalizes.
pub struct FftPair {
	len: usize,
	fwd: Arc<dyn Fft<f32>>,
	rev: Arc<dyn Fft<f32>>,
	scratch: Vec<Complex32>,
}

impl FftPair {

	pub fn new(len:usize) -> Self {
		let mut planner = FftPlanner::new();
		let fwd = planner.plan_fft_forward(len);
		let rev = planner.plan_fft_inverse(len);
		let scratch_len = usize::max(fwd.get_inplace_scratch_len(), rev.get_inplace_scratch_len());
		Self { len, fwd, rev, scratch: vec![Complex32::zero(); scratch_len] }
	}

	pub fn len(&self) -> usize { self.len }
	pub fn is_empty(&self) -> bool { self.len == 0 }

	/// Transforms the first `len` samples of `buf` in place
	pub fn forward(&mut self, buf:&mut [Complex32]) {
		self.fwd.process_with_scratch(&mut buf[..self.len], &mut self.scratch);
	}

	pub fn inverse(&mut self, buf:&mut [Complex32]) {
		self.rev.process_with_scratch(&mut buf[..self.len], &mut self.scratch);
	}

}
