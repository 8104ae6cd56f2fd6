
use std::ops::Range;

use num_complex::Complex32;

use crate::coop::TaskGate;
use crate::utils::bipolar;

pub const NTAPS:usize = 31;

// Half-band low-pass, Remez design.  Every odd tap except the centre is zero.
pub const HALF_BAND:[f32; NTAPS] = [
	-0.010233,  0.0,  0.010668,  0.0, -0.016324,  0.0,  0.024377,  0.0,
	-0.036482,  0.0,  0.056990,  0.0, -0.101993,  0.0,  0.316926,
	 0.500009,
	 0.316926,  0.0, -0.101993,  0.0,  0.056990,  0.0, -0.036482,  0.0,
	 0.024377,  0.0, -0.016324,  0.0,  0.010668,  0.0, -0.010233,
];

const CENTRE:usize = (NTAPS - 1) / 2;

/// Outputs computed between cooperative yields
pub const DECIM_TSLICE:usize = 128;

/// Computes the decimated outputs in `span`, reading two inputs per output.  Input indices
/// never fall below the output index, so this runs in place.
fn filter_span(buf:&mut [Complex32], span:Range<usize>) {
	for o in span {
		let i = 2*o;
		let mut acc = buf[i] * HALF_BAND[0];
		for j in (2..NTAPS).step_by(2) {
			acc += buf[i+j] * HALF_BAND[j];
		}
		acc += buf[i+CENTRE] * HALF_BAND[CENTRE];
		buf[o] = acc;
	}
}

fn zero_tail(buf:&mut [Complex32], size:usize) {
	assert!(buf.len() >= size + NTAPS, "decimation buffer needs {} samples of tail room", NTAPS);
	for c in buf[size..size+NTAPS].iter_mut() { *c = Complex32::new(0.0, 0.0); }
}

/// Filters and halves the first `size` samples of `buf` in place, returning the new length
pub fn decimate_by_2(buf:&mut [Complex32], size:usize) -> usize {
	zero_tail(buf, size);
	filter_span(buf, 0..size/2);
	size / 2
}

/// Same as `decimate_by_2`, yielding to the scheduler after every `DECIM_TSLICE` outputs
pub async fn decimate_by_2_coop(buf:&mut [Complex32], size:usize, gate:&TaskGate) -> usize {
	zero_tail(buf, size);
	let n_out = size / 2;
	let mut o = 0;
	while o < n_out {
		let end = usize::min(o + DECIM_TSLICE, n_out);
		filter_span(buf, o..end);
		if end - o == DECIM_TSLICE { gate.next_task("decimate by 2").await; }
		o = end;
	}
	n_out
}

/// Maps raw I/Q bits onto +/-1.0 levels in `buf`
pub fn bits_to_bipolar(bits:&[[u8; 2]], buf:&mut [Complex32]) {
	for (b, c) in bits.iter().zip(buf.iter_mut()) {
		*c = Complex32::new(bipolar(b[0]), bipolar(b[1]));
	}
}

/// First stage for captured data: expands the bits into `buf` and decimates from there
pub async fn decimate_by_2_binary(bits:&[[u8; 2]], buf:&mut [Complex32], gate:&TaskGate) -> usize {
	bits_to_bipolar(bits, buf);
	decimate_by_2_coop(buf, bits.len(), gate).await
}

/// Halves `size` repeatedly until `decim` is used up; a factor of 1 leaves the buffer alone
pub fn decimate(buf:&mut [Complex32], mut size:usize, decim:usize) -> usize {
	let mut i = decim;
	while i > 1 {
		size = decimate_by_2(buf, size);
		i >>= 1;
	}
	size
}
