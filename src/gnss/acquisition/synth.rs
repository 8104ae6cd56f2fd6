
// Synthetic inputs shared by the acquisition and search tests

use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use num_complex::Complex32;

use crate::config::SearchParams;
use crate::gnss::codes::{ChipSource, E1bCodeBook};
use super::code_table::replica;

/// Random stand-ins for the E1B memory codes, full length
pub fn random_code_book(prns:&[u16], seed:u64) -> E1bCodeBook {
	let mut rng = StdRng::seed_from_u64(seed);
	let mut book = E1bCodeBook::new();
	for prn in prns {
		let hex:String = (0..1023).map(|_| std::char::from_digit(rng.gen_range(0..16), 16).unwrap()).collect();
		book.insert_hex(*prn, &hex).unwrap();
	}
	book
}

/// One capture of 1-bit IF samples carrying `code` delayed by `delay` raw samples and offset by
/// `doppler_hz`, plus gaussian noise with standard deviation `noise` against a unit carrier.
/// Padded with zeros to a whole number of packets.
pub fn if_bits<C: ChipSource>(params:&SearchParams, mut code:C, delay:usize, doppler_hz:f64, noise:f64, seed:u64) -> Vec<u8> {
	let n = params.nsamples();
	let mut chips = vec![Complex32::new(0.0, 0.0); n];
	replica(&mut code, params, &mut chips);

	let mut rng = StdRng::seed_from_u64(seed);
	let normal = Normal::new(0.0, noise).unwrap();
	let w = 2.0 * PI * (params.fc_hz as f64 + doppler_hz) / (params.fs_hz as f64);

	let packet_bits = params.packet_bytes * 8;
	let mut bits:Vec<u8> = Vec::with_capacity(n + packet_bits);
	for m in 0..n {
		let chip = chips[(m + n - delay % n) % n].re as f64;
		let s = chip * (w * (m as f64) + 1.1).cos() + normal.sample(&mut rng);
		bits.push((s < 0.0) as u8);
	}
	while bits.len() % packet_bits != 0 { bits.push(0); }
	bits
}

/// A capture with no signal in it
pub fn noise_bits(params:&SearchParams, seed:u64) -> Vec<u8> {
	let mut rng = StdRng::seed_from_u64(seed);
	let n = params.nsamples();
	let packet_bits = params.packet_bytes * 8;
	(0..n.div_ceil(packet_bits) * packet_bits).map(|_| rng.gen_range(0..2)).collect()
}
