
pub mod ca_code;
pub mod e1b_code;

pub use ca_code::CaCode;
pub use e1b_code::{E1bCode, E1bCodeBook, E1B_CODE_LEN};

/// A spreading code generator: `chip` reads the current chip as a logic bit and `clock`
/// advances one chip.
pub trait ChipSource {
	fn chip(&self) -> u8;
	fn clock(&mut self);

	fn take_chips(&mut self, n:usize) -> Vec<u8> {
		(0..n).map(|_| {
			let c = self.chip();
			self.clock();
			c
		}).collect()
	}
}
