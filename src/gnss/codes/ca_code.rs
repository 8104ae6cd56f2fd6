
use super::ChipSource;

const MASK:u16 = 0x3ff;

#[inline]
fn stage(reg:u16, n:u8) -> u16 { (reg >> (n - 1)) & 1 }

/// C/A Gold code generator built from the G1 and G2 shift registers.  GPS satellites select
/// their code with two G2 phase taps; QZSS satellites preload G2 and take its last stage.
#[derive(Debug, Clone)]
pub struct CaCode {
	g1: u16,
	g2: u16,
	taps: Option<(u8, u8)>,
}

impl CaCode {

	pub fn gps(t1:u8, t2:u8) -> Self {
		assert!((1..=10).contains(&t1) && (1..=10).contains(&t2), "G2 taps out of range");
		Self { g1: MASK, g2: MASK, taps: Some((t1, t2)) }
	}

	pub fn qzss(g2_init:u16) -> Self { Self { g1: MASK, g2: g2_init & MASK, taps: None } }

}

impl ChipSource for CaCode {

	fn chip(&self) -> u8 {
		let g2 = match self.taps {
			Some((t1, t2)) => stage(self.g2, t1) ^ stage(self.g2, t2),
			None           => stage(self.g2, 10),
		};
		(stage(self.g1, 10) ^ g2) as u8
	}

	fn clock(&mut self) {
		let fb1 = stage(self.g1, 3) ^ stage(self.g1, 10);
		let fb2 = stage(self.g2, 2) ^ stage(self.g2, 3) ^ stage(self.g2, 6) ^ stage(self.g2, 8) ^ stage(self.g2, 9) ^ stage(self.g2, 10);
		self.g1 = ((self.g1 << 1) | fb1) & MASK;
		self.g2 = ((self.g2 << 1) | fb2) & MASK;
	}

}
