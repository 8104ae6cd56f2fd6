
use crate::AcqErr;

/// Maps a logic bit onto a signal level: 1 is -1.0 and 0 is +1.0
#[inline]
pub fn bipolar(bit:u8) -> f32 { if bit != 0 { -1.0 } else { 1.0 } }

pub fn to_u32(bits:&[u8]) -> Result<u32, AcqErr> {
	let n = bits.len();
	if n <= 32 {
		Ok(bits.iter().fold(0u32, |acc, b| (acc << 1) | (*b as u32 & 1)))
	} else {
		Err(AcqErr::InvalidParams(format!("{} bits do not fit in a u32", n)))
	}
}

/// Unpacks a hex string into bits, most significant bit of each digit first
pub fn hex_to_bits(hex:&str) -> Result<Vec<u8>, AcqErr> {
	let mut ans:Vec<u8> = Vec::with_capacity(hex.len() * 4);
	for c in hex.trim().chars() {
		let nibble = c.to_digit(16).ok_or_else(|| AcqErr::InvalidCode(format!("'{}' is not a hex digit", c)))?;
		for shift in (0..4).rev() {
			ans.push(((nibble >> shift) & 1) as u8);
		}
	}
	Ok(ans)
}
