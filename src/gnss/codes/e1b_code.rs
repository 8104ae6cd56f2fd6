
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use crate::AcqErr;
use crate::utils;
use super::ChipSource;

pub const E1B_CODE_LEN:usize = 4092;

/// First 20 chips of the ICD primary codes that a loaded book is checked against
pub const E1B_ICD_HEADS:[(u16, u32); 2] = [(1, 0xf5d71), (2, 0x96b85)];

/// Galileo E1B primary codes are memory codes, so they have to come from the ICD tables rather
/// than a generator.  The book holds them as unpacked chips, keyed by PRN.
#[derive(Debug, Clone, Default)]
pub struct E1bCodeBook {
	codes: HashMap<u16, Arc<Vec<u8>>>,
}

impl E1bCodeBook {

	pub fn new() -> Self { Self::default() }

	/// Adds a code given as ICD hex, first chip in the most significant bit
	pub fn insert_hex(&mut self, prn:u16, hex:&str) -> Result<(), AcqErr> {
		if prn == 0 {
			return Err(AcqErr::InvalidCode("E1B PRNs start at 1".into()));
		}
		let chips = utils::hex_to_bits(hex)?;
		if chips.is_empty() {
			return Err(AcqErr::InvalidCode(format!("empty code for PRN {}", prn)));
		}
		self.codes.insert(prn, Arc::new(chips));
		Ok(())
	}

	/// Parses `{ "<prn>": "<hex>", ... }`, requiring every code to be a full primary code and
	/// PRNs 1 and 2, where present, to match the ICD
	pub fn from_json_str(s:&str) -> Result<Self, AcqErr> {
		let raw:HashMap<String, String> = serde_json::from_str(s)?;
		Self::from_map(raw)
	}

	pub fn from_json_file<P: AsRef<Path>>(path:P) -> Result<Self, AcqErr> {
		let raw:HashMap<String, String> = serde_json::from_reader(BufReader::new(File::open(path)?))?;
		Self::from_map(raw)
	}

	fn from_map(raw:HashMap<String, String>) -> Result<Self, AcqErr> {
		let mut book = Self::new();
		for (key, hex) in raw.iter() {
			let prn:u16 = key.trim().parse().map_err(|_| AcqErr::InvalidCode(format!("bad PRN key '{}'", key)))?;
			book.insert_hex(prn, hex)?;
			if book.codes[&prn].len() != E1B_CODE_LEN {
				return Err(AcqErr::InvalidCode(format!("PRN {} has {} chips, expected {}", prn, book.codes[&prn].len(), E1B_CODE_LEN)));
			}
		}
		book.check_icd_heads()?;
		Ok(book)
	}

	/// Catches a code file that is misordered or not the E1B primary codes at all
	pub fn check_icd_heads(&self) -> Result<(), AcqErr> {
		for (prn, head) in E1B_ICD_HEADS.iter() {
			if !self.contains(*prn) { continue; }
			let got = utils::to_u32(&self.code(*prn)?.take_chips(20))?;
			if got != *head {
				return Err(AcqErr::InvalidCode(format!("PRN {} starts {:05X}, ICD has {:05X}", prn, got, head)));
			}
		}
		Ok(())
	}

	pub fn contains(&self, prn:u16) -> bool { self.codes.contains_key(&prn) }
	pub fn len(&self) -> usize { self.codes.len() }
	pub fn is_empty(&self) -> bool { self.codes.is_empty() }

	pub fn code(&self, prn:u16) -> Result<E1bCode, AcqErr> {
		self.codes.get(&prn)
			.map(|chips| E1bCode{ chips: chips.clone(), idx: 0 })
			.ok_or(AcqErr::MissingCode(prn))
	}

}

#[derive(Debug, Clone)]
pub struct E1bCode {
	chips: Arc<Vec<u8>>,
	idx: usize,
}

impl E1bCode {
	pub fn len(&self) -> usize { self.chips.len() }
	pub fn is_empty(&self) -> bool { self.chips.is_empty() }
}

impl ChipSource for E1bCode {

	fn chip(&self) -> u8 { self.chips[self.idx] }

	fn clock(&mut self) {
		self.idx += 1;
		if self.idx >= self.chips.len() { self.idx = 0; }
	}

}
