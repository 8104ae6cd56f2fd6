
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Serialize, Deserialize};

use crate::AcqErr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constellation {
	Navstar,
	Qzss,
	E1b,
}

impl Constellation {

	pub fn code_period_ms(&self) -> usize {
		match self {
			Self::E1b => 4,
			_         => 1,
		}
	}

}

/// Seeds for the code generator of one satellite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeParams {
	/// IS-GPS-200 G2 phase-selector taps
	Taps{ t1:u8, t2:u8 },
	/// Explicit G2 register preload, one bit per stage with stage 1 in bit 0
	G2Init(u16),
	/// Memory code looked up by PRN
	E1bPrn,
}

#[derive(Debug)]
pub struct Satellite {
	pub constellation: Constellation,
	pub prn: u16,
	pub label: String,
	pub code: CodeParams,
	/// Index into the satellite table
	pub sat: usize,
	busy: AtomicBool,
}

impl Satellite {

	pub fn new(constellation:Constellation, prn:u16, code:CodeParams) -> Self {
		let label = match constellation {
			Constellation::Navstar => format!("N{:02}", prn),
			Constellation::Qzss    => format!("Q{}", prn),
			Constellation::E1b     => format!("E{:02}", prn),
		};
		Self { constellation, prn, label, code, sat: 0, busy: AtomicBool::new(false) }
	}

	pub fn is_busy(&self) -> bool { self.busy.load(Ordering::Acquire) }

	pub(crate) fn set_busy(&self, busy:bool) { self.busy.store(busy, Ordering::Release) }

}

// IS-GPS-200 Table 3-Ia code phase selection, PRN 1 through 32
const GPS_TAPS:[(u8, u8); 32] = [
	(2, 6), (3, 7), (4, 8), (5, 9), (1, 9), (2,10), (1, 8), (2, 9),
	(3,10), (2, 3), (3, 4), (5, 6), (6, 7), (7, 8), (8, 9), (9,10),
	(1, 4), (2, 5), (3, 6), (4, 7), (5, 8), (6, 9), (1, 3), (4, 6),
	(5, 7), (6, 8), (7, 9), (8,10), (1, 6), (2, 7), (3, 8), (4, 9),
];

// G2 register preloads for QZSS PRN 193 through 202 (G2 delays 339, 208, 711, 189, 263, 537, 663, 942, 173, 900)
const QZSS_G2_INIT:[(u16, u16); 10] = [
	(193, 0x228), (194, 0x387), (195, 0x3e7), (196, 0x2c5), (197, 0x160),
	(198, 0x2f3), (199, 0x1d7), (200, 0x067), (201, 0x286), (202, 0x225),
];

pub const E1B_PRNS:std::ops::RangeInclusive<u16> = 1..=36;

/// The satellite list.  Descriptors are fixed once the table is built; only the busy flags change,
/// set by the search task on acquisition and cleared by the tracking side on loss of signal.
#[derive(Debug)]
pub struct SatTable {
	sats: Vec<Satellite>,
}

impl SatTable {

	pub fn new(mut sats:Vec<Satellite>, max_sats:usize) -> Result<Self, AcqErr> {
		if sats.len() >= max_sats {
			return Err(AcqErr::TooManySatellites{ count: sats.len(), max: max_sats });
		}
		for (idx, sp) in sats.iter_mut().enumerate() {
			if sp.prn == 0 {
				return Err(AcqErr::InvalidParams(format!("{} satellite with PRN 0", sp.label)));
			}
			sp.sat = idx;
		}
		Ok(Self { sats })
	}

	/// GPS and QZSS always; Galileo only for the PRNs `has_e1b` accepts
	pub fn builtin<F: Fn(u16) -> bool>(max_sats:usize, has_e1b:F) -> Result<Self, AcqErr> {
		let mut sats:Vec<Satellite> = GPS_TAPS.iter().enumerate()
			.map(|(idx, (t1, t2))| Satellite::new(Constellation::Navstar, (idx+1) as u16, CodeParams::Taps{ t1: *t1, t2: *t2 }))
			.collect();
		sats.extend(QZSS_G2_INIT.iter().map(|(prn, init)| Satellite::new(Constellation::Qzss, *prn, CodeParams::G2Init(*init))));
		sats.extend(E1B_PRNS.filter(|prn| has_e1b(*prn)).map(|prn| Satellite::new(Constellation::E1b, prn, CodeParams::E1bPrn)));
		Self::new(sats, max_sats)
	}

	pub fn gps(prns:&[u16], max_sats:usize) -> Result<Self, AcqErr> {
		let sats = prns.iter()
			.map(|prn| match GPS_TAPS.get((*prn as usize).wrapping_sub(1)) {
				Some((t1, t2)) => Ok(Satellite::new(Constellation::Navstar, *prn, CodeParams::Taps{ t1: *t1, t2: *t2 })),
				None => Err(AcqErr::InvalidParams(format!("no GPS PRN {}", prn))),
			}).collect::<Result<Vec<_>, _>>()?;
		Self::new(sats, max_sats)
	}

	pub fn len(&self) -> usize { self.sats.len() }
	pub fn is_empty(&self) -> bool { self.sats.is_empty() }
	pub fn get(&self, sat:usize) -> Option<&Satellite> { self.sats.get(sat) }
	pub fn iter(&self) -> std::slice::Iter<Satellite> { self.sats.iter() }

	pub fn label(&self, sat:usize) -> &str { self.sats.get(sat).map(|sp| sp.label.as_str()).unwrap_or("---") }

}

impl std::ops::Index<usize> for SatTable {
	type Output = Satellite;
	fn index(&self, sat:usize) -> &Satellite { &self.sats[sat] }
}
