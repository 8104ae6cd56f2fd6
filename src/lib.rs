
use thiserror::Error;

pub mod config;
pub mod coop;
pub mod filters;
pub mod fourier_analysis;
pub mod io;
pub mod gnss;
pub mod status;

pub mod utils;

#[derive(Debug, Error)]
pub enum AcqErr {
	#[error("invalid search parameters: {0}")]
	InvalidParams(String),
	#[error("satellite table holds {count} entries but capacity is {max}")]
	TooManySatellites{ count:usize, max:usize },
	#[error("decimation produced {got} samples, expected FFT length {expected}")]
	DecimationMismatch{ got:usize, expected:usize },
	#[error("no E1B code loaded for PRN {0}")]
	MissingCode(u16),
	#[error("invalid E1B code: {0}")]
	InvalidCode(String),
	#[error("sample transport returned {got} of {wanted} bytes")]
	ShortRead{ got:usize, wanted:usize },
	#[error("sample transport failure")]
	Io(#[from] std::io::Error),
	#[error("unable to parse configuration")]
	Config(#[from] serde_json::Error),
}

impl AcqErr {

	/// Errors that indicate inconsistent constants or tables rather than a runtime condition
	pub fn is_fatal_config(&self) -> bool {
		matches!(self, Self::InvalidParams(_) | Self::TooManySatellites{..} | Self::DecimationMismatch{..} |
			Self::MissingCode(_) | Self::InvalidCode(_) | Self::Config(_))
	}

}
