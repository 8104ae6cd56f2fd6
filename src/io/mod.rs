
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::AcqErr;

/// The front end's sample capture port.  `trigger_capture` latches a new burst of 1-bit samples
/// (and resets the code generators in the correlator hardware); `read_packet` returns the next
/// chunk of that burst.  Fewer bytes than requested means the source is exhausted or faulted.
pub trait SampleTransport {
	fn trigger_capture(&mut self) -> Result<(), AcqErr>;
	fn read_packet(&mut self, buf:&mut [u8]) -> Result<usize, AcqErr>;
}

impl<T: SampleTransport + ?Sized> SampleTransport for Box<T> {
	fn trigger_capture(&mut self) -> Result<(), AcqErr> { (**self).trigger_capture() }
	fn read_packet(&mut self, buf:&mut [u8]) -> Result<usize, AcqErr> { (**self).read_packet(buf) }
}

/// Plays back a recording of packed 1-bit samples, one capture after another
pub struct FileTransport<S: Read> {
	src: S,
	captures: usize,
}

impl FileTransport<BufReader<File>> {

	pub fn open<P: AsRef<Path>>(path:P) -> Result<Self, AcqErr> {
		Ok(Self::new(BufReader::new(File::open(path)?)))
	}

}

impl<S: Read> FileTransport<S> {

	pub fn new(src:S) -> Self { Self { src, captures: 0 } }

	pub fn captures(&self) -> usize { self.captures }

}

impl<S: Read> SampleTransport for FileTransport<S> {

	fn trigger_capture(&mut self) -> Result<(), AcqErr> {
		self.captures += 1;
		Ok(())
	}

	fn read_packet(&mut self, buf:&mut [u8]) -> Result<usize, AcqErr> {
		// A single read may legitimately come back short, so keep going until EOF
		let mut total = 0;
		while total < buf.len() {
			let n = self.src.read(&mut buf[total..])?;
			if n == 0 { break; }
			total += n;
		}
		Ok(total)
	}

}

/// Replays the same capture on every trigger
#[derive(Debug, Clone)]
pub struct MemoryTransport {
	data: Vec<u8>,
	pos: usize,
	captures: usize,
}

impl MemoryTransport {

	pub fn new(data:Vec<u8>) -> Self { Self { data, pos: 0, captures: 0 } }

	pub fn captures(&self) -> usize { self.captures }

	/// Packs bits LSB first, the order the capture path unpacks them in
	pub fn from_bits(bits:&[u8]) -> Self {
		let data = bits.chunks(8)
			.map(|chunk| chunk.iter().enumerate().fold(0u8, |acc, (k, b)| acc | ((b & 1) << k)))
			.collect();
		Self::new(data)
	}

}

impl SampleTransport for MemoryTransport {

	fn trigger_capture(&mut self) -> Result<(), AcqErr> {
		self.pos = 0;
		self.captures += 1;
		Ok(())
	}

	fn read_packet(&mut self, buf:&mut [u8]) -> Result<usize, AcqErr> {
		let n = usize::min(buf.len(), self.data.len() - self.pos);
		buf[..n].copy_from_slice(&self.data[self.pos..self.pos+n]);
		self.pos += n;
		Ok(n)
	}

}
