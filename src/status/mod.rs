
use std::io::Write;

use log::{debug, info, warn};
use serde::Serialize;

/// One-way reports out of the search task
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum StatusEvent {
	SearchParams{ decim:usize, fft_len:usize, min_sig:f32 },
	Acquiring{ active:bool },
	Satellite{ ch:usize, sat:String, snr:f32, below_threshold:bool, elapsed_us:u64 },
	ClearChannel{ ch:usize },
	Doppler{ ch:usize, doppler_hz:i32, code_phase:usize },
}

pub trait StatusSink {
	fn emit(&mut self, ev:StatusEvent);
}

impl StatusSink for Vec<StatusEvent> {
	fn emit(&mut self, ev:StatusEvent) { self.push(ev) }
}

impl<T: StatusSink + ?Sized> StatusSink for Box<T> {
	fn emit(&mut self, ev:StatusEvent) { (**self).emit(ev) }
}

/// Writes events to the log
#[derive(Debug, Default)]
pub struct LogSink;

impl StatusSink for LogSink {
	fn emit(&mut self, ev:StatusEvent) {
		match ev {
			StatusEvent::Satellite{ below_threshold: true, .. } | StatusEvent::ClearChannel{..} => debug!("{:?}", ev),
			_ => info!("{:?}", ev),
		}
	}
}

/// Writes one JSON object per line
pub struct JsonLinesSink<W: Write> {
	out: W,
}

impl<W: Write> JsonLinesSink<W> {

	pub fn new(out:W) -> Self { Self { out } }

	pub fn into_inner(self) -> W { self.out }

}

impl<W: Write> StatusSink for JsonLinesSink<W> {
	fn emit(&mut self, ev:StatusEvent) {
		// Reporting never holds up the search
		let res = serde_json::to_writer(&mut self.out, &ev)
			.map_err(std::io::Error::from)
			.and_then(|_| writeln!(self.out));
		if let Err(e) = res { warn!("dropping status event: {}", e); }
	}
}
