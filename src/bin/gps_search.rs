
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Arg, ArgAction, Command};
use colored::*;
use log::{info, warn, LevelFilter};

use gnss_acq::AcqErr;
use gnss_acq::config::AcqConfig;
use gnss_acq::coop::TaskGate;
use gnss_acq::gnss::channel::ChannelBank;
use gnss_acq::gnss::codes::E1bCodeBook;
use gnss_acq::gnss::satellite::SatTable;
use gnss_acq::gnss::search::{ReceiverState, SearchControl, SearchTask};
use gnss_acq::io::FileTransport;
use gnss_acq::status::{JsonLinesSink, LogSink, StatusSink};

const CONTROL_TICK_MS:u64 = 1000;

fn log_setup(verbose:u8) {
	if std::env::var_os("RUST_LOG").is_none() {
		let log_filter = match verbose {
			0 => LevelFilter::Warn,
			1 => LevelFilter::Info,
			2 => LevelFilter::Debug,
			_ => LevelFilter::Trace,
		};

		pretty_env_logger::formatted_builder()
			.filter_module("gnss_acq", log_filter)
			.filter_module("gps_search", log_filter)
			.init();
	} else {
		pretty_env_logger::init();
	}
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {

	let matches = Command::new("GPS Search")
		.version("0.1.0")
		.about("Plays a recording of 1-bit IF samples through the acquisition search and reports the satellites handed to tracking")
		.arg(Arg::new("samples")
			.short('f').long("samples")
			.help("Recording of packed 1-bit samples, first sample in the LSB")
			.required(true))
		.arg(Arg::new("config")
			.short('c').long("config")
			.help("JSON acquisition configuration"))
		.arg(Arg::new("e1b_codes")
			.long("e1b-codes")
			.help("JSON object mapping Galileo E1B PRN to its ICD hex code"))
		.arg(Arg::new("gsig")
			.long("gsig")
			.value_parser(clap::value_parser!(f32))
			.help("Minimum SNR for a detection"))
		.arg(Arg::new("test_mode")
			.long("test-mode")
			.action(ArgAction::SetTrue)
			.help("Report every search result"))
		.arg(Arg::new("startup_delay_ms")
			.long("startup-delay-ms")
			.value_parser(clap::value_parser!(u64))
			.help("Wait before the first search"))
		.arg(Arg::new("json_events")
			.long("json-events")
			.action(ArgAction::SetTrue)
			.help("Write status events to stdout as JSON lines"))
		.arg(Arg::new("verbose")
			.short('v')
			.action(ArgAction::Count))
		.get_matches();

	let mut cfg = match matches.get_one::<String>("config") {
		Some(path) => AcqConfig::from_json_file(path).with_context(|| format!("Unable to load --config \"{}\"", path))?,
		None => AcqConfig::default(),
	};
	if let Some(gsig) = matches.get_one::<f32>("gsig") { cfg.min_sig = *gsig; }
	if matches.get_flag("test_mode") { cfg.test_mode = true; }
	if let Some(ms) = matches.get_one::<u64>("startup_delay_ms") { cfg.startup_delay_ms = *ms; }

	log_setup(matches.get_count("verbose").max(cfg.test_mode as u8));

	let e1b = match matches.get_one::<String>("e1b_codes") {
		Some(path) => E1bCodeBook::from_json_file(path).with_context(|| format!("Unable to load --e1b-codes \"{}\"", path))?,
		None => E1bCodeBook::new(),
	};
	if e1b.is_empty() {
		warn!("no --e1b-codes given, Galileo E1B satellites will not be searched");
	}
	let sats = Arc::new(SatTable::builtin(cfg.params.max_sats, |prn| e1b.contains(prn))?);

	let fname = matches.get_one::<String>("samples").context("--samples is required")?;
	let transport = FileTransport::open(fname).with_context(|| format!("Unable to open --samples \"{}\"", fname))?;
	eprintln!("Searching {} for {} satellites, min SNR {}", fname, sats.len(), cfg.min_sig);

	let bank = ChannelBank::new(cfg.channel_groups, cfg.channels_per_group);
	let starts = bank.starts();
	let status:Box<dyn StatusSink> = if matches.get_flag("json_events") {
		Box::new(JsonLinesSink::new(std::io::stdout()))
	} else {
		Box::new(LogSink)
	};

	let gate = TaskGate::new();
	let (mut task, _handle) = SearchTask::new(cfg.clone(), sats.clone(), &e1b, transport, bank, status, gate.clone())
		.map_err(|e| {
			let fatal = e.is_fatal_config();
			let err = anyhow::Error::new(e);
			if fatal { err.context("inconsistent acquisition configuration") } else { err.context("unable to start search") }
		})?;

	// Nobody is listening and nothing is corrected from a recording, so only the enable
	// flag and the config override have any say
	let mut control = SearchControl::new();
	control.register(gate.clone());
	let monitor = async {
		let mut control_sink = LogSink;
		loop {
			let state = ReceiverState {
				good_sats: sats.iter().filter(|sp| sp.is_busy()).count(),
				always_acquire: cfg.always_acquire,
				enabled: cfg.enable,
				..ReceiverState::default()
			};
			if !control.should_run(&state, &mut control_sink) { return; }
			tokio::time::sleep(Duration::from_millis(CONTROL_TICK_MS)).await;
		}
	};

	let outcome = tokio::select! {
		res = task.run() => res,
		_ = monitor => {
			info!("acquisition disabled");
			Ok(())
		},
	};

	match outcome {
		Ok(()) => {},
		Err(AcqErr::ShortRead{ got, wanted }) => info!("end of recording ({} of {} bytes in the last packet)", got, wanted),
		Err(e) => return Err(e).context("search failed"),
	}

	let starts = starts.lock().map_err(|_| anyhow!("channel start log poisoned"))?;
	if cfg.test_mode {
		for s in starts.iter() {
			eprintln!("{}", format!("ch{:02} {} Doppler {:>6} [Hz] code phase {:>5} SNR {:.1}",
				s.ch+1, s.label, s.doppler_hz, s.code_phase, s.snr).green());
		}
		if starts.is_empty() { eprintln!("{}", "No satellites acquired".red()); }
	}
	println!("{}", serde_json::to_string_pretty(&*starts)?);

	Ok(())
}
