
use std::collections::VecDeque;
use std::time::Duration;

use super::*;
use crate::coop::TaskControl;
use crate::gnss::acquisition::synth;
use crate::gnss::channel::ChannelBank;
use crate::gnss::codes::CaCode;
use crate::io::MemoryTransport;

/// Hands out channels from a script and records what the search did with them
#[derive(Default)]
struct Scripted {
	offers: VecDeque<Option<usize>>,
	released: Vec<usize>,
	started: Vec<ChannelStart>,
}

impl Scripted {
	fn offering(offers:&[Option<usize>]) -> Self { Self { offers: offers.iter().copied().collect(), ..Self::default() } }
}

impl TrackingChannels for Scripted {
	fn allocate_channel(&mut self, _sat:usize) -> Option<usize> { self.offers.pop_front().flatten() }
	fn release_channel(&mut self, ch:usize) { self.released.push(ch) }
	fn start_channel(&mut self, start:ChannelStart) { self.started.push(start) }
}

// A higher threshold than the default keeps noise-only searches well clear of it
fn config() -> AcqConfig {
	AcqConfig{ min_sig: 25.0, startup_delay_ms: 0, constellations: vec![Constellation::Navstar], ..AcqConfig::default() }
}

fn gps(prns:&[u16]) -> Arc<SatTable> {
	Arc::new(SatTable::gps(prns, config().params.max_sats).unwrap())
}

/// PRN 3 at 1 kHz with the code 400 working-rate samples late
fn prn3_capture() -> MemoryTransport {
	let params = config().params;
	MemoryTransport::from_bits(&synth::if_bits(&params, CaCode::gps(4, 8), 400 * params.decim, 1000.0, 1.0, 3))
}

fn noise_capture() -> MemoryTransport {
	MemoryTransport::from_bits(&synth::noise_bits(&config().params, 17))
}

fn search_task<T: SampleTransport, C: TrackingChannels>(cfg:AcqConfig, sats:Arc<SatTable>, transport:T, tracking:C) -> (SearchTask<T, C, Vec<StatusEvent>>, SearchHandle) {
	SearchTask::new(cfg, sats, &E1bCodeBook::new(), transport, tracking, vec![], TaskGate::new()).unwrap()
}

#[tokio::test]
async fn acquires_and_hands_off() {
	let sats = gps(&[1, 3, 5]);
	let bank = ChannelBank::new(1, 12);
	let (mut task, _handle) = search_task(config(), sats.clone(), prn3_capture(), bank);

	assert!(matches!(task.step().await.unwrap(), StepOutcome::BelowThreshold{ ch: 0, sat: 0, .. }));
	let start = match task.step().await.unwrap() {
		StepOutcome::Acquired(start) => start,
		other => panic!("expected acquisition, got {:?}", other),
	};
	assert_eq!(start.ch, 0);
	assert_eq!(start.sat, 1);
	assert_eq!(start.label, "N03");
	assert_eq!(start.generator_init, (4 << 4) + 8);
	assert_eq!(start.doppler_hz, 1000);
	let expected = (2046 - 400) * 8;
	assert!((start.code_phase as i64 - expected as i64).abs() <= 8, "code phase {}", start.code_phase);
	assert!(sats[1].is_busy());

	// The started channel is no longer free
	assert!(matches!(task.step().await.unwrap(), StepOutcome::BelowThreshold{ ch: 1, sat: 2, .. }));
	assert_eq!(task.tracking().tracking(), 1);
	assert_eq!(task.tracking().starts().lock().unwrap().len(), 1);

	// Second pass leaves the tracked satellite alone
	assert!(matches!(task.step().await.unwrap(), StepOutcome::BelowThreshold{ sat: 0, .. }));
	assert_eq!(task.step().await.unwrap(), StepOutcome::Busy(1));

	let events = task.status();
	assert!(events.contains(&StatusEvent::Doppler{ ch: 0, doppler_hz: 1000, code_phase: start.code_phase }));
	let reports = events.iter().filter(|ev| matches!(ev, StatusEvent::Satellite{..})).count();
	assert_eq!(reports, 4);
	assert!(events.iter().any(|ev| matches!(ev, StatusEvent::Satellite{ sat, below_threshold: false, .. } if sat == "N03")));
}

#[tokio::test]
async fn restart_preempts_then_resumes() {
	let sats = gps(&[1, 2, 3, 4]);
	for sp in sats.iter() { sp.set_busy(true); }
	let (mut task, handle) = search_task(config(), sats.clone(), prn3_capture(), Scripted::offering(&[Some(6)]));

	assert_eq!(task.step().await.unwrap(), StepOutcome::Busy(0));
	handle.signal_lost(6, 2, true);
	assert!(!sats[2].is_busy());

	match task.step().await.unwrap() {
		StepOutcome::Acquired(start) => assert_eq!((start.ch, start.sat), (6, 2)),
		other => panic!("expected restart acquisition, got {:?}", other),
	}
	assert_eq!(task.step().await.unwrap(), StepOutcome::Busy(1));
	assert_eq!(task.step().await.unwrap(), StepOutcome::Busy(2));
	assert_eq!(task.step().await.unwrap(), StepOutcome::Busy(3));
	assert_eq!(task.step().await.unwrap(), StepOutcome::Busy(0));
	assert_eq!(task.tracking().started.len(), 1);
}

#[tokio::test]
async fn signal_lost_without_restart_waits_its_turn() {
	let sats = gps(&[1, 2]);
	for sp in sats.iter() { sp.set_busy(true); }
	let (mut task, handle) = search_task(config(), sats.clone(), noise_capture(), Scripted::offering(&[Some(0)]));

	handle.signal_lost(0, 1, false);
	assert_eq!(task.step().await.unwrap(), StepOutcome::Busy(0));
	assert!(matches!(task.step().await.unwrap(), StepOutcome::BelowThreshold{ ch: 0, sat: 1, .. }));
	assert_eq!(task.tracking().released, vec![0]);
}

#[tokio::test(start_paused = true)]
async fn idle_pass_backs_off() {
	let sats = gps(&[1, 2]);
	for sp in sats.iter() { sp.set_busy(true); }
	let (mut task, _handle) = search_task(config(), sats, noise_capture(), Scripted::default());

	let start = tokio::time::Instant::now();
	task.step().await.unwrap();
	task.step().await.unwrap();
	assert!(start.elapsed() < Duration::from_millis(1000));

	assert_eq!(task.step().await.unwrap(), StepOutcome::Busy(0));
	assert!(start.elapsed() >= Duration::from_millis(1000));
}

#[tokio::test]
async fn disabled_constellations_are_skipped() {
	let cfg = AcqConfig{ constellations: vec![Constellation::Qzss], ..config() };
	let (mut task, _handle) = search_task(cfg, gps(&[1, 2]), noise_capture(), Scripted::default());
	assert_eq!(task.step().await.unwrap(), StepOutcome::Disabled(0));
	assert_eq!(task.step().await.unwrap(), StepOutcome::Disabled(1));
}

#[tokio::test(start_paused = true)]
async fn busy_channels_back_off_with_one_group() {
	let (mut task, _handle) = search_task(config(), gps(&[1]), noise_capture(), Scripted::offering(&[None, None, Some(2)]));

	let start = tokio::time::Instant::now();
	assert!(matches!(task.step().await.unwrap(), StepOutcome::BelowThreshold{ ch: 2, sat: 0, .. }));
	assert!(start.elapsed() >= Duration::from_millis(2000));
}

#[tokio::test]
async fn busy_channels_skip_with_several_groups() {
	let cfg = AcqConfig{ channel_groups: 2, ..config() };
	let (mut task, _handle) = search_task(cfg, gps(&[1, 2]), noise_capture(), Scripted::offering(&[None, Some(4)]));
	assert_eq!(task.step().await.unwrap(), StepOutcome::NoChannel(0));
	assert!(matches!(task.step().await.unwrap(), StepOutcome::BelowThreshold{ ch: 4, sat: 1, .. }));
}

#[tokio::test]
async fn failed_search_on_old_channel_is_cleared() {
	let (mut task, _handle) = search_task(config(), gps(&[1, 2]), noise_capture(), Scripted::offering(&[Some(3), Some(5)]));
	task.step().await.unwrap();
	task.step().await.unwrap();

	let events:Vec<&StatusEvent> = task.status().iter()
		.filter(|ev| !matches!(ev, StatusEvent::Acquiring{..}))
		.collect();
	assert!(matches!(events[0], StatusEvent::Satellite{ ch: 3, below_threshold: true, .. }));
	assert_eq!(events[1], &StatusEvent::ClearChannel{ ch: 3 });
	assert!(matches!(events[2], StatusEvent::Satellite{ ch: 5, below_threshold: true, .. }));
	assert_eq!(task.tracking().released, vec![3, 5]);
}

#[tokio::test]
async fn short_capture_terminates_by_default() {
	let transport = MemoryTransport::new(vec![0u8; 2048]);
	let (mut task, _handle) = search_task(config(), gps(&[1]), transport, Scripted::offering(&[Some(1)]));
	assert!(matches!(task.step().await, Err(AcqErr::ShortRead{ got: 0, wanted: 512 })));
	assert_eq!(task.tracking().released, vec![1]);
}

#[tokio::test(start_paused = true)]
async fn short_capture_retries_when_asked() {
	let cfg = AcqConfig{ capture_fault: CaptureFaultPolicy::Retry, ..config() };
	let transport = MemoryTransport::new(vec![0u8; 2048]);
	let (mut task, _handle) = search_task(cfg, gps(&[1]), transport, Scripted::offering(&[Some(1)]));

	let start = tokio::time::Instant::now();
	assert_eq!(task.step().await.unwrap(), StepOutcome::CaptureFault);
	assert!(start.elapsed() >= Duration::from_millis(1000));
	assert_eq!(task.status(), &vec![StatusEvent::Acquiring{ active: false }, StatusEvent::Acquiring{ active: true }]);
	assert_eq!(task.tracking().released, vec![1]);
}

#[tokio::test(start_paused = true)]
async fn retry_leaves_resume_to_the_controller() {
	let cfg = AcqConfig{ capture_fault: CaptureFaultPolicy::Retry, ..config() };
	let transport = MemoryTransport::new(vec![0u8; 2048]);
	let (mut task, _handle) = search_task(cfg, gps(&[1]), transport, Scripted::offering(&[Some(1)]));

	let mut control = SearchControl::new();
	control.register(task.gate().clone());
	let mut events:Vec<StatusEvent> = vec![];
	let loaded = ReceiverState{ clock_corrections: 1, active_users: 2, good_sats: 9, enabled: true, ..ReceiverState::default() };
	let idle = ReceiverState{ active_users: 0, ..loaded.clone() };

	let (outcome, _) = tokio::join!(task.step(), async {
		tokio::time::sleep(Duration::from_millis(500)).await;
		control.should_run(&loaded, &mut events);
		tokio::time::sleep(Duration::from_millis(5000)).await;
		control.should_run(&idle, &mut events);
	});

	assert_eq!(outcome.unwrap(), StepOutcome::CaptureFault);
	assert_eq!(task.status(), &vec![StatusEvent::Acquiring{ active: false }]);
	assert_eq!(events, vec![StatusEvent::Acquiring{ active: false }, StatusEvent::Acquiring{ active: true }]);
}

#[tokio::test(start_paused = true)]
async fn run_waits_out_startup_delay() {
	let cfg = AcqConfig{ startup_delay_ms: 20_000, ..config() };
	let sats = gps(&[1]);
	sats[0].set_busy(true);
	let (mut task, _handle) = search_task(cfg, sats, noise_capture(), Scripted::default());

	assert!(tokio::time::timeout(Duration::from_secs(19), task.run()).await.is_err());
	assert!(task.status().is_empty());

	assert!(tokio::time::timeout(Duration::from_secs(25), task.run()).await.is_err());
	assert_eq!(task.status()[..2], [
		StatusEvent::SearchParams{ decim: 8, fft_len: 8184, min_sig: 25.0 },
		StatusEvent::Acquiring{ active: true },
	]);
}

#[tokio::test(start_paused = true)]
async fn suspended_task_stops_at_next_yield() {
	let sats = gps(&[1]);
	sats[0].set_busy(true);
	let (mut task, _handle) = search_task(config(), sats, noise_capture(), Scripted::default());

	let mut control = SearchControl::new();
	control.register(task.gate().clone());
	let mut events:Vec<StatusEvent> = vec![];
	let loaded = ReceiverState{ clock_corrections: 1, active_users: 2, good_sats: 9, enabled: true, ..ReceiverState::default() };

	assert!(control.should_run(&loaded, &mut events));
	assert!(task.gate().is_asleep());
	assert!(tokio::time::timeout(Duration::from_secs(60), task.step()).await.is_err());

	let idle = ReceiverState{ active_users: 0, ..loaded };
	control.should_run(&idle, &mut events);
	assert!(!task.gate().is_asleep());
	assert_eq!(task.step().await.unwrap(), StepOutcome::Busy(0));
	assert_eq!(events, vec![StatusEvent::Acquiring{ active: false }, StatusEvent::Acquiring{ active: true }]);

	// Explicit wake without the controller
	task.gate().sleep();
	task.gate().wake();
	assert_eq!(task.step().await.unwrap(), StepOutcome::Busy(0));
}

#[test]
fn oversized_table_rejected() {
	let cfg = AcqConfig{ params: crate::config::SearchParams{ max_sats: 2, ..config().params }, ..config() };
	let sats = Arc::new(SatTable::gps(&[1, 2], 96).unwrap());
	let res = SearchTask::new(cfg, sats, &E1bCodeBook::new(), noise_capture(), Scripted::default(), Vec::<StatusEvent>::new(), TaskGate::new());
	assert!(matches!(res, Err(AcqErr::TooManySatellites{ count: 2, max: 2 })));
}
