mod common;

use common::{Bench, both_sides, one_side};
use crossbeam::channel::unbounded;

use hypernav::hardware::{PressureSource, SimulatedBoard};
use hypernav::hypernav_shared::frame::pressure_flags;
use hypernav::hypernav_shared::{
    AcquisitionMode, CommandPacket, DataKind, ResponseStatus, Side, SpectrometerPhase,
};
use hypernav::math::PressureCoefficients;
use hypernav::profile::{ProfileBands, ProfileConfig, SimulatedAscent};
use hypernav::{AcquiredFrame, DaqConfig, SyslogCode};

/// Breakpoints at 100, 80, 60, 50, 40, 30, 20 dbar
fn profile_cfg(base: DaqConfig) -> DaqConfig {
    DaqConfig {
        pixel_count: 32,
        profile: ProfileConfig {
            bands: ProfileBands {
                lower_start: 100.0,
                lower_interval: 20.0,
                middle_start: 50.0,
                middle_interval: 10.0,
                upper_start: 20.0,
                capacity: 64,
            },
            surface_checks: 3,
            ..Default::default()
        },
        ..base
    }
}

fn ascent() -> PressureSource {
    PressureSource::simulated(SimulatedAscent::new(110.0, 5.0))
}

/// Tick until the session ends, with a bound
fn run_to_idle(bench: &mut Bench) -> usize {
    for n in 1..=5_000 {
        bench.engine.tick();
        if !bench.engine.is_active() {
            return n;
        }
    }
    panic!("Session did not end");
}

#[test]
fn profile_measures_at_breakpoints_and_offloads_newest_first() {
    let mut bench = Bench::new(profile_cfg(both_sides()), ascent());
    let (tx, rx) = unbounded::<AcquiredFrame>();
    bench.engine.set_offload(tx);

    bench.link.send(&CommandPacket::start_profiling(2)).unwrap();
    bench.engine.tick();
    assert_eq!(bench.link.try_response().unwrap().status, ResponseStatus::Ack);
    assert_eq!(bench.engine.mode(), AcquisitionMode::FloatProfile);
    run_to_idle(&mut bench);

    let notes: Vec<_> = bench.notes.try_iter().collect();
    let actions: Vec<&str> = notes
        .iter()
        .filter(|n| n.code == SyslogCode::ProfileAction)
        .map(|n| n.message.split(' ').next().unwrap_or(""))
        .collect();
    // Seven breakpoints, then every reading shallower than the last one
    // until three readings at the surface
    assert_eq!(actions.len(), 10);
    assert!(actions[..7].iter().all(|a| *a == "Single"));
    assert!(actions[7..].iter().all(|a| *a == "Continuous"));
    assert!(notes.iter().any(|n| n.code == SyslogCode::ProfileSurfaced));
    assert!(notes.iter().any(|n| n.code == SyslogCode::OffloadComplete));

    // Profile frames never reach the stream
    assert!(bench.frames.try_recv().is_err());

    let frames: Vec<AcquiredFrame> = rx.try_iter().collect();
    assert!(frames.len() >= 10 * 2 * 2);
    assert!(bench.engine.store().stack().is_empty());
    assert!(frames.iter().all(|f| f.header.kind == DataKind::LightMinusDark));
    assert!(
        frames
            .iter()
            .all(|f| f.header.pressure_flags & pressure_flags::SIMULATED != 0)
    );

    for side in Side::ALL {
        let numbers: Vec<u32> = frames
            .iter()
            .filter(|f| f.header.side == side)
            .map(|f| f.header.sample_number)
            .collect();
        assert!(numbers.windows(2).all(|w| w[0] > w[1]), "{numbers:?}");
        assert_eq!(numbers.last(), Some(&1));
    }

    // Newest first means shallowest first
    let pressures: Vec<f32> = frames.iter().map(|f| f.header.pressure_dbar).collect();
    assert!(pressures.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(pressures.last(), Some(&100.0));

    assert_eq!(bench.engine.mode(), AcquisitionMode::Idle);
    assert!(!bench.board.is_powered(Side::Port));
    assert!(!bench.board.is_powered(Side::Starboard));
}

#[test]
fn end_profiling_finishes_the_measurement_then_offloads() {
    let mut bench = Bench::new(profile_cfg(one_side()), ascent());
    let (tx, rx) = unbounded::<AcquiredFrame>();
    bench.engine.set_offload(tx);

    bench.link.send(&CommandPacket::start_profiling(3)).unwrap();
    // Reach the first breakpoint and start measuring
    while bench.engine.phase(Side::Port) == SpectrometerPhase::Idle {
        bench.engine.tick();
    }
    bench.link.try_response().unwrap();

    bench.link.send(&CommandPacket::end_profiling()).unwrap();
    let ticks = run_to_idle(&mut bench);
    assert_eq!(bench.link.try_response().unwrap().status, ResponseStatus::Ack);
    assert!(ticks < 100);

    let frames: Vec<AcquiredFrame> = rx.try_iter().collect();
    assert!(!frames.is_empty());
    assert!(frames.iter().all(|f| f.header.pressure_dbar == 100.0));
    let notes: Vec<_> = bench.notes.try_iter().collect();
    assert!(notes.iter().any(|n| n.code == SyslogCode::AcquisitionStopping));
    assert!(!notes.iter().any(|n| n.code == SyslogCode::ProfileSurfaced));
}

#[test]
fn frames_stay_in_flash_without_an_offload_destination() {
    let mut bench = Bench::new(profile_cfg(one_side()), ascent());
    bench.link.send(&CommandPacket::start_profiling(1)).unwrap();
    run_to_idle(&mut bench);

    assert!(bench.engine.store().frame_count() > 0);
    assert!(
        !bench
            .notes
            .try_iter()
            .any(|n| n.code == SyslogCode::OffloadComplete)
    );
}

#[test]
fn flash_write_failures_are_reported() {
    let mut bench = Bench::new(profile_cfg(one_side()), ascent());
    bench.link.send(&CommandPacket::start_profiling(1)).unwrap();
    bench.engine.tick();
    bench.flash.set_write_failure(true);
    run_to_idle(&mut bench);

    assert_eq!(bench.engine.store().frame_count(), 0);
    assert!(
        bench
            .notes
            .try_iter()
            .any(|n| n.code == SyslogCode::FlashWriteFailed)
    );
    // Every slot went back to the pool
    assert_eq!(
        bench.engine.pool().available(),
        bench.engine.pool().capacity()
    );
}

#[test]
fn profile_waits_for_a_first_pressure_reading() {
    let cfg = profile_cfg(one_side());
    let board = SimulatedBoard::new(cfg.pixel_count);
    board.set_pressure_failure(true);
    let sensor = PressureSource::sensor(board.pressure_sensor(), PressureCoefficients::default());
    let mut bench = Bench::with_board(cfg, board, sensor);

    bench.link.send(&CommandPacket::start_profiling(1)).unwrap();
    let delay = bench.engine.config().periods.delay();
    for _ in 0..20 {
        assert_eq!(bench.engine.tick(), delay);
    }
    assert!(bench.engine.is_active());
    assert_eq!(bench.engine.phase(Side::Port), SpectrometerPhase::Idle);

    let notes: Vec<_> = bench.notes.try_iter().collect();
    assert!(notes.iter().any(|n| n.code == SyslogCode::PressureReadFailed));
    assert!(!notes.iter().any(|n| n.code == SyslogCode::ProfileAction));
}

#[test]
fn stream_frames_keep_the_last_pressure_when_the_sensor_fails() {
    let cfg = one_side();
    let board = SimulatedBoard::new(cfg.pixel_count);
    let sensor = PressureSource::sensor(board.pressure_sensor(), PressureCoefficients::default());
    let mut bench = Bench::with_board(cfg, board, sensor);
    bench
        .link
        .send(&CommandPacket::start(AcquisitionMode::StreamLmd, Some(20), 1))
        .unwrap();

    // One frame every 7 ticks, the first on tick 7
    let mut frames = Vec::new();
    bench.run(10, &mut frames);
    assert_eq!(frames.len(), 1);
    let good = frames[0].header;
    assert!(good.pressure_dbar.is_finite());
    assert_ne!(good.pressure_flags & pressure_flags::SENSOR_RUNNING, 0);
    assert_eq!(good.pressure_flags & pressure_flags::STALE, 0);

    bench.board.set_pressure_failure(true);
    bench.run(10, &mut frames);
    assert_eq!(frames.len(), 2);
    let stale = frames[1].header;
    assert_eq!(stale.pressure_dbar, good.pressure_dbar);
    assert_ne!(stale.pressure_flags & pressure_flags::STALE, 0);
    assert!(bench.engine.is_active());
    assert!(
        bench
            .notes
            .try_iter()
            .any(|n| n.code == SyslogCode::PressureReadFailed)
    );
}
