mod common;

use common::{Bench, both_sides, one_side};

use hypernav::acquisition::is_allowed;
use hypernav::hardware::{BoardEvent, PressureSource};
use hypernav::hypernav_shared::frame::quality;
use hypernav::hypernav_shared::{
    AcquisitionMode, BoardAddress, CommandPacket, DataKind, ResponseStatus, Side,
    SpectrometerPhase,
};
use hypernav::{DaqConfig, SyslogCode};

fn shutter_closes(bench: &Bench, side: Side) -> usize {
    bench
        .board
        .events()
        .iter()
        .filter(|e| **e == BoardEvent::ShutterClose(side))
        .count()
}

#[test]
fn stream_lmd_pairs_five_lights_with_each_dark() {
    let mut bench = Bench::new(one_side(), PressureSource::none());
    bench
        .link
        .send(&CommandPacket::start(AcquisitionMode::StreamLmd, Some(100), 5))
        .unwrap();

    // The first tick takes the command and closes the shutter. After that a
    // frame arrives on tick 7 and every 3 ticks per light.
    let mut frames = Vec::new();
    bench.run(1, &mut frames);
    let mut last = bench.engine.phase(Side::Port);
    assert_eq!(last, SpectrometerPhase::StartDark);
    for _ in 1..38 {
        bench.run(1, &mut frames);
        let now = bench.engine.phase(Side::Port);
        assert!(is_allowed(last, now), "{last:?} -> {now:?}");
        last = now;
    }
    assert_eq!(bench.link.try_response().unwrap().status, ResponseStatus::Ack);

    assert_eq!(frames.len(), 10);
    for (n, f) in frames.iter().enumerate() {
        let h = &f.header;
        assert_eq!(h.kind, DataKind::LightMinusDark);
        assert_eq!(h.side, Side::Port);
        assert_eq!(h.integration_ms, 100);
        assert_eq!(h.sample_number as usize, n + 1);
        assert_eq!(h.dark_sample_number as usize, n / 5 + 1);
        assert_eq!(f.pixels.len(), 64);
        assert!(!h.has_quality(quality::FIFO_OVERRUN));
    }
    // Only one dark per five lights
    assert_eq!(shutter_closes(&bench, Side::Port), 2);
    assert!(bench.board.events().iter().all(|e| match e {
        BoardEvent::CaptureStart { integration_ms, .. } => *integration_ms == 100,
        _ => true,
    }));
}

#[test]
fn stream_land_d_sends_darks_and_lights() {
    let mut bench = Bench::new(one_side(), PressureSource::none());
    bench
        .link
        .send(&CommandPacket::start(AcquisitionMode::StreamLandD, Some(40), 2))
        .unwrap();

    let mut frames = Vec::new();
    bench.run(30, &mut frames);
    let kinds: Vec<DataKind> = frames.iter().map(|f| f.header.kind).collect();
    assert_eq!(
        kinds[..6],
        [
            DataKind::Dark,
            DataKind::Light,
            DataKind::Light,
            DataKind::Dark,
            DataKind::Light,
            DataKind::Light
        ]
    );
    // Dark frames carry the raw dark row
    assert!(frames[0].pixels.iter().all(|&p| (1_500..1_507).contains(&p)));
    assert_eq!(frames[0].header.up_shift, 0);
}

#[test]
fn both_sides_sample_independently() {
    let mut bench = Bench::new(both_sides(), PressureSource::none());
    bench
        .link
        .send(&CommandPacket::start(AcquisitionMode::StreamLmd, Some(20), 3))
        .unwrap();

    let mut frames = Vec::new();
    bench.run(20, &mut frames);
    let port = frames.iter().filter(|f| f.header.side == Side::Port).count();
    let stbd = frames.iter().filter(|f| f.header.side == Side::Starboard).count();
    assert!(port > 0);
    assert_eq!(port, stbd);
}

#[test]
fn sampling_start_failure_stops_the_session() {
    let mut bench = Bench::new(both_sides(), PressureSource::none());
    bench.board.set_capture_failure(Side::Port, true);
    bench
        .link
        .send(&CommandPacket::start(AcquisitionMode::StreamLmd, None, 5))
        .unwrap();

    let mut frames = Vec::new();
    bench.run(20, &mut frames);

    assert!(!bench.engine.is_active());
    assert_eq!(bench.engine.mode(), AcquisitionMode::Idle);
    assert_eq!(bench.engine.phase(Side::Port), SpectrometerPhase::Idle);
    assert_eq!(bench.engine.phase(Side::Starboard), SpectrometerPhase::Idle);
    assert!(!bench.board.is_powered(Side::Port));
    assert!(!bench.board.is_powered(Side::Starboard));

    // The healthy side finished its light before stopping
    assert!(frames.iter().all(|f| f.header.side == Side::Starboard));
    assert_eq!(frames.len(), 1);

    let notes: Vec<_> = bench.notes.try_iter().collect();
    let failed = notes
        .iter()
        .find(|n| n.code == SyslogCode::SamplingStartFailed)
        .unwrap();
    assert_eq!(failed.side, Some(Side::Port));
    assert!(notes.iter().any(|n| n.code == SyslogCode::AcquisitionStopped));
}

#[test]
fn stray_pixels_past_the_drain_limit_flag_an_overrun() {
    let mut bench = Bench::new(one_side(), PressureSource::none());
    bench.board.set_stray_pixels(Side::Port, 150);
    bench
        .link
        .send(&CommandPacket::start(AcquisitionMode::StreamLmd, Some(20), 1))
        .unwrap();

    let mut frames = Vec::new();
    bench.run(10, &mut frames);
    assert!(!frames.is_empty());
    for f in &frames {
        assert!(f.header.has_quality(quality::FIFO_OVERRUN));
        assert_eq!(f.header.fifo_over, 99);
    }
    assert!(
        bench
            .notes
            .try_iter()
            .any(|n| n.code == SyslogCode::FifoOverrun)
    );
}

#[test]
fn a_few_stray_pixels_are_skipped() {
    let mut bench = Bench::new(one_side(), PressureSource::none());
    bench.board.set_stray_pixels(Side::Port, 12);
    bench
        .link
        .send(&CommandPacket::start(AcquisitionMode::StreamLandD, Some(20), 1))
        .unwrap();

    let mut frames = Vec::new();
    bench.run(5, &mut frames);
    let dark = &frames[0];
    assert_eq!(dark.header.kind, DataKind::Dark);
    assert_eq!(dark.header.fifo_over, 12);
    assert!(!dark.header.has_quality(quality::FIFO_OVERRUN));
    assert!(dark.pixels.iter().all(|&p| p != u16::MAX && p >= 1_500));
}

#[test]
fn dark_characterization_climbs_the_ladder_with_the_shutter_closed() {
    let mut bench = Bench::new(one_side(), PressureSource::none());
    bench
        .link
        .send(&CommandPacket::start(AcquisitionMode::DarkCharacterize, None, 1))
        .unwrap();

    let mut frames = Vec::new();
    bench.run(60, &mut frames);

    let times: Vec<u16> = frames.iter().map(|f| f.header.integration_ms).collect();
    assert_eq!(times, hypernav::acquisition::INTEGRATION_LADDER_MS);
    assert!(frames.iter().all(|f| f.header.kind == DataKind::Dark));
    assert!(
        !bench
            .board
            .events()
            .iter()
            .any(|e| matches!(e, BoardEvent::ShutterOpen(_)))
    );
    assert!(!bench.engine.is_active());
}

#[test]
fn dark_characterization_without_shutters_skips_the_shutter() {
    let cfg = DaqConfig {
        shutters_fitted: false,
        ..one_side()
    };
    let mut bench = Bench::new(cfg, PressureSource::none());
    bench
        .link
        .send(&CommandPacket::start(AcquisitionMode::DarkCharacterize, Some(11), 2))
        .unwrap();

    let mut frames = Vec::new();
    bench.run(12, &mut frames);
    assert!(!frames.is_empty());
    assert_eq!(shutter_closes(&bench, Side::Port), 0);
    // A commanded time holds for the whole run
    assert!(frames.iter().all(|f| f.header.integration_ms == 11));
    assert!(bench.engine.is_active());
}

#[test]
fn misaddressed_packets_are_refused() {
    let mut bench = Bench::new(one_side(), PressureSource::none());
    let cmd = CommandPacket {
        destination: BoardAddress::Controller,
        ..CommandPacket::start(AcquisitionMode::StreamLmd, None, 0)
    };
    bench.link.send(&cmd).unwrap();
    bench.engine.tick();

    let resp = bench.link.try_response().unwrap();
    assert_eq!(resp.status, ResponseStatus::NakMisaddressed);
    assert!(!bench.engine.is_active());
    assert!(
        bench
            .notes
            .try_iter()
            .any(|n| n.code == SyslogCode::MisaddressedPacket)
    );
}

#[test]
fn unknown_commands_are_refused() {
    let mut bench = Bench::new(one_side(), PressureSource::none());
    bench.link.send_bytes([2, 0x42, 0, 0, 0, 0, 0]).unwrap();
    bench.engine.tick();
    assert_eq!(bench.link.try_response().unwrap().status, ResponseStatus::Nak);
    assert!(
        bench
            .notes
            .try_iter()
            .any(|n| n.code == SyslogCode::InvalidCommand)
    );
}

#[test]
fn query_reports_mode_and_port_phase() {
    let mut bench = Bench::new(one_side(), PressureSource::none());
    bench.link.send(&CommandPacket::query()).unwrap();
    bench.engine.tick();
    let idle = bench.link.try_response().unwrap();
    assert_eq!(idle.status, ResponseStatus::Ack);
    assert_eq!(idle.mode, AcquisitionMode::Idle);
    assert_eq!(idle.phase, SpectrometerPhase::Idle);

    bench
        .link
        .send(&CommandPacket::start(AcquisitionMode::Calibrate, None, 1))
        .unwrap();
    bench.engine.tick();
    bench.link.try_response().unwrap();
    bench.link.send(&CommandPacket::query()).unwrap();
    bench.engine.tick();

    // The query is answered before this tick's phase advance
    let busy = bench.link.try_response().unwrap();
    assert_eq!(busy.mode, AcquisitionMode::Calibrate);
    assert_eq!(busy.phase, SpectrometerPhase::StartDark);
}

#[test]
fn stalled_consumer_drops_frames_without_stalling_acquisition() {
    let cfg = DaqConfig {
        pool_size: 2,
        ..one_side()
    };
    let mut bench = Bench::new(cfg, PressureSource::none());
    bench
        .link
        .send(&CommandPacket::start(AcquisitionMode::StreamLmd, Some(20), 10))
        .unwrap();

    // Never read the stream
    for _ in 0..30 {
        bench.engine.tick();
    }
    assert!(bench.engine.is_active());
    assert_eq!(bench.engine.pool().available(), 0);
    assert!(bench.engine.pool().dropped() > 0);
    assert!(
        bench
            .notes
            .try_iter()
            .any(|n| n.code == SyslogCode::FrameDropped)
    );
}
