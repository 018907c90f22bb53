//! Run a float profile and a short stream session against simulated hardware.
//!
//! Demonstrated here:
//!   * Building the acquisition engine over the simulated spectrometer board
//!   * Commanding it through a `CommandLink` while it runs on its own thread
//!   * Collecting offloaded profile frames, and a CSV log of streamed frames
//!   * Per-session log files next to the session outputs
//!
//! Pass a JSON config path to override the bench defaults.

use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, unbounded};
use tracing::info;

use hypernav::acquisition::command_link;
use hypernav::config::{LoopPeriods, PressureConfig, PressureSourceKind};
use hypernav::flash::RamFlash;
use hypernav::hypernav_shared::{AcquisitionMode, CommandPacket, ResponsePacket, ResponseStatus};
use hypernav::logging::init_logging;
use hypernav::profile::SimulatedAscent;
use hypernav::*;

fn main() -> Result<(), String> {
    let out_dir = std::env::temp_dir().join("hypernav_profile_sim");
    std::fs::create_dir_all(&out_dir)
        .map_err(|e| format!("Failed to create {}: {e}", out_dir.display()))?;
    let (log_path, loggers) = init_logging(&out_dir, "profile_sim")?;

    // Fast loop periods so the ascent takes seconds instead of hours
    let cfg = match std::env::args().nth(1) {
        Some(path) => DaqConfig::load(path.as_ref())?,
        None => DaqConfig {
            pixel_count: 256,
            periods: LoopPeriods {
                active_ms: 1,
                idle_ms: 5,
                delay_ms: 2,
            },
            pressure: PressureConfig {
                source: PressureSourceKind::Simulated(SimulatedAscent::new(120.0, 4.0)),
                ..Default::default()
            },
            ..Default::default()
        },
    };

    let board = SimulatedBoard::new(cfg.pixel_count);
    let hw = board.hardware_with_pressure(cfg.pressure.build(board.pressure_sensor()));
    let flash = RamFlash::new(cfg.flash.sector_size, cfg.flash.sector_count);
    let (link, port) = command_link(4);

    let mut engine = AcquisitionEngine::new(cfg, hw, Box::new(flash), port)?;
    engine.set_output_dir(out_dir.clone());
    engine.set_session_logging(true);
    engine.add_dispatcher(Box::new(CsvDispatcher::default()));
    let (offload_tx, offload_rx) = unbounded();
    engine.set_offload(offload_tx);
    let (note_tx, note_rx) = unbounded();
    engine.set_notifications(note_tx);

    let running = engine.spawn()?;
    let timeout = Duration::from_secs(1);

    // Profile until the simulated float surfaces
    expect_ack(link.request(&CommandPacket::start_profiling(3), timeout)?)?;
    wait_for(&note_rx, SyslogCode::AcquisitionStopped, Duration::from_secs(60))?;

    let frames: Vec<AcquiredFrame> = offload_rx.try_iter().collect();
    info!("Offloaded {} profile frames", frames.len());
    if let (Some(newest), Some(oldest)) = (frames.first(), frames.last()) {
        info!(
            "Newest frame at {:.1} dbar, oldest at {:.1} dbar",
            newest.header.pressure_dbar, oldest.header.pressure_dbar
        );
    }

    // A short stream session, logged to CSV
    expect_ack(link.request(
        &CommandPacket::start(AcquisitionMode::StreamLmd, Some(40), 4),
        timeout,
    )?)?;
    std::thread::sleep(Duration::from_millis(200));
    expect_ack(link.request(&CommandPacket::stop(), timeout)?)?;
    wait_for(&note_rx, SyslogCode::AcquisitionStopped, Duration::from_secs(10))?;

    let engine = running.stop_and_join()?;
    info!(
        "Frames dropped for lack of a buffer: {}",
        engine.pool().dropped()
    );
    info!(
        "Outputs in {}, bench log at {}, last session log at {}",
        out_dir.display(),
        log_path.display(),
        loggers.file_path().unwrap_or_default().display()
    );
    Ok(())
}

fn expect_ack(resp: ResponsePacket) -> Result<(), String> {
    match resp.status {
        ResponseStatus::Ack => Ok(()),
        other => Err(format!("Command refused: {other:?}")),
    }
}

/// Wait for a notification with the given code, discarding the others
fn wait_for(rx: &Receiver<Notification>, code: SyslogCode, timeout: Duration) -> Result<(), String> {
    let deadline = Instant::now() + timeout;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(n) if n.code == code => return Ok(()),
            Ok(_) => continue,
            Err(_) => return Err(format!("Timed out waiting for {code:?}")),
        }
    }
}
