//! The acquisition task: command handling, the acquisition-mode machine,
//! and one phase machine per spectrometer.
//!
//! [`AcquisitionEngine::tick`] runs one scheduler iteration and returns how
//! long to sleep before the next one, so the engine can be driven from a
//! test without real time. [`AcquisitionEngine::spawn`] runs the same loop
//! on a dedicated thread.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use crossbeam::channel::Sender;
use tracing::{debug, info, warn};

use hypernav_shared::frame::quality;
use hypernav_shared::{
    AcquisitionMode, BoardAddress, CommandKind, CommandPacket, DataKind, ResponsePacket,
    ResponseStatus, SIDE_COUNT, Side, SpectrometerPhase as Phase,
};

pub mod assembly;
pub mod command;
pub mod integration;
pub mod phase;
pub mod readout;
pub mod rendezvous;
pub mod side_state;

pub use assembly::{FrameInputs, assemble, light_minus_dark, up_shift};
pub use command::{CommandLink, CommandPort, command_link};
pub use integration::{INTEGRATION_LADDER_MS, IntegrationTimeState, MAX_INDEX};
pub use phase::{CycleStatus, after_dark, after_light, after_transfer, is_allowed};
pub use readout::{DarkLightBuffers, Readout};
pub use rendezvous::IdleRendezvous;
pub use side_state::{AttitudeAccumulator, SideState};

use crate::buffer_pool::FramePool;
use crate::config::DaqConfig;
use crate::context::SessionCtx;
use crate::dispatcher::{FrameDispatcher, ProfileStore};
use crate::flash::FlashDevice;
use crate::frame::AcquiredFrame;
use crate::logging;
use crate::hardware::{Hardware, PressureSample, TiltHeading};
use crate::math::Attitude;
use crate::math::tilt;
use crate::notify::{Notification, Notifier, SyslogCode};
use crate::profile::{ProfileAction, ProfileScheduler};

/// Runs the spectrometer board's acquisition.
pub struct AcquisitionEngine {
    config: DaqConfig,
    hw: Hardware,

    mode: AcquisitionMode,
    sides: [SideState; SIDE_COUNT],
    rendezvous: IdleRendezvous,

    /// Sides finish their current cycle and then stay idle
    prepare_to_stop: bool,

    /// Hardware is powered and dispatchers are initialized
    session_active: bool,

    lights_per_dark: u16,
    darks_per_step: u16,
    scheduler: Option<ProfileScheduler>,

    pool: FramePool,
    dispatchers: Vec<Box<dyn FrameDispatcher>>,
    store: ProfileStore,
    offload: Option<Sender<AcquiredFrame>>,

    port: CommandPort,
    notifier: Notifier,
    op_dir: PathBuf,

    /// Move the log file to each session's output directory
    session_logs: bool,
}

impl AcquisitionEngine {
    pub fn new(
        config: DaqConfig,
        hw: Hardware,
        flash: Box<dyn FlashDevice>,
        port: CommandPort,
    ) -> Result<Self, String> {
        config.validate()?;
        let pool = FramePool::new(config.pool_size, config.pixel_count);
        let lights_per_dark = config.default_lights_per_dark;

        Ok(Self {
            hw,
            mode: AcquisitionMode::Idle,
            sides: Side::ALL.map(SideState::new),
            rendezvous: IdleRendezvous::new([false; SIDE_COUNT]),
            prepare_to_stop: false,
            session_active: false,
            lights_per_dark,
            darks_per_step: lights_per_dark,
            scheduler: None,
            pool,
            dispatchers: Vec::new(),
            store: ProfileStore::new(flash),
            offload: None,
            port,
            notifier: Notifier::default(),
            op_dir: std::env::current_dir().unwrap_or_default(),
            session_logs: false,
            config,
        })
    }

    /// Add a consumer for frames outside of profiles
    pub fn add_dispatcher(&mut self, dispatcher: Box<dyn FrameDispatcher>) {
        self.dispatchers.push(dispatcher);
    }

    /// Where stored profile frames go once a profile ends
    pub fn set_offload(&mut self, tx: Sender<AcquiredFrame>) {
        self.offload = Some(tx);
    }

    pub fn set_notifications(&mut self, tx: Sender<Notification>) {
        self.notifier.set_listener(tx);
    }

    /// Directory handed to dispatchers for file outputs
    pub fn set_output_dir(&mut self, dir: PathBuf) {
        self.op_dir = dir;
    }

    /// Write each session's log next to its outputs.
    /// Only takes effect once [`crate::logging::init_logging`] has run.
    pub fn set_session_logging(&mut self, enabled: bool) {
        self.session_logs = enabled;
    }

    pub fn config(&self) -> &DaqConfig {
        &self.config
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.mode
    }

    pub fn phase(&self, side: Side) -> Phase {
        self.sides
            .get(side.index())
            .map(|s| s.phase)
            .unwrap_or_default()
    }

    pub fn side(&self, side: Side) -> Option<&SideState> {
        self.sides.get(side.index())
    }

    pub fn is_active(&self) -> bool {
        self.session_active
    }

    pub fn is_stopping(&self) -> bool {
        self.prepare_to_stop
    }

    pub fn pool(&self) -> &FramePool {
        &self.pool
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn scheduler(&self) -> Option<&ProfileScheduler> {
        self.scheduler.as_ref()
    }

    /// One scheduler iteration: take at most one command, step the profile
    /// schedule, advance each side by one phase, and finish the session once
    /// every side is idle after a stop. Returns the time to sleep.
    pub fn tick(&mut self) -> Duration {
        if let Some(cmd) = self.port.try_next() {
            let resp = self.handle_command(&cmd);
            if let Err(e) = self.port.respond(&resp) {
                warn!("{e}");
            }
        }

        let delay = self.step_profile();

        for side in Side::ALL {
            self.advance_side(side);
        }

        let profiling = self.mode == AcquisitionMode::FloatProfile;
        if self.session_active
            && self.rendezvous.all_idle()
            && (self.prepare_to_stop || !profiling)
        {
            self.finalize();
        }

        let periods = &self.config.periods;
        match delay {
            Some(d) => d,
            None if self.session_active => periods.active(),
            None => periods.idle(),
        }
    }

    /// Tick and sleep until `shutdown` is set, then power everything down
    pub fn run(&mut self, shutdown: &AtomicBool) {
        info!("Acquisition task running");
        while !shutdown.load(Ordering::Relaxed) {
            let period = self.tick();
            thread::sleep(period);
        }

        if self.session_active {
            warn!("Shutting down with a session in progress");
            self.finalize();
        }
        info!("Acquisition task stopped");
    }

    /// Run the loop on its own thread
    pub fn spawn(mut self) -> Result<EngineThread, String> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        let thread = thread::Builder::new()
            .name("hypernav-daq".to_string())
            .spawn(move || {
                #[cfg(feature = "affinity")]
                pin_acquisition_thread();

                self.run(&flag);
                self
            })
            .map_err(|e| format!("Failed to spawn acquisition thread: {e}"))?;

        Ok(EngineThread { shutdown, thread })
    }

    fn handle_command(&mut self, cmd: &CommandPacket) -> ResponsePacket {
        let status = if cmd.destination != BoardAddress::Spectrometer {
            self.notifier.emit(
                SyslogCode::MisaddressedPacket,
                None,
                format!("{:?} command addressed to {:?}", cmd.kind, cmd.destination),
            );
            ResponseStatus::NakMisaddressed
        } else {
            match cmd.kind {
                CommandKind::Start => {
                    if cmd.mode.is_startable() {
                        self.start_session(cmd.mode, cmd.fixed_integration(), cmd.count)
                    } else {
                        warn!("Start rejected: {:?} cannot be started directly", cmd.mode);
                        ResponseStatus::NakInvalidParameter
                    }
                }
                CommandKind::StartProfiling => {
                    self.start_session(AcquisitionMode::FloatProfile, None, cmd.count)
                }
                CommandKind::Stop => {
                    self.request_stop("Stop command");
                    ResponseStatus::Ack
                }
                CommandKind::EndProfiling => {
                    if self.mode == AcquisitionMode::FloatProfile {
                        self.request_stop("End of profile commanded");
                        ResponseStatus::Ack
                    } else {
                        warn!("End of profile commanded while not profiling");
                        ResponseStatus::Nak
                    }
                }
                CommandKind::Query => ResponseStatus::Ack,
                other => {
                    self.notifier.emit(
                        SyslogCode::InvalidCommand,
                        None,
                        format!("Unknown command {other:?}"),
                    );
                    ResponseStatus::Nak
                }
            }
        };

        ResponsePacket {
            status,
            mode: self.mode,
            phase: self.phase(Side::Port),
            ..Default::default()
        }
    }

    fn request_stop(&mut self, reason: &str) {
        if self.session_active && !self.prepare_to_stop {
            self.prepare_to_stop = true;
            self.notifier
                .emit(SyslogCode::AcquisitionStopping, None, reason.to_string());
        }
    }

    fn start_session(
        &mut self,
        mode: AcquisitionMode,
        fixed_ms: Option<u16>,
        count: u16,
    ) -> ResponseStatus {
        if self.session_active {
            warn!("{mode:?} rejected: {:?} is still running", self.mode);
            return ResponseStatus::NakBusy;
        }

        let mut enabled = Side::ALL.map(|s| self.config.side_enabled(s));
        if !enabled.iter().any(|&e| e) {
            warn!("{mode:?} requested with no spectrometer enabled; staying idle");
            return ResponseStatus::Ack;
        }

        let count = match count {
            0 => self.config.default_lights_per_dark,
            n => n,
        };
        self.lights_per_dark = count;
        self.darks_per_step = count;

        let ctx = SessionCtx::new(mode, self.config.pixel_count, self.op_dir.clone());
        if self.session_logs {
            match logging::follow_session(&ctx) {
                Ok(Some(path)) => info!("Logging {mode:?} session to {}", path.display()),
                Ok(None) => {}
                Err(e) => warn!("{e}"),
            }
        }
        if let Err(e) = self.init_dispatchers(mode, &ctx) {
            self.notifier.emit(SyslogCode::DispatchFailed, None, e);
            return ResponseStatus::Nak;
        }

        for side in Side::ALL {
            let i = side.index();
            if !enabled[i] {
                continue;
            }
            if let Err(e) = self.hw.spectrometer.set_power(side, true) {
                self.notifier.emit(
                    SyslogCode::PowerFailed,
                    Some(side),
                    format!("Failed to power spectrometer: {e}"),
                );
                self.notifier
                    .emit(SyslogCode::SideDisabled, Some(side), "Side left out of session");
                enabled[i] = false;
            }
        }
        if !enabled.iter().any(|&e| e) {
            self.terminate_dispatchers(mode);
            return ResponseStatus::Nak;
        }

        if let Err(e) = self.hw.pressure.start() {
            self.notifier.emit(
                SyslogCode::PressureReadFailed,
                None,
                format!("Failed to start pressure sensor: {e}"),
            );
        }

        let integration = self.initial_integration(mode, fixed_ms);
        for side in Side::ALL {
            self.sides[side.index()].begin(enabled[side.index()], integration);
        }
        self.rendezvous = IdleRendezvous::new(enabled);
        self.mode = mode;
        self.prepare_to_stop = false;
        self.session_active = true;

        self.notifier.emit(
            SyslogCode::AcquisitionStarted,
            None,
            format!(
                "{mode:?} at {} ms, count {count}",
                integration.current_time_ms()
            ),
        );

        if mode == AcquisitionMode::FloatProfile {
            let scheduler = ProfileScheduler::new(&self.config.profile);
            self.notifier.emit(
                SyslogCode::ProfileStarted,
                None,
                format!("{} breakpoints", scheduler.table().points().len()),
            );
            self.scheduler = Some(scheduler);
        } else {
            self.begin_cycle();
        }

        ResponseStatus::Ack
    }

    fn initial_integration(
        &self,
        mode: AcquisitionMode,
        fixed_ms: Option<u16>,
    ) -> IntegrationTimeState {
        let initial = self.config.initial_integration_index.min(MAX_INDEX);
        match (fixed_ms, mode) {
            (Some(ms), _) => IntegrationTimeState::fixed(ms),
            (None, AcquisitionMode::Calibrate) => {
                IntegrationTimeState::fixed(INTEGRATION_LADDER_MS[initial])
            }
            (None, AcquisitionMode::DarkCharacterize) => IntegrationTimeState::auto(0),
            (None, _) => IntegrationTimeState::auto(initial),
        }
    }

    fn init_dispatchers(&mut self, mode: AcquisitionMode, ctx: &SessionCtx) -> Result<(), String> {
        if mode == AcquisitionMode::FloatProfile {
            return self.store.init(ctx);
        }
        for d in self.dispatchers.iter_mut() {
            d.init(ctx)?;
        }
        Ok(())
    }

    fn terminate_dispatchers(&mut self, mode: AcquisitionMode) {
        let results: Vec<Result<(), String>> = if mode == AcquisitionMode::FloatProfile {
            vec![self.store.terminate()]
        } else {
            self.dispatchers.iter_mut().map(|d| d.terminate()).collect()
        };
        for e in results.into_iter().filter_map(Result::err) {
            self.notifier.emit(SyslogCode::DispatchFailed, None, e);
        }
    }

    /// Send every enabled side into a dark/light cycle
    fn begin_cycle(&mut self) {
        for side in Side::ALL {
            let state = &mut self.sides[side.index()];
            if state.enabled {
                state.lights_since_dark = 0;
                state.darks_at_step = 0;
                self.set_phase(side, Phase::CloseShutter);
            }
        }
        self.rendezvous.arm();
    }

    /// Evaluate the depth schedule while both sides are idle.
    /// Returns the profile delay when no measurement is due.
    fn step_profile(&mut self) -> Option<Duration> {
        if self.mode != AcquisitionMode::FloatProfile
            || self.prepare_to_stop
            || !self.rendezvous.all_idle()
        {
            return None;
        }

        let pressure = self.read_pressure();
        if !pressure.valid {
            debug!("No pressure reading yet; profile waits");
            return Some(self.config.periods.delay());
        }
        let p = pressure.reading.pressure_dbar;
        let scheduler = self.scheduler.as_mut()?;

        match scheduler.evaluate(p) {
            action @ (ProfileAction::Continuous | ProfileAction::Single) => {
                self.notifier.emit(
                    SyslogCode::ProfileAction,
                    None,
                    format!("{action:?} measurement at {p:.2} dbar"),
                );
                self.begin_cycle();
                None
            }
            ProfileAction::Delay => {
                debug!("Profile delay at {p:.2} dbar");
                Some(self.config.periods.delay())
            }
            ProfileAction::Complete => {
                self.notifier.emit(
                    SyslogCode::ProfileSurfaced,
                    None,
                    format!("Surfaced at {p:.2} dbar"),
                );
                self.prepare_to_stop = true;
                None
            }
        }
    }

    fn advance_side(&mut self, side: Side) {
        let i = side.index();
        let from = self.sides[i].phase;
        let to = match from {
            Phase::Idle => Phase::Idle,
            Phase::CloseShutter => self.close_shutter(side),
            Phase::StartDark => self.start_sampling(side, Phase::GetDark),
            Phase::GetDark => self.get_dark(side),
            Phase::OpenShutter => self.open_shutter(side),
            Phase::StartLight => self.start_sampling(side, Phase::GetLight),
            Phase::GetLight => self.get_light(side),
            Phase::TransferD => self.transfer(side, DataKind::Dark),
            Phase::TransferL => self.transfer(side, DataKind::Light),
            Phase::TransferLmd => self.transfer(side, DataKind::LightMinusDark),
            other => {
                warn!("Side {} in unknown phase {other:?}; idling", side.label());
                Phase::Idle
            }
        };
        self.set_phase(side, to);
        self.rendezvous.report(side, self.sides[i].is_idle());
    }

    fn set_phase(&mut self, side: Side, to: Phase) {
        let state = &mut self.sides[side.index()];
        let from = state.phase;
        if from == to {
            return;
        }
        debug_assert!(is_allowed(from, to), "{from:?} -> {to:?}");
        state.phase = to;
        self.notifier
            .emit(SyslogCode::PhaseChanged, Some(side), format!("{from:?} -> {to:?}"));
    }

    /// Drop a side out of the session after a hardware fault and stop the rest
    fn fail_side(&mut self, side: Side, code: SyslogCode, msg: String) -> Phase {
        self.notifier.emit(code, Some(side), msg);
        self.request_stop("Hardware fault");
        Phase::Idle
    }

    fn close_shutter(&mut self, side: Side) -> Phase {
        let state = &mut self.sides[side.index()];
        state.darks_at_step = 0;
        let before = state.integration.current_time_ms();
        if state.integration.commit() {
            let after = state.integration.current_time_ms();
            self.notifier.emit(
                SyslogCode::IntegrationChanged,
                Some(side),
                format!("Integration time {before} ms -> {after} ms"),
            );
        }

        if self.mode.is_dark_only() && !self.config.shutters_fitted {
            return Phase::StartDark;
        }
        match self.hw.shutter.close(side) {
            Ok(()) => Phase::StartDark,
            Err(e) => self.fail_side(
                side,
                SyslogCode::ShutterFailed,
                format!("Failed to close shutter: {e}"),
            ),
        }
    }

    fn open_shutter(&mut self, side: Side) -> Phase {
        if !self.config.shutters_fitted {
            return Phase::StartLight;
        }
        match self.hw.shutter.open(side) {
            Ok(()) => Phase::StartLight,
            Err(e) => self.fail_side(
                side,
                SyslogCode::ShutterFailed,
                format!("Failed to open shutter: {e}"),
            ),
        }
    }

    /// Start one readout burst. A light burst also restarts attitude averaging.
    fn start_sampling(&mut self, side: Side, next: Phase) -> Phase {
        let i = side.index();
        let integration_ms = self.sides[i].integration.current_time_ms();
        if let Err(e) =
            self.hw
                .spectrometer
                .start_capture(side, integration_ms, self.config.clearouts, 1)
        {
            return self.fail_side(
                side,
                SyslogCode::SamplingStartFailed,
                format!("Failed to start sampling at {integration_ms} ms: {e}"),
            );
        }

        if next == Phase::GetLight {
            self.sides[i].attitude.reset();
            self.sample_attitude(side);
        }
        next
    }

    fn readout_ready(&mut self, side: Side) -> bool {
        self.hw.spectrometer.spectra_available(side) > self.config.clearouts
    }

    fn get_dark(&mut self, side: Side) -> Phase {
        if !self.readout_ready(side) {
            return Phase::GetDark;
        }
        let (clearouts, pixel_count) = (self.config.clearouts, self.config.pixel_count);
        let state = &mut self.sides[side.index()];
        let fifo = self.hw.spectrometer.as_mut();
        state.buffers.dark.read_from(fifo, side, clearouts, pixel_count);
        fifo.rearm(side);

        state.darks = state.darks.wrapping_add(1);
        state.lights_since_dark = 0;
        state.darks_at_step += 1;

        self.read_temperature(side);
        after_dark(self.mode)
    }

    fn get_light(&mut self, side: Side) -> Phase {
        if !self.readout_ready(side) {
            return Phase::GetLight;
        }
        let (clearouts, pixel_count) = (self.config.clearouts, self.config.pixel_count);
        let saturation = self.config.saturation_counts;
        let state = &mut self.sides[side.index()];
        let fifo = self.hw.spectrometer.as_mut();
        state.buffers.light.read_from(fifo, side, clearouts, pixel_count);
        fifo.rearm(side);

        state.lights_since_dark += 1;
        let (peak, dark_peak) = (state.buffers.light.peak(), state.buffers.dark.peak());
        state.integration.stage(peak, dark_peak, saturation);

        self.read_temperature(side);
        self.sample_attitude(side);
        after_light(self.mode)
    }

    fn transfer(&mut self, side: Side, kind: DataKind) -> Phase {
        let i = side.index();
        let transfer = self.sides[i].phase;
        self.emit_frame(side, kind);

        let profiling = self.mode == AcquisitionMode::FloatProfile;
        let dark_only = self.mode.is_dark_only();
        let state = &mut self.sides[i];

        // Dark sweeps step up the ladder once enough darks are taken at each time
        let mut sweep_complete = false;
        if dark_only
            && !state.integration.is_fixed()
            && state.darks_at_step >= self.darks_per_step.max(1)
        {
            let current = state.integration.current_index();
            if current >= MAX_INDEX {
                sweep_complete = true;
            } else {
                state.integration.stage_index(current + 1);
            }
        }

        let status = CycleStatus {
            stop_requested: self.prepare_to_stop
                || (profiling && state.lights_since_dark >= self.lights_per_dark.max(1)),
            lights_since_dark: state.lights_since_dark,
            lights_per_dark: self.lights_per_dark,
            change_staged: state.integration.change_staged(),
            sweep_complete,
            darks_at_step: state.darks_at_step,
            darks_per_step: self.darks_per_step,
        };

        if sweep_complete {
            info!("Side {} finished the dark sweep", side.label());
            self.request_stop("Dark characterization complete");
        }
        after_transfer(self.mode, transfer, &status)
    }

    /// Assemble a frame from the side's buffers and hand it off
    fn emit_frame(&mut self, side: Side, kind: DataKind) {
        let Some(handle) = self.pool.try_acquire() else {
            self.notifier.emit(
                SyslogCode::FrameDropped,
                Some(side),
                format!("No free frame buffer; {kind:?} frame dropped"),
            );
            return;
        };

        let profiling = self.mode == AcquisitionMode::FloatProfile;
        let pressure = if profiling {
            // The reading that triggered this measurement
            self.hw.pressure.latest()
        } else {
            self.read_pressure()
        };
        let inputs = FrameInputs {
            time: Utc::now(),
            kind,
            pressure,
            gps: self.config.gps,
            saturation: self.config.saturation_counts,
        };

        let state = &mut self.sides[side.index()];
        let q = {
            let mut frame = handle.frame();
            assemble(&mut frame, state, &inputs);
            frame.header.quality
        };
        state.frames = state.frames.wrapping_add(1);

        if q & quality::FIFO_OVERRUN != 0 {
            self.notifier.emit(
                SyslogCode::FifoOverrun,
                Some(side),
                format!("FIFO overrun in {kind:?} readout"),
            );
        }

        if profiling {
            if let Err(e) = self.store.consume(handle) {
                self.notifier.emit(SyslogCode::FlashWriteFailed, Some(side), e);
            }
        } else {
            for d in self.dispatchers.iter_mut() {
                if let Err(e) = d.consume(handle.clone()) {
                    self.notifier.emit(SyslogCode::DispatchFailed, Some(side), e);
                }
            }
        }
    }

    /// New pressure reading, or the last good one if the sensor failed
    fn read_pressure(&mut self) -> PressureSample {
        match self.hw.pressure.update() {
            Ok(sample) => sample,
            Err(e) => {
                self.notifier.emit(
                    SyslogCode::PressureReadFailed,
                    None,
                    format!("Pressure read failed; reusing last value: {e}"),
                );
                self.hw.pressure.latest()
            }
        }
    }

    fn read_temperature(&mut self, side: Side) {
        let i = side.index();
        match self.hw.spectrometer.temperature(side) {
            Ok(t) => self.sides[i].temperature_c = t,
            Err(e) => {
                self.sides[i].temperature_c = f64::NAN;
                self.notifier.emit(
                    SyslogCode::TemperatureReadFailed,
                    Some(side),
                    format!("Failed to read detector temperature: {e}"),
                );
            }
        }
    }

    fn sample_attitude(&mut self, side: Side) {
        match read_attitude(self.hw.tilt.as_mut(), &self.config) {
            Ok(a) => self.sides[side.index()].attitude.push(&a),
            Err(e) => self.notifier.emit(
                SyslogCode::AttitudeReadFailed,
                Some(side),
                format!("Attitude sample skipped: {e}"),
            ),
        }
    }

    /// Power down and release everything the session used
    fn finalize(&mut self) {
        for side in Side::ALL {
            if !self.sides[side.index()].enabled {
                continue;
            }
            self.set_phase(side, Phase::Idle);
            if let Err(e) = self.hw.spectrometer.set_power(side, false) {
                self.notifier.emit(
                    SyslogCode::PowerFailed,
                    Some(side),
                    format!("Failed to power down spectrometer: {e}"),
                );
            }
        }
        self.hw.shutter.power_off();
        self.hw.pressure.stop();

        let mode = self.mode;
        self.terminate_dispatchers(mode);
        if mode == AcquisitionMode::FloatProfile {
            self.offload_profile();
            self.scheduler = None;
        }

        let frames: u32 = self.sides.iter().map(|s| s.frames).sum();
        self.mode = AcquisitionMode::Idle;
        self.session_active = false;
        self.prepare_to_stop = false;
        self.rendezvous = IdleRendezvous::new([false; SIDE_COUNT]);
        self.notifier.emit(
            SyslogCode::AcquisitionStopped,
            None,
            format!("{mode:?} finished after {frames} frames"),
        );
    }

    fn offload_profile(&mut self) {
        let result = match &self.offload {
            Some(tx) => self.store.offload(tx),
            None => {
                warn!(
                    "No offload destination; {} profile frames stay in flash",
                    self.store.frame_count()
                );
                return;
            }
        };
        match result {
            Ok(n) => self.notifier.emit(
                SyslogCode::OffloadComplete,
                None,
                format!("Offloaded {n} profile frames"),
            ),
            Err(e) => self.notifier.emit(SyslogCode::FlashReadFailed, None, e),
        }
    }
}

fn read_attitude(tilt_sensor: &mut dyn TiltHeading, cfg: &DaqConfig) -> Result<Attitude, String> {
    let accel = tilt_sensor.accel_raw(cfg.attitude_samples)?;
    let mag = tilt_sensor.mag_raw(cfg.attitude_samples)?;
    tilt::attitude(accel, mag, &cfg.accel, &cfg.mag)
}

/// Pin the acquisition loop to the first core and raise its priority.
/// Either step may be unavailable on a given platform.
#[cfg(feature = "affinity")]
fn pin_acquisition_thread() {
    let core_ids = core_affinity::get_core_ids().unwrap_or_default();
    if let Some(core) = core_ids.first() {
        core_affinity::set_for_current(*core);
    }
    let _ = thread_priority::set_current_thread_priority(thread_priority::ThreadPriority::Max);
}

/// A running acquisition thread
pub struct EngineThread {
    shutdown: Arc<AtomicBool>,
    thread: JoinHandle<AcquisitionEngine>,
}

impl EngineThread {
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Signal the loop to exit and get the engine back
    pub fn stop_and_join(self) -> Result<AcquisitionEngine, String> {
        self.shutdown.store(true, Ordering::Relaxed);
        self.thread
            .join()
            .map_err(|_| "Acquisition thread panicked".to_string())
    }
}
