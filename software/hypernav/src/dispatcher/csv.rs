//! A plain-text CSV frame log, written on a worker thread.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use crossbeam::channel::{Sender, unbounded};
use tracing::{error, info};

use hypernav_shared::FrameHeader;

use super::FrameDispatcher;
use crate::buffer_pool::FrameHandle;
use crate::context::{SessionCtx, fmt_time};
use crate::frame::AcquiredFrame;

const HEADER_COLUMNS: [&str; 21] = [
    "timestamp_ms",
    "time",
    "side",
    "kind",
    "sample_number",
    "dark_sample_number",
    "integration_ms",
    "up_shift",
    "fifo_over",
    "quality",
    "pressure_dbar",
    "pressure_flags",
    "spec_temperature",
    "dark_average",
    "dark_noise",
    "pitch",
    "roll",
    "tilt",
    "heading",
    "heading_std",
    "solar_azimuth",
];

/// Header row for frames of `pixel_count` pixels
pub fn csv_header(pixel_count: usize) -> String {
    let mut s = HEADER_COLUMNS.join(",");
    for i in 0..pixel_count {
        s.push_str(&format!(",p{i}"));
    }
    s.push('\n');
    s
}

/// Format one frame as a CSV row, reusing `buf`
pub fn csv_row(buf: &mut String, frame: &AcquiredFrame) {
    use std::fmt::Write as _;

    let h: &FrameHeader = &frame.header;
    let time = DateTime::<Utc>::from_timestamp_millis(h.timestamp_ms).unwrap_or_default();

    buf.clear();
    let _ = write!(
        buf,
        "{},{},{},{:?},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        h.timestamp_ms,
        fmt_time(time),
        h.side.label(),
        h.kind,
        h.sample_number,
        h.dark_sample_number,
        h.integration_ms,
        h.up_shift,
        h.fifo_over,
        h.quality,
        h.pressure_dbar,
        h.pressure_flags,
        h.spec_temperature,
        h.dark_average,
        h.dark_noise,
        h.pitch,
        h.roll,
        h.tilt,
        h.heading,
        h.heading_std,
        h.solar_azimuth,
    );
    for p in &frame.pixels {
        let _ = write!(buf, ",{p}");
    }
    buf.push('\n');
}

/// Writes every frame it receives to `<op_dir>/<op_name>.csv`.
///
/// Frames are copied out of the pool immediately so the slot is released
/// before the row reaches disk.
#[derive(Default)]
pub struct CsvDispatcher {
    /// Overrides the session directory
    dir: Option<PathBuf>,

    worker: Option<WorkerHandle>,
}

impl CsvDispatcher {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir, worker: None }
    }

    /// File being written by the running worker
    pub fn path(&self) -> Option<&Path> {
        self.worker.as_ref().map(|w| w.path.as_path())
    }
}

impl FrameDispatcher for CsvDispatcher {
    fn init(&mut self, ctx: &SessionCtx) -> Result<(), String> {
        // Finish any previous file first
        self.terminate()?;

        let dir = self.dir.clone().unwrap_or_else(|| ctx.op_dir.clone());
        let path = dir.join(format!("{}.csv", ctx.op_name));
        self.worker = Some(WorkerHandle::new(path, csv_header(ctx.pixel_count))?);
        Ok(())
    }

    fn consume(&mut self, frame: FrameHandle) -> Result<(), String> {
        let worker = self
            .worker
            .as_ref()
            .ok_or_else(|| "CSV dispatcher must be initialized before consuming data".to_string())?;
        let copy: AcquiredFrame = (*frame.frame()).clone();
        drop(frame);
        worker
            .tx
            .send(copy)
            .map_err(|_| "CSV writer thread has stopped".to_string())
    }

    fn terminate(&mut self) -> Result<(), String> {
        match self.worker.take() {
            Some(worker) => worker.finish(),
            None => Ok(()),
        }
    }
}

struct WorkerHandle {
    tx: Sender<AcquiredFrame>,
    thread: JoinHandle<Result<u64, String>>,
    path: PathBuf,
}

impl WorkerHandle {
    fn new(path: PathBuf, header: String) -> Result<Self, String> {
        let file = File::create(&path)
            .map_err(|e| format!("Failed to create {}: {e}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(header.as_bytes())
            .map_err(|e| format!("Failed to write CSV header: {e}"))?;

        let (tx, rx) = unbounded::<AcquiredFrame>();
        let thread = thread::Builder::new()
            .name("hypernav-csv".to_string())
            .spawn(move || -> Result<u64, String> {
                // Grows to the longest row once and is reused after that
                let mut stringbuf = String::new();
                let mut rows = 0_u64;
                for frame in rx.iter() {
                    csv_row(&mut stringbuf, &frame);
                    writer
                        .write_all(stringbuf.as_bytes())
                        .map_err(|e| format!("Failed to write CSV row: {e}"))?;
                    rows += 1;
                }
                writer
                    .flush()
                    .map_err(|e| format!("Failed to flush CSV file: {e}"))?;
                Ok(rows)
            })
            .map_err(|e| format!("Failed to spawn CSV writer: {e}"))?;

        Ok(Self { tx, thread, path })
    }

    /// Close the queue and wait for the remaining rows to be written
    fn finish(self) -> Result<(), String> {
        let Self { tx, thread, path } = self;
        drop(tx);
        match thread.join() {
            Ok(Ok(rows)) => {
                info!("Wrote {rows} frames to {}", path.display());
                Ok(())
            }
            Ok(Err(e)) => {
                error!("{e}");
                Err(e)
            }
            Err(_) => Err("CSV writer thread panicked".to_string()),
        }
    }
}
