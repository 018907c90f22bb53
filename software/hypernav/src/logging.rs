//! Terminal and file logging.
//!
//! The terminal output lasts for the life of the process. The file output can
//! follow the acquisition sessions, so each session's events land in
//! `<op_dir>/logs/<op_name>.log` next to its frame outputs.

use std::{
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock},
};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

use crate::context::SessionCtx;

type FileLayer = fmt::Layer<
    Registry,
    fmt::format::DefaultFields,
    fmt::format::Format<fmt::format::Full, fmt::time::ChronoUtc>,
    NonBlocking,
>;

static LOGGERS: OnceLock<Loggers> = OnceLock::new();

/// The log file currently receiving output
struct FileTarget {
    path: PathBuf,

    /// Flushes the file when dropped
    _guard: WorkerGuard,
}

/// Process-wide logging state. Writer threads flush when their guards drop,
/// so this lives until the process exits.
pub struct Loggers {
    _terminal: Mutex<WorkerGuard>,
    file: Mutex<FileTarget>,
    file_reload: reload::Handle<FileLayer, Registry>,
}

impl Loggers {
    /// Path of the file currently being written
    pub fn file_path(&self) -> Option<PathBuf> {
        self.file.lock().ok().map(|t| t.path.clone())
    }

    fn switch_file(&self, path: PathBuf, logfile: File) -> Result<(), String> {
        let mut target = self
            .file
            .lock()
            .map_err(|_| "Log file lock poisoned".to_string())?;
        if target.path == path {
            return Ok(());
        }

        let (writer, guard) = tracing_appender::non_blocking(logfile);
        let layer = file_layer(writer);
        self.file_reload
            .modify(|l| *l = layer)
            .map_err(|e| format!("Failed to move log output to {}: {e}", path.display()))?;

        // Dropping the old guard flushes the previous file
        *target = FileTarget {
            path,
            _guard: guard,
        };
        Ok(())
    }
}

fn open_log(dir: &Path, name: &str) -> Result<(PathBuf, File), String> {
    let log_dir = dir.join("logs");
    fs::create_dir_all(&log_dir)
        .map_err(|e| format!("Failed to create log directory {}: {e}", log_dir.display()))?;
    let path = log_dir.join(format!("{name}.log"));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("Failed to open log file {}: {e}", path.display()))?;
    Ok((path, file))
}

/// Plain-text file output. Thread names distinguish the acquisition loop
/// from the dispatcher workers.
fn file_layer(writer: NonBlocking) -> FileLayer {
    fmt::layer::<Registry>()
        .with_timer(fmt::time::ChronoUtc::rfc_3339())
        .with_thread_names(true)
        .with_writer(writer)
        .with_ansi(false)
}

/// Log to the terminal and to `<dir>/logs/<name>.log`.
///
/// The level comes from `RUST_LOG`, `info` if unset. Calling again moves the
/// file output and leaves the terminal output as it is.
pub fn init_logging(dir: &Path, name: &str) -> Result<(PathBuf, &'static Loggers), String> {
    let (path, logfile) = open_log(dir, name)?;

    if let Some(loggers) = LOGGERS.get() {
        loggers.switch_file(path.clone(), logfile)?;
        return Ok((path, loggers));
    }

    let (terminal_writer, terminal_guard) = tracing_appender::non_blocking(std::io::stdout());
    let (file_writer, file_guard) = tracing_appender::non_blocking(logfile);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| format!("Failed to set up log filter: {e}"))?;

    let terminal_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::rfc_3339())
        .with_writer(terminal_writer)
        .with_target(false);
    let (file_layer, file_reload) =
        reload::Layer::<FileLayer, Registry>::new(file_layer(file_writer));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(env_filter)
        .with(terminal_layer)
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {e}"))?;

    let loggers = LOGGERS.get_or_init(|| Loggers {
        _terminal: Mutex::new(terminal_guard),
        file: Mutex::new(FileTarget {
            path: path.clone(),
            _guard: file_guard,
        }),
        file_reload,
    });
    Ok((path, loggers))
}

/// Move file output to the log for `ctx`'s session.
///
/// Returns `Ok(None)` if logging was never initialized with [`init_logging`],
/// in which case nothing is opened.
pub fn follow_session(ctx: &SessionCtx) -> Result<Option<PathBuf>, String> {
    let Some(loggers) = LOGGERS.get() else {
        return Ok(None);
    };
    let (path, logfile) = open_log(&ctx.op_dir, &ctx.op_name)?;
    loggers.switch_file(path.clone(), logfile)?;
    Ok(Some(path))
}
