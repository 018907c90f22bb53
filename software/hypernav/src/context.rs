//! Information about the current acquisition session
//! that may be used by the frame dispatchers.

use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use hypernav_shared::AcquisitionMode;

#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct SessionCtx {
    pub mode: AcquisitionMode,

    /// Valid pixels per frame
    pub pixel_count: usize,

    /// A name for this session, used for output file names
    pub op_name: String,

    /// Directory for file outputs
    pub op_dir: PathBuf,
}

impl Default for SessionCtx {
    fn default() -> Self {
        // Current time to the second as the name, with characters that are
        // invalid in Windows file names removed
        Self {
            mode: AcquisitionMode::Idle,
            pixel_count: 0,
            op_name: session_name(SystemTime::now()),
            op_dir: std::fs::canonicalize("./").unwrap_or_default(),
        }
    }
}

impl SessionCtx {
    pub fn new(mode: AcquisitionMode, pixel_count: usize, op_dir: PathBuf) -> Self {
        Self {
            mode,
            pixel_count,
            op_dir,
            ..Default::default()
        }
    }
}

/// File-name-safe RFC 3339 timestamp
pub fn session_name(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        .replace(':', "")
}

/// Fixed-width RFC 3339 UTC timestamp with nanoseconds
pub fn fmt_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}
