//! Dispatchers hand assembled frames to a consumer outside the acquisition task.

mod csv;
mod profile_store;
mod stream;

pub use csv::CsvDispatcher;
pub use profile_store::ProfileStore;
pub use stream::StreamDispatcher;

use crate::buffer_pool::FrameHandle;
use crate::context::SessionCtx;

/// A frame consumer fed by the acquisition task.
///
/// `consume` runs on the acquisition thread and must not block; slow work
/// belongs on a worker. Dropping the handle returns the slot to the pool.
pub trait FrameDispatcher: Send {
    /// Set up at the start of a session
    fn init(&mut self, ctx: &SessionCtx) -> Result<(), String>;

    /// Take one frame
    fn consume(&mut self, frame: FrameHandle) -> Result<(), String>;

    /// Shut down and reset for the next session
    fn terminate(&mut self) -> Result<(), String>;
}
