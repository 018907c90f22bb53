//! Fixed pool of frame slots shared between the acquisition task and the
//! frame consumers.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use crate::frame::AcquiredFrame;

/// Default number of slots
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Occupancy of a pool slot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SlotStatus {
    #[default]
    Empty,

    /// Claimed and holding a frame in RAM
    FullInMemory,

    /// Claimed, with the frame already copied to the flash stack
    FullInExternalMemory,
}

struct Slot {
    status: SlotStatus,
    frame: AcquiredFrame,
}

struct FramePoolInner {
    slots: Vec<Mutex<Slot>>,
    dropped: AtomicU64,
}

/// Bounded pool of reusable frames.
///
/// Claiming never blocks: each slot's lock is tried once and a busy or
/// non-empty slot is skipped. When every slot is taken the claim fails and
/// the caller drops its frame.
pub struct FramePool {
    inner: Arc<FramePoolInner>,
}

impl FramePool {
    /// Pool of `capacity` slots with room for `pixel_count` pixels each
    pub fn new(capacity: usize, pixel_count: usize) -> Self {
        let slots = (0..capacity.max(1))
            .map(|_| {
                Mutex::new(Slot {
                    status: SlotStatus::Empty,
                    frame: AcquiredFrame::with_capacity(pixel_count),
                })
            })
            .collect();
        Self {
            inner: Arc::new(FramePoolInner {
                slots,
                dropped: AtomicU64::new(0),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.slots.len()
    }

    /// Claim an empty slot if one is free right now.
    pub fn try_acquire(&self) -> Option<FrameHandle> {
        for (index, slot) in self.inner.slots.iter().enumerate() {
            let mut guard = match slot.try_lock() {
                Ok(g) => g,
                Err(TryLockError::Poisoned(e)) => e.into_inner(),
                Err(TryLockError::WouldBlock) => continue,
            };
            if guard.status == SlotStatus::Empty {
                guard.status = SlotStatus::FullInMemory;
                return Some(FrameHandle {
                    inner: Arc::new(HandleInner {
                        pool: self.clone(),
                        index,
                    }),
                });
            }
        }
        self.inner.dropped.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Number of claims that failed because every slot was busy
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    pub fn status(&self, index: usize) -> Option<SlotStatus> {
        self.inner.slots.get(index).map(|s| lock(s).status)
    }

    /// Slots currently empty. Waits on slots that are being written.
    pub fn available(&self) -> usize {
        self.inner
            .slots
            .iter()
            .filter(|s| lock(s).status == SlotStatus::Empty)
            .count()
    }

    fn release(&self, index: usize) {
        if let Some(slot) = self.inner.slots.get(index) {
            lock(slot).status = SlotStatus::Empty;
        }
    }
}

impl Clone for FramePool {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for FramePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePool")
            .field("capacity", &self.capacity())
            .field("dropped", &self.dropped())
            .finish()
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

struct HandleInner {
    pool: FramePool,
    index: usize,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        self.pool.release(self.index);
    }
}

/// Claim on one pool slot. Clones share the claim; the slot returns to
/// the pool when the last clone is dropped.
#[derive(Clone)]
pub struct FrameHandle {
    inner: Arc<HandleInner>,
}

impl FrameHandle {
    pub fn index(&self) -> usize {
        self.inner.index
    }

    /// Lock the slot for reading or writing the frame
    pub fn frame(&self) -> FrameGuard<'_> {
        FrameGuard(lock(&self.inner.pool.inner.slots[self.inner.index]))
    }

    pub fn status(&self) -> SlotStatus {
        lock(&self.inner.pool.inner.slots[self.inner.index]).status
    }

    /// Record that the frame has been copied out to external memory
    pub fn mark_external(&self) {
        lock(&self.inner.pool.inner.slots[self.inner.index]).status =
            SlotStatus::FullInExternalMemory;
    }
}

impl std::fmt::Debug for FrameHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHandle")
            .field("index", &self.inner.index)
            .finish()
    }
}

/// Locked access to a claimed frame
pub struct FrameGuard<'a>(MutexGuard<'a, Slot>);

impl Deref for FrameGuard<'_> {
    type Target = AcquiredFrame;

    fn deref(&self) -> &AcquiredFrame {
        &self.0.frame
    }
}

impl DerefMut for FrameGuard<'_> {
    fn deref_mut(&mut self) -> &mut AcquiredFrame {
        &mut self.0.frame
    }
}
