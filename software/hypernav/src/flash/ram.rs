use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::FlashDevice;

#[derive(Debug)]
struct RamFlashState {
    bytes: Vec<u8>,
    erases: Vec<usize>,
    fail_writes: bool,
}

/// In-memory flash with NOR write rules, for tests and bench runs.
///
/// Clones share the same memory, so a test can keep one to inspect
/// erase history after handing another to the engine.
#[derive(Clone, Debug)]
pub struct RamFlash {
    sector_size: usize,
    sector_count: usize,
    state: Arc<Mutex<RamFlashState>>,
}

impl RamFlash {
    /// New device in the erased state
    pub fn new(sector_size: usize, sector_count: usize) -> Self {
        Self {
            sector_size,
            sector_count,
            state: Arc::new(Mutex::new(RamFlashState {
                bytes: vec![0xFF; sector_size * sector_count],
                erases: Vec::new(),
                fail_writes: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RamFlashState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sectors erased so far, in order
    pub fn erase_log(&self) -> Vec<usize> {
        self.lock().erases.clone()
    }

    pub fn set_write_failure(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn check_range(&self, addr: usize, len: usize) -> Result<(), String> {
        match addr.checked_add(len) {
            Some(end) if end <= self.capacity() => Ok(()),
            _ => Err(format!(
                "Flash access of {len} bytes at {addr:#x} exceeds capacity {:#x}",
                self.capacity()
            )),
        }
    }
}

impl FlashDevice for RamFlash {
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn sector_count(&self) -> usize {
        self.sector_count
    }

    fn erase_sector(&mut self, sector: usize) -> Result<(), String> {
        if sector >= self.sector_count {
            return Err(format!("Sector {sector} out of range"));
        }
        let start = sector * self.sector_size;
        let end = start + self.sector_size;
        let mut s = self.lock();
        s.bytes[start..end].fill(0xFF);
        s.erases.push(sector);
        Ok(())
    }

    fn write(&mut self, addr: usize, data: &[u8]) -> Result<(), String> {
        self.check_range(addr, data.len())?;
        let mut s = self.lock();
        if s.fail_writes {
            return Err(format!("Program error at {addr:#x}"));
        }
        let dest = &mut s.bytes[addr..addr + data.len()];
        if let Some(i) = dest.iter().zip(data).position(|(&old, &new)| old & new != new) {
            return Err(format!("Write to unerased flash at {:#x}", addr + i));
        }
        for (old, &new) in dest.iter_mut().zip(data) {
            *old &= new;
        }
        Ok(())
    }

    fn read(&mut self, addr: usize, buf: &mut [u8]) -> Result<(), String> {
        self.check_range(addr, buf.len())?;
        let s = self.lock();
        buf.copy_from_slice(&s.bytes[addr..addr + buf.len()]);
        Ok(())
    }
}
