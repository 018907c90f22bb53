//! Append-only record stack over erasable flash sectors.
//!
//! Records are written back to back, each followed by its length as a
//! little-endian `u32`, so the stack can be unwound from the write pointer.
//! Sectors are erased just ahead of the write pointer as it advances.
//! The first pop makes the stack read-only until the next [`FlashStack::init`].

use tracing::debug;

use super::FlashDevice;

const LEN_BYTES: usize = 4;

pub struct FlashStack {
    device: Box<dyn FlashDevice>,

    /// Next free byte
    write_ptr: usize,

    /// First byte not yet erased this session
    erased_to: usize,

    count: usize,
    read_only: bool,
}

impl std::fmt::Debug for FlashStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashStack")
            .field("write_ptr", &self.write_ptr)
            .field("erased_to", &self.erased_to)
            .field("count", &self.count)
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl FlashStack {
    /// Wrap a device. The stack is read-only until [`FlashStack::init`].
    pub fn new(device: Box<dyn FlashDevice>) -> Self {
        Self {
            device,
            write_ptr: 0,
            erased_to: 0,
            count: 0,
            read_only: true,
        }
    }

    /// Discard all records and make the stack writable
    pub fn init(&mut self) -> Result<(), String> {
        self.write_ptr = 0;
        self.erased_to = 0;
        self.count = 0;
        self.read_only = false;
        self.erase_through(1)
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn frame_count(&self) -> usize {
        self.count
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn used_bytes(&self) -> usize {
        self.write_ptr
    }

    pub fn capacity(&self) -> usize {
        self.device.capacity()
    }

    /// Append one record
    pub fn add_frame(&mut self, record: &[u8]) -> Result<(), String> {
        if self.read_only {
            return Err("Flash stack is read-only until re-initialized".to_string());
        }
        let len = u32::try_from(record.len())
            .map_err(|_| format!("Record of {} bytes is too large", record.len()))?;
        let end = self.write_ptr + record.len() + LEN_BYTES;
        if end > self.capacity() {
            return Err(format!(
                "Flash stack full: {} of {} bytes used, record needs {}",
                self.write_ptr,
                self.capacity(),
                record.len() + LEN_BYTES
            ));
        }

        self.erase_through(end)?;
        self.device.write(self.write_ptr, record)?;
        self.device
            .write(self.write_ptr + record.len(), &len.to_le_bytes())?;

        self.write_ptr = end;
        self.count += 1;
        Ok(())
    }

    /// Pop the most recent record, or `None` once the stack is empty
    pub fn retrieve_frame(&mut self) -> Result<Option<Vec<u8>>, String> {
        self.read_only = true;
        if self.count == 0 {
            return Ok(None);
        }

        let len_addr = self
            .write_ptr
            .checked_sub(LEN_BYTES)
            .ok_or_else(|| "Flash stack pointer is inside a length field".to_string())?;
        let mut len_buf = [0_u8; LEN_BYTES];
        self.device.read(len_addr, &mut len_buf)?;
        let len = u32::from_le_bytes(len_buf) as usize;

        let start = len_addr
            .checked_sub(len)
            .ok_or_else(|| format!("Corrupt record length {len} at {len_addr:#x}"))?;
        let mut record = vec![0_u8; len];
        self.device.read(start, &mut record)?;

        self.write_ptr = start;
        self.count -= 1;
        Ok(Some(record))
    }

    /// Erase sectors until everything below `end` is erased
    fn erase_through(&mut self, end: usize) -> Result<(), String> {
        let sector_size = self.device.sector_size();
        while self.erased_to < end {
            let sector = self.erased_to / sector_size;
            self.device
                .erase_sector(sector)
                .map_err(|e| format!("Failed to erase flash sector {sector}: {e}"))?;
            debug!("Erased flash sector {sector}");
            self.erased_to = (sector + 1) * sector_size;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::RamFlash;

    fn stack(sector_size: usize, sectors: usize) -> (FlashStack, RamFlash) {
        let dev = RamFlash::new(sector_size, sectors);
        (FlashStack::new(Box::new(dev.clone())), dev)
    }

    #[test]
    fn pops_in_reverse_order() {
        let (mut s, _) = stack(64, 4);
        s.init().unwrap();
        for i in 0..5_u8 {
            s.add_frame(&vec![i; 3 + i as usize]).unwrap();
        }
        assert_eq!(s.frame_count(), 5);

        for i in (0..5_u8).rev() {
            assert_eq!(s.retrieve_frame().unwrap(), Some(vec![i; 3 + i as usize]));
        }
        assert!(s.is_empty());
        assert_eq!(s.retrieve_frame().unwrap(), None);
    }

    #[test]
    fn read_only_after_first_pop() {
        let (mut s, _) = stack(64, 4);
        assert!(s.add_frame(&[1]).is_err());

        s.init().unwrap();
        s.add_frame(&[1]).unwrap();
        s.add_frame(&[2]).unwrap();
        s.retrieve_frame().unwrap();
        assert!(s.is_read_only());
        assert!(s.add_frame(&[3]).is_err());

        s.init().unwrap();
        assert!(s.is_empty());
        s.add_frame(&[3]).unwrap();
    }

    #[test]
    fn erases_sectors_as_the_pointer_advances() {
        let (mut s, dev) = stack(32, 4);
        s.init().unwrap();
        assert_eq!(dev.erase_log(), [0]);

        // 20 + 4 bytes per record
        s.add_frame(&[0xAB; 20]).unwrap();
        assert_eq!(dev.erase_log(), [0]);
        s.add_frame(&[0xCD; 20]).unwrap();
        assert_eq!(dev.erase_log(), [0, 1]);
        s.add_frame(&[0xEF; 20]).unwrap();
        assert_eq!(dev.erase_log(), [0, 1, 2]);

        assert_eq!(s.retrieve_frame().unwrap(), Some(vec![0xEF; 20]));
    }

    #[test]
    fn full_stack_rejects_record() {
        let (mut s, _) = stack(16, 2);
        s.init().unwrap();
        s.add_frame(&[0; 20]).unwrap();
        assert!(s.add_frame(&[0; 8]).is_err());
        assert_eq!(s.frame_count(), 1);
    }

    #[test]
    fn stale_contents_do_not_break_rewrites() {
        let (mut s, _) = stack(32, 2);
        s.init().unwrap();
        s.add_frame(&[0x00; 40]).unwrap();
        s.retrieve_frame().unwrap();

        // Re-init erases again before writing over the old record
        s.init().unwrap();
        s.add_frame(&[0xFF; 40]).unwrap();
        assert_eq!(s.retrieve_frame().unwrap(), Some(vec![0xFF; 40]));
    }
}
