//! Flash storage for profile frames.

mod ram;
mod stack;

pub use ram::RamFlash;
pub use stack::FlashStack;

/// Sector-erasable NOR flash.
///
/// Erasing sets every byte of a sector to `0xFF`; writing can only clear bits.
pub trait FlashDevice: Send {
    fn sector_size(&self) -> usize;
    fn sector_count(&self) -> usize;

    fn erase_sector(&mut self, sector: usize) -> Result<(), String>;
    fn write(&mut self, addr: usize, data: &[u8]) -> Result<(), String>;
    fn read(&mut self, addr: usize, buf: &mut [u8]) -> Result<(), String>;

    fn capacity(&self) -> usize {
        self.sector_size() * self.sector_count()
    }
}
