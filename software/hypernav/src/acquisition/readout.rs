//! Pixel rows read out of a spectrometer FIFO.

use hypernav_shared::{PIXEL_LEAD_IN, Side};

use crate::hardware::SpectrometerFifo;
use crate::hardware::retry::bounded_drain;
use crate::math::PixelStats;

/// Stray words drained past the expected row before giving up on alignment
pub const MAX_STRAY_PIXELS: usize = 99;

/// One readout: the words taken from the FIFO and the window holding
/// the valid pixels.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Readout {
    words: Vec<u16>,
    start: usize,
    pixel_count: usize,

    /// Stray words found beyond the expected row
    pub over: usize,

    /// The drain limit was reached or the row came up short
    pub overrun: bool,

    pub stats: PixelStats,
}

impl Readout {
    /// Valid pixels, after the lead-in and any stray words
    pub fn pixels(&self) -> &[u16] {
        let end = (self.start + self.pixel_count).min(self.words.len());
        &self.words[self.start.min(end)..end]
    }

    pub fn peak(&self) -> u16 {
        self.stats.max
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_count == 0
    }

    /// Discard `clearouts` rows, then read one row of `LEAD_IN + pixel_count`
    /// words plus up to [`MAX_STRAY_PIXELS`] stray words, shifting the pixel
    /// window past the strays. Reuses this readout's allocation.
    pub fn read_from(
        &mut self,
        fifo: &mut dyn SpectrometerFifo,
        side: Side,
        clearouts: u16,
        pixel_count: usize,
    ) {
        let row = PIXEL_LEAD_IN + pixel_count;
        self.words.clear();
        self.pixel_count = pixel_count;
        self.overrun = false;

        for _ in 0..clearouts as usize * row {
            if fifo.pop_pixel(side).is_none() {
                break;
            }
        }

        for _ in 0..row {
            match fifo.pop_pixel(side) {
                Some(w) => self.words.push(w),
                None => break,
            }
        }
        if self.words.len() < row {
            // Short row: keep the window length so frames stay well-formed
            self.overrun = true;
            self.words.resize(row, 0);
        }

        let words = &mut self.words;
        let drained = bounded_drain(MAX_STRAY_PIXELS, || match fifo.pop_pixel(side) {
            Some(w) => {
                words.push(w);
                true
            }
            None => false,
        });
        self.over = drained.attempts();
        self.overrun |= drained.is_exhausted();

        self.start = PIXEL_LEAD_IN + self.over;
        self.stats = PixelStats::from_pixels(self.pixels());
    }
}

/// Single-buffered dark and light readouts for one side
#[derive(Clone, Debug, Default)]
pub struct DarkLightBuffers {
    pub dark: Readout,
    pub light: Readout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::SimulatedBoard;

    fn capture(board: &SimulatedBoard, clearouts: u16) -> Readout {
        let mut spec = board.spectrometer();
        spec.set_power(Side::Port, true).unwrap();
        spec.start_capture(Side::Port, 20, clearouts, 1).unwrap();
        assert_eq!(spec.spectra_available(Side::Port), clearouts + 1);

        let mut r = Readout::default();
        r.read_from(spec.as_mut(), Side::Port, clearouts, 32);
        r
    }

    #[test]
    fn clean_row() {
        let board = SimulatedBoard::new(32);
        let r = capture(&board, 2);
        assert_eq!(r.over, 0);
        assert!(!r.overrun);
        assert_eq!(r.pixels().len(), 32);
        // Dark baseline, no lead-in zeros in the window
        assert!(r.pixels().iter().all(|&p| p >= 1_500));
    }

    #[test]
    fn stray_pixels_shift_window() {
        let board = SimulatedBoard::new(32);
        board.set_stray_pixels(Side::Port, 7);
        let r = capture(&board, 1);
        assert_eq!(r.over, 7);
        assert!(!r.overrun);
        assert_eq!(r.pixels().len(), 32);
        assert_eq!(r.stats.min, r.pixels().iter().copied().min().unwrap());
    }

    #[test]
    fn drain_limit_flags_overrun() {
        let board = SimulatedBoard::new(32);
        board.set_stray_pixels(Side::Port, 150);
        let r = capture(&board, 0);
        assert_eq!(r.over, MAX_STRAY_PIXELS);
        assert!(r.overrun);
        assert_eq!(r.pixels().len(), 32);
    }
}
