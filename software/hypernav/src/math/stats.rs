//! Accumulators for telemetry averaging and pixel window statistics.

/// Mean and standard deviation from a running sum and sum of squares.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStats {
    n: u32,
    sum: f64,
    sum_sq: f64,
}

impl RunningStats {
    pub fn push(&mut self, x: f64) {
        self.n += 1;
        self.sum += x;
        self.sum_sq += x * x;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn count(&self) -> u32 {
        self.n
    }

    pub fn mean(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        self.sum / self.n as f64
    }

    /// Population standard deviation
    pub fn std(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        let mean = self.mean();
        // Rounding can leave the variance slightly negative for constant input
        (self.sum_sq / self.n as f64 - mean * mean).max(0.0).sqrt()
    }
}

/// Mean and spread of angles in degrees, robust to the 0/360 wrap.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CircularStats {
    n: u32,
    sum_sin: f64,
    sum_cos: f64,
}

impl CircularStats {
    pub fn push(&mut self, deg: f64) {
        let (s, c) = deg.to_radians().sin_cos();
        self.n += 1;
        self.sum_sin += s;
        self.sum_cos += c;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn count(&self) -> u32 {
        self.n
    }

    /// Mean direction in [0, 360)
    pub fn mean(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        self.sum_sin.atan2(self.sum_cos).to_degrees().rem_euclid(360.0)
    }

    /// Circular standard deviation in degrees
    pub fn std(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        let n = self.n as f64;
        let r = ((self.sum_sin / n).powi(2) + (self.sum_cos / n).powi(2)).sqrt();
        (-2.0 * r.clamp(f64::MIN_POSITIVE, 1.0).ln()).sqrt().to_degrees()
    }
}

/// Summary of a window of pixel counts
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PixelStats {
    pub average: f64,
    pub stddev: f64,
    pub min: u16,
    pub max: u16,
}

impl PixelStats {
    pub fn from_pixels(pixels: &[u16]) -> Self {
        if pixels.is_empty() {
            return Self::default();
        }

        let mut stats = RunningStats::default();
        let mut min = u16::MAX;
        let mut max = u16::MIN;
        for &p in pixels {
            stats.push(p as f64);
            min = min.min(p);
            max = max.max(p);
        }

        Self {
            average: stats.mean(),
            stddev: stats.std(),
            min,
            max,
        }
    }
}
