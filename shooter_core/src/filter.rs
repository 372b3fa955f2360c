//! Fixed-capacity sliding-window average.
//!
//! The window length is a compile-time constant. Slots that have not been written yet
//! hold zero, so the average reads low until `N` samples have been pushed.

/// Window length of the measured-velocity filter.
pub const VELOCITY_FILTER_LEN: usize = 5;
/// Window length of the optional power-command filter.
pub const OUTPUT_FILTER_LEN: usize = 3;

/// Ring buffer of the last `N` samples with a running arithmetic mean.
#[derive(Debug, Clone)]
pub struct MovingAverage<const N: usize> {
    buf: [f64; N],
    cursor: usize,
}

impl<const N: usize> Default for MovingAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MovingAverage<N> {
    pub const fn new() -> Self {
        const { assert!(N > 0, "MovingAverage window must be non-empty") };
        Self {
            buf: [0.0; N],
            cursor: 0,
        }
    }

    /// Overwrite the oldest slot with `value` and return the mean of all `N` slots.
    pub fn push(&mut self, value: f64) -> f64 {
        self.buf[self.cursor] = value;
        self.cursor += 1;
        if self.cursor == N {
            self.cursor = 0;
        }
        self.average()
    }

    pub fn average(&self) -> f64 {
        self.buf.iter().sum::<f64>() / N as f64
    }

    /// Zero-fill the window and rewind the cursor.
    pub fn reset(&mut self) {
        self.buf = [0.0; N];
        self.cursor = 0;
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        false
    }
}
