//! Temporal filters
//!
//! Exponential smoothing and fixed-capacity sliding windows, shared by every
//! signal the engine tracks.

use std::collections::VecDeque;

/// Exponential moving average: `smoothed = smoothed * (1 - α) + raw * α`.
///
/// Starts at zero, so early outputs lag toward zero until the filter warms up.
#[derive(Debug, Clone, PartialEq)]
pub struct Ema {
    alpha: f64,
    value: f64,
}

impl Ema {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, value: 0.0 }
    }

    /// Fold in a raw sample and return the new smoothed value
    pub fn update(&mut self, raw: f64) -> f64 {
        self.value = self.value * (1.0 - self.alpha) + raw * self.alpha;
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

/// A sample that can be averaged (booleans count as 0 or 1)
pub trait Sample: Copy {
    fn as_f64(self) -> f64;
}

impl Sample for f64 {
    fn as_f64(self) -> f64 {
        self
    }
}

impl Sample for bool {
    fn as_f64(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }
}

/// Fixed-capacity FIFO of recent samples
#[derive(Debug, Clone, PartialEq)]
pub struct SlidingWindow<T> {
    samples: VecDeque<T>,
    capacity: usize,
}

impl<T: Sample> SlidingWindow<T> {
    /// Create an empty window; a zero capacity is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::new(),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest once capacity is exceeded
    pub fn push(&mut self, sample: T) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Arithmetic mean of the window, 0 when empty
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|s| s.as_f64()).sum();
        sum / self.samples.len() as f64
    }

    pub fn most_recent(&self) -> Option<T> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl SlidingWindow<bool> {
    /// Number of `true` samples in the window
    pub fn count_true(&self) -> usize {
        self.samples.iter().filter(|&&s| s).count()
    }
}
