//! Cooldown-gated event detection
//!
//! Blinks, nods and shakes are threshold crossings over a filtered signal.
//! After firing, a detector ignores further crossings for a fixed number of
//! frames so one gesture crossing the threshold on the way in and again on
//! the way out counts once.

use crate::config::ThresholdConfig;
use crate::filters::SlidingWindow;

/// Cooldown gate with a lifetime event counter.
///
/// Each update first ticks a running cooldown down, then evaluates the
/// trigger. Two triggers exactly `cooldown_frames` apart therefore both fire.
#[derive(Debug, Clone, PartialEq)]
pub struct CooldownGate {
    cooldown_frames: u32,
    remaining: u32,
    count: u32,
}

impl CooldownGate {
    pub fn new(cooldown_frames: u32) -> Self {
        Self {
            cooldown_frames,
            remaining: 0,
            count: 0,
        }
    }

    /// Advance one frame; returns whether the event fired
    pub fn update(&mut self, triggered: bool) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if triggered && self.remaining == 0 {
            self.remaining = self.cooldown_frames;
            self.count += 1;
            true
        } else {
            false
        }
    }

    /// Lifetime number of events fired
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Frames left before the gate can fire again
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

/// Blink detector over mean eye openness.
///
/// Also keeps a window of closed-eye frames, from which the blink rate is
/// estimated.
#[derive(Debug, Clone)]
pub struct BlinkDetector {
    threshold: f64,
    gate: CooldownGate,
    closed_window: SlidingWindow<bool>,
    rate_scale: f64,
}

impl BlinkDetector {
    /// `rate_scale` converts one closed frame in the window to blinks per minute
    pub fn new(config: &ThresholdConfig, window: usize, rate_scale: f64) -> Self {
        Self {
            threshold: config.threshold,
            gate: CooldownGate::new(config.cooldown_frames),
            closed_window: SlidingWindow::new(window),
            rate_scale,
        }
    }

    /// Feed the mean eye openness of one frame; returns whether a blink fired
    pub fn update(&mut self, mean_openness: f64) -> bool {
        let closed = mean_openness < self.threshold;
        self.closed_window.push(closed);
        self.gate.update(closed)
    }

    /// Estimated blinks per minute.
    ///
    /// Counts closed-eye frames in the window, so a blink spanning several
    /// frames weighs more than a single-frame one.
    pub fn blink_rate(&self) -> f64 {
        self.closed_window.count_true() as f64 * self.rate_scale
    }

    pub fn count(&self) -> u32 {
        self.gate.count()
    }
}

/// Nod or shake detector over the per-frame change of a smoothed head angle
#[derive(Debug, Clone)]
pub struct MotionDetector {
    threshold: f64,
    gate: CooldownGate,
    previous: f64,
}

impl MotionDetector {
    pub fn new(config: &ThresholdConfig) -> Self {
        Self {
            threshold: config.threshold,
            gate: CooldownGate::new(config.cooldown_frames),
            previous: 0.0,
        }
    }

    /// Feed the current smoothed value; returns whether a gesture fired
    pub fn update(&mut self, smoothed: f64) -> bool {
        let delta = smoothed - self.previous;
        self.previous = smoothed;
        self.gate.update(delta.abs() > self.threshold)
    }

    pub fn count(&self) -> u32 {
        self.gate.count()
    }
}
