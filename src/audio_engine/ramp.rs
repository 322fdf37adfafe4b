//! Stepped linear gain ramps driven by the control-side timer.

use std::time::Duration;

/// A linear gain ramp sampled at a fixed step rate.
///
/// A ramp of duration `d` runs `max(1, round(d * steps_per_second))` evenly spaced steps, so
/// it reaches its target after `d`. Each call to [`GainRamp::advance`] consumes the elapsed
/// time in whole steps and reports the new gain, carrying any remainder into the next call.
#[derive(Debug, Clone, PartialEq)]
pub struct GainRamp {
    from: f32,
    to: f32,
    total_steps: u32,
    step: u32,
    step_interval: Duration,
    carry: Duration,
    cancelled: bool,
}

impl GainRamp {
    pub fn new(from: f32, to: f32, duration: Duration, steps_per_second: u32) -> Self {
        let total_steps = (duration.as_secs_f64() * f64::from(steps_per_second.max(1)))
            .round()
            .max(1.0) as u32;

        Self {
            from,
            to,
            total_steps,
            step: 0,
            step_interval: duration / total_steps,
            carry: Duration::ZERO,
            cancelled: false,
        }
    }

    pub fn target(&self) -> f32 {
        self.to
    }

    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    /// Gain at the current step.
    pub fn current(&self) -> f32 {
        let t = self.step as f32 / self.total_steps as f32;
        self.from + (self.to - self.from) * t
    }

    /// Advances by `elapsed`. Returns the new gain when at least one step was taken.
    pub fn advance(&mut self, elapsed: Duration) -> Option<f32> {
        if self.is_done() {
            return None;
        }

        self.carry += elapsed;
        let mut stepped = false;
        while self.carry >= self.step_interval && self.step < self.total_steps {
            self.carry -= self.step_interval;
            self.step += 1;
            stepped = true;
        }

        stepped.then(|| self.current())
    }

    /// Reached the target, or was cancelled.
    pub fn is_done(&self) -> bool {
        self.cancelled || self.step >= self.total_steps
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Stops the ramp where it is. Calling it again has no effect.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }
}
