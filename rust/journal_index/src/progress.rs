//! Progress reporting helpers.

/// Minimum advance between forwarded progress values.
const MIN_STEP: f64 = 0.01;

/// Forwards progress only after it advances by more than 1%.
///
/// Completion (`1.0`) is always forwarded.
pub struct ProgressThrottle<F> {
    on_progress: F,
    last: f64,
}

impl<F: FnMut(f64)> ProgressThrottle<F> {
    pub fn new(on_progress: F) -> Self {
        ProgressThrottle {
            on_progress,
            last: 0.0,
        }
    }

    pub fn report(&mut self, fraction: f64) {
        let done = fraction >= 1.0 && self.last < 1.0;
        if done || fraction - self.last > MIN_STEP {
            (self.on_progress)(fraction);
            self.last = fraction;
        }
    }
}

/// Fraction of `total` represented by `done`, clamped to `[0, 1]`.
///
/// An unknown or zero total reports 0 until the caller reports completion.
pub fn fraction(done: u64, total: Option<u64>) -> f64 {
    match total {
        Some(total) if total > 0 => (done as f64 / total as f64).clamp(0.0, 1.0),
        _ => 0.0,
    }
}
