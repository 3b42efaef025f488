//! Fixed timestep accumulation, decoupling camera smoothing from the render frame rate.

use bevy_log::prelude::*;
use bevy_reflect::Reflect;

/// Internal simulation rate of the camera, in steps per second.
pub const PHYSICS_RATE_HZ: f64 = 60.0 * 4.0;

/// Length of one simulation step in milliseconds.
pub const PHYSICS_STEP_MS: f64 = 1000.0 / PHYSICS_RATE_HZ;

/// Upper bound for the time a single frame may feed into the accumulator. After a stall (a
/// backgrounded window, a debugger pause) the camera resumes where it was instead of replaying
/// the whole gap.
pub const MAX_FRAME_MS: f64 = 33.0;

/// Accumulates wall clock time and hands it out in steps of [`PHYSICS_STEP_MS`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct FixedStep {
    bucket: f64,
}

impl FixedStep {
    /// Add `dt_ms` of elapsed time and return how many whole steps are now due. The remainder
    /// stays in the bucket for the next frame.
    pub fn accumulate(&mut self, dt_ms: f64) -> u32 {
        let dt_ms = if dt_ms.is_finite() {
            dt_ms.clamp(0.0, MAX_FRAME_MS)
        } else {
            warn!("Ignoring non-finite frame time {dt_ms}");
            0.0
        };
        self.bucket += dt_ms;

        let mut steps = 0;
        while self.bucket >= PHYSICS_STEP_MS {
            self.bucket -= PHYSICS_STEP_MS;
            steps += 1;
        }
        steps
    }

    /// Time waiting in the accumulator, always less than one step.
    pub fn bucket(&self) -> f64 {
        self.bucket
    }
}
