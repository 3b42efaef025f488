//! Tuning of the camera's smoothing, momentum, and animation channels.
//!
//! These values were tuned by hand for feel. Changing them changes how the camera behaves; they are
//! not derivable from first principles.

use bevy_math::DVec2;
use bevy_reflect::Reflect;

/// Per-step blend and decay factors for every motion channel of a
/// [`Viewport`](super::component::Viewport).
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct MotionTuning {
    /// Exponential smoothing factor applied to the drag velocity on every drag sample. The
    /// smoothed velocity becomes the inertia when the drag is released.
    pub velocity_smoothing: f64,
    /// Inertia is multiplied by this every step.
    pub velocity_fade: f64,
    /// Maximum length of the inertia vector, in world units per step.
    pub velocity_max: f64,
    /// A drag that has not moved for this long (simulated milliseconds) loses its inertia, so
    /// lifting a finger that was held still does not fling the view.
    pub stationary_drag_ms: f64,
    /// How much of the desired pan is blended into the current pan each step.
    pub pan_blend: f64,
    /// Zoom animation decay while zooming in.
    pub zoom_in_fade: f64,
    /// Zoom animation decay while zooming out. Lower than `zoom_in_fade` so zooming out feels
    /// snappier.
    pub zoom_out_fade: f64,
    /// The zoom animation ends once the remaining gap is below this.
    pub zoom_epsilon: f64,
    /// Fraction of the remaining distance to a fly-to target covered per millisecond of step
    /// time. Capped at `1.0` per step.
    pub centering_rate: f64,
    /// Shake offset is multiplied by this every step.
    pub shake_fade: f64,
    /// Zoom multiplier of one mouse wheel notch at a sensitivity of `1.0` is `1 + wheel_zoom_step`.
    pub wheel_zoom_step: f64,
    /// Zoom multiplier requested by the keyboard zoom bindings.
    pub key_zoom_factor: f64,
    /// Keyboard movement per step is `min(width, height) / keyboard_reference_size * dt / zoom`.
    pub keyboard_reference_size: f64,
    /// Keyboard movement multiplier while the "faster" binding is held.
    pub fast_multiplier: f64,
    /// Width of the edge panning area as a fraction of the shorter surface side.
    pub edge_pan_fraction: f64,
    /// Edge panning speed in world units per millisecond at a zoom of `1.0`.
    pub edge_pan_speed: f64,
}

impl Default for MotionTuning {
    fn default() -> Self {
        Self {
            velocity_smoothing: 0.5,
            velocity_fade: 0.98,
            velocity_max: 20.0,
            stationary_drag_ms: 80.0,
            pan_blend: 0.06,
            zoom_in_fade: 0.94,
            zoom_out_fade: 0.9,
            zoom_epsilon: 1e-4,
            centering_rate: 0.008,
            shake_fade: 0.92,
            wheel_zoom_step: 0.15,
            key_zoom_factor: 1.2,
            keyboard_reference_size: 2048.0,
            fast_multiplier: 4.0,
            edge_pan_fraction: 0.015,
            edge_pan_speed: 0.5,
        }
    }
}

impl MotionTuning {
    /// Blend a new drag delta into the running drag velocity.
    pub fn smooth_velocity(&self, velocity: DVec2, delta: DVec2) -> DVec2 {
        velocity * self.velocity_smoothing + delta * (1.0 - self.velocity_smoothing)
    }

    /// Decay factor of one zoom animation step, picked by direction.
    pub fn zoom_fade(&self, current: f64, desired: f64) -> f64 {
        if current > desired {
            self.zoom_out_fade
        } else {
            self.zoom_in_fade
        }
    }

    /// Fraction of the remaining fly-to distance covered in a step of `dt_ms`.
    pub fn centering_fraction(&self, dt_ms: f64) -> f64 {
        (dt_ms * self.centering_rate).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_smoothing_halves() {
        let tuning = MotionTuning::default();
        let v = tuning.smooth_velocity(DVec2::new(10.0, 0.0), DVec2::new(0.0, 10.0));
        assert_eq!(v, DVec2::new(5.0, 5.0));
    }

    #[test]
    fn zooming_out_decays_faster() {
        let tuning = MotionTuning::default();
        assert_eq!(tuning.zoom_fade(2.0, 1.0), 0.9);
        assert_eq!(tuning.zoom_fade(1.0, 2.0), 0.94);
    }

    #[test]
    fn centering_fraction_is_capped() {
        let tuning = MotionTuning::default();
        assert!((tuning.centering_fraction(10.0) - 0.08).abs() < 1e-12);
        assert_eq!(tuning.centering_fraction(1000.0), 1.0);
    }
}
