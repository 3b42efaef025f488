//! The primary [`Component`] of the controller, [`Viewport`].

use std::fmt::Debug;

use bevy_ecs::prelude::*;
use bevy_input::{keyboard::KeyCode, ButtonInput};
use bevy_log::prelude::*;
use bevy_math::DVec2;
use bevy_reflect::prelude::*;
use bevy_render::camera::Projection;
use bevy_time::prelude::*;
use bevy_transform::prelude::*;
use bevy_window::{PrimaryWindow, Window};
use rand::Rng;

use super::{
    integrator::{FixedStep, PHYSICS_STEP_MS},
    keys::{BoundKeys, HeldKeys, KeyBindings, MovementKeys},
    momentum::MotionTuning,
    motion::{Gesture, UserInteraction},
    projection::{RenderTransform, View, WorldRect},
    snapshot::{SnapshotError, ViewportSnapshot},
    zoom::ZoomLimits,
};
use crate::input::{GestureSink, ViewportInput};

/// Pinches whose previous finger distance is below this many pixels only pan; the zoom ratio would
/// be meaningless.
const MIN_PINCH_DISTANCE: f64 = 1e-3;

/// User preferences that shape how input moves the camera.
#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct NavigationSettings {
    /// Scales keyboard and edge panning speed.
    pub movement_speed: f64,
    /// Scales the zoom change of a mouse wheel notch.
    pub wheel_sensitivity: f64,
    /// When true, wheel zoom keeps the world point under the cursor fixed. Otherwise it zooms about
    /// the screen center.
    pub zoom_to_cursor: bool,
    /// Pan when the mouse rests near an edge of the surface.
    pub edge_pan: bool,
    /// If set, the camera center never leaves this area.
    pub bounds: Option<WorldRect>,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            movement_speed: 1.0,
            wheel_sensitivity: 1.0,
            zoom_to_cursor: true,
            edge_pan: false,
            bounds: None,
        }
    }
}

/// A 2D camera over an unbounded world: a zoom factor and the world point shown at the center of
/// the screen, driven by user gestures, keyboard navigation and programmatic animations.
///
/// # Moving the camera
///
/// Gestures reach the viewport through its [`GestureSink`] implementation, normally called by the
/// [`ViewportInput`] component. Programmatic motion is requested with
/// [`Viewport::set_desired_center`], [`Viewport::request_zoom`], [`Viewport::set_pan`] and
/// [`Viewport::add_screen_shake`].
///
/// All smoothing happens in [`Viewport::update`], which advances every motion channel in fixed
/// steps. When used through the plugins, this is called once per frame.
///
/// # Invariants
///
/// After any method returns, the zoom level is inside the bounds of [`Viewport::zoom_limits`], and
/// zoom and center are finite. Inputs that would break this are rejected and the previous value
/// is kept.
#[derive(Debug, Clone, Component)]
#[require(ViewportInput)]
pub struct Viewport {
    /// Input preferences.
    pub settings: NavigationSettings,
    /// Blend and decay factors of every motion channel.
    pub tuning: MotionTuning,
    /// Zoom bounds, supplied by the platform.
    pub zoom_limits: ZoomLimits,
    zoom_level: f64,
    center: DVec2,
    surface: DVec2,
    shake: DVec2,
    current_pan: DVec2,
    desired_pan: DVec2,
    desired_center: Option<DVec2>,
    desired_zoom: Option<f64>,
    inertia: DVec2,
    keyboard_force: DVec2,
    gesture: Gesture,
    did_move_since_touch_start: bool,
    pointer: Option<DVec2>,
    integrator: FixedStep,
    sim_time_ms: f64,
    interactions: Vec<UserInteraction>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            settings: Default::default(),
            tuning: Default::default(),
            zoom_limits: Default::default(),
            zoom_level: 1.0,
            center: DVec2::ZERO,
            surface: DVec2::ZERO,
            shake: DVec2::ZERO,
            current_pan: DVec2::ZERO,
            desired_pan: DVec2::ZERO,
            desired_center: None,
            desired_zoom: None,
            inertia: DVec2::ZERO,
            keyboard_force: DVec2::ZERO,
            gesture: Gesture::Idle,
            did_move_since_touch_start: false,
            pointer: None,
            integrator: FixedStep::default(),
            sim_time_ms: 0.0,
            interactions: Vec::new(),
        }
    }
}

impl Viewport {
    /// Create a viewport looking at `center` with the given zoom, clamped to the default limits.
    pub fn new(center: DVec2, zoom_level: f64) -> Self {
        let mut viewport = Self::default();
        viewport.set_center(center);
        viewport.set_zoom_level(zoom_level);
        viewport
    }

    /// Set the render surface size the viewport maps onto.
    pub fn with_surface_size(mut self, surface: DVec2) -> Self {
        self.set_surface_size(surface);
        self
    }

    /// Replace the zoom limits, re-clamping the current zoom.
    pub fn with_zoom_limits(mut self, zoom_limits: ZoomLimits) -> Self {
        self.zoom_limits = zoom_limits;
        self.clamp_zoom();
        self
    }

    /// Replace the navigation settings, re-clamping the center into any new bounds.
    pub fn with_settings(mut self, settings: NavigationSettings) -> Self {
        self.settings = settings;
        self.set_center(self.center);
        self
    }

    /// Replace the motion tuning.
    pub fn with_tuning(mut self, tuning: MotionTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Current zoom factor. `2.0` draws the world at double size.
    pub fn zoom_level(&self) -> f64 {
        self.zoom_level
    }

    /// The world point shown at the center of the surface.
    pub fn center(&self) -> DVec2 {
        self.center
    }

    /// The render surface size in logical pixels.
    pub fn surface_size(&self) -> DVec2 {
        self.surface
    }

    /// The decaying shake offset, before scaling by zoom.
    pub fn shake(&self) -> DVec2 {
        self.shake
    }

    /// The smoothed programmatic pan velocity.
    pub fn current_pan(&self) -> DVec2 {
        self.current_pan
    }

    /// The programmatic pan velocity being blended towards.
    pub fn desired_pan(&self) -> DVec2 {
        self.desired_pan
    }

    /// The target of the running fly-to animation, if any.
    pub fn desired_center(&self) -> Option<DVec2> {
        self.desired_center
    }

    /// The target of the running zoom animation, if any.
    pub fn desired_zoom(&self) -> Option<f64> {
        self.desired_zoom
    }

    /// Velocity carried over from the last drag or pinch, in world units per step.
    pub fn inertia(&self) -> DVec2 {
        self.inertia
    }

    /// The keyboard direction applied during the last step.
    pub fn keyboard_force(&self) -> DVec2 {
        self.keyboard_force
    }

    /// What the user is doing to the camera right now.
    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    /// Is a single pointer dragging the view?
    pub fn is_dragging(&self) -> bool {
        self.gesture.is_dragging()
    }

    /// Are two fingers pinching?
    pub fn is_pinching(&self) -> bool {
        self.gesture.is_pinching()
    }

    /// Did the current or last drag move the view? Distinguishes a tap from a drag. Reset when the
    /// next drag starts.
    pub fn did_move_since_touch_start(&self) -> bool {
        self.did_move_since_touch_start
    }

    /// Time waiting in the fixed step accumulator.
    pub fn time_bucket(&self) -> f64 {
        self.integrator.bucket()
    }

    /// Is any programmatic or inertial motion still running?
    pub fn is_animating(&self) -> bool {
        self.desired_center.is_some()
            || self.desired_zoom.is_some()
            || self.inertia != DVec2::ZERO
            || self.desired_pan != DVec2::ZERO
            || self.current_pan != DVec2::ZERO
            || self.shake != DVec2::ZERO
    }

    /// The mapping state of this viewport.
    pub fn view(&self) -> View {
        View {
            zoom: self.zoom_level,
            center: self.center,
            surface: self.surface,
            shake: self.shake,
        }
    }

    /// Map a screen position to the world point drawn there.
    pub fn screen_to_world(&self, screen: DVec2) -> DVec2 {
        self.view().screen_to_world(screen)
    }

    /// Map a world point to where it is drawn on screen.
    pub fn world_to_screen(&self, world: DVec2) -> DVec2 {
        self.view().world_to_screen(world)
    }

    /// The visible world area, rounded outward for culling.
    pub fn visible_rect(&self) -> WorldRect {
        self.view().visible_rect()
    }

    /// Scale and translation a renderer applies to world coordinates.
    pub fn render_transform(&self) -> RenderTransform {
        self.view().render_transform()
    }

    /// Is `point` inside the visible rect?
    pub fn is_world_point_visible(&self, point: DVec2) -> bool {
        self.visible_rect().contains(point)
    }

    /// Does `rect` overlap the visible rect?
    pub fn is_world_rect_visible(&self, rect: &WorldRect) -> bool {
        self.visible_rect().intersects(rect)
    }

    /// Update the size of the render surface, in logical pixels.
    pub fn set_surface_size(&mut self, surface: DVec2) {
        if !surface.is_finite() || surface.min_element() < 0.0 {
            warn!("Ignoring invalid surface size {surface}");
            return;
        }
        self.surface = surface;
    }

    /// Move the camera immediately, without animation.
    pub fn set_center(&mut self, center: DVec2) {
        self.commit_center(center, "set_center");
    }

    /// Zoom immediately, without animation. Cancels any zoom animation.
    pub fn set_zoom_level(&mut self, zoom_level: f64) {
        if self.commit_zoom(zoom_level, "set_zoom_level") {
            self.desired_zoom = None;
        }
    }

    /// Start flying the camera to `target`. Ends any drag in progress, so the animation is not
    /// fought by stale pointer input.
    pub fn set_desired_center(&mut self, target: DVec2) {
        if !target.is_finite() {
            warn!("Ignoring non-finite fly-to target {target}");
            return;
        }
        let target = match &self.settings.bounds {
            Some(bounds) => bounds.clamp_point(target),
            None => target,
        };
        self.desired_center = Some(target);
        if self.gesture.is_dragging() {
            self.gesture = Gesture::Idle;
        }
    }

    /// Continuously pan with `velocity`, in screen pixels per millisecond. Pass zero to stop.
    pub fn set_pan(&mut self, velocity: DVec2) {
        if !velocity.is_finite() {
            warn!("Ignoring non-finite pan velocity {velocity}");
            return;
        }
        self.desired_pan = velocity;
    }

    /// Start a zoom animation towards `zoom_level`, clamped to the zoom limits.
    pub fn request_zoom(&mut self, zoom_level: f64) {
        if !zoom_level.is_finite() || zoom_level <= 0.0 {
            warn!("Ignoring invalid zoom request {zoom_level}");
            return;
        }
        self.desired_zoom = Some(self.zoom_limits.clamp(zoom_level));
    }

    /// Animate one keyboard zoom step closer. Repeated calls compound.
    pub fn zoom_in(&mut self) {
        let from = self.desired_zoom.unwrap_or(self.zoom_level);
        self.request_zoom(from * self.tuning.key_zoom_factor);
    }

    /// Animate one keyboard zoom step farther. Repeated calls compound.
    pub fn zoom_out(&mut self) {
        let from = self.desired_zoom.unwrap_or(self.zoom_level);
        self.request_zoom(from / self.tuning.key_zoom_factor);
    }

    /// Stop fly-to, zoom and pan animations, and drop any inertia.
    pub fn stop_animations(&mut self) {
        self.desired_center = None;
        self.desired_zoom = None;
        self.desired_pan = DVec2::ZERO;
        self.current_pan = DVec2::ZERO;
        self.inertia = DVec2::ZERO;
    }

    /// Kick the view with a random offset of up to `amount`. Repeated shakes add up with
    /// diminishing effect.
    pub fn add_screen_shake(&mut self, amount: f64) {
        self.add_screen_shake_with(&mut rand::thread_rng(), amount);
    }

    /// See [`Viewport::add_screen_shake`].
    pub fn add_screen_shake_with(&mut self, rng: &mut impl Rng, amount: f64) {
        if !amount.is_finite() {
            warn!("Ignoring non-finite shake amount {amount}");
            return;
        }
        let scale = 1.0 / (1.0 + 3.0 * self.shake.length());
        let jitter = DVec2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0));
        self.shake += jitter * scale * amount;
    }

    /// Take the user interaction notifications recorded since the last call.
    pub fn drain_interactions(&mut self) -> std::vec::Drain<'_, UserInteraction> {
        self.interactions.drain(..)
    }

    /// The persisted part of this viewport.
    pub fn snapshot(&self) -> ViewportSnapshot {
        ViewportSnapshot::new(self.zoom_level, self.center)
    }

    /// Restore zoom and center from a save. Running animations are stopped.
    pub fn restore(&mut self, snapshot: &ViewportSnapshot) -> Result<(), SnapshotError> {
        snapshot.validate()?;
        self.stop_animations();
        self.set_center(snapshot.center());
        self.set_zoom_level(snapshot.zoom_level);
        Ok(())
    }

    /// Advance the camera by `dt_ms` milliseconds of wall clock time.
    ///
    /// Time is consumed in fixed steps of [`PHYSICS_STEP_MS`]; leftovers carry over to the next
    /// call. `keys` is queried once per step.
    pub fn update(&mut self, dt_ms: f64, keys: &impl MovementKeys) {
        let steps = self.integrator.accumulate(dt_ms);
        for _ in 0..steps {
            self.step(PHYSICS_STEP_MS, keys);
        }
        self.clamp_zoom();
    }

    /// Advance every channel by one fixed step. The order is part of the behavior.
    fn step(&mut self, dt_ms: f64, keys: &impl MovementKeys) {
        self.sim_time_ms += dt_ms;
        self.update_shake();
        self.update_inertia();
        self.update_pan(dt_ms);
        self.update_edge_pan(dt_ms);
        self.update_zoom();
        self.update_centering(dt_ms);
        self.update_keyboard(dt_ms, keys);
    }

    fn update_shake(&mut self) {
        self.shake *= self.tuning.shake_fade;
        if self.shake.length_squared() < 1e-12 {
            self.shake = DVec2::ZERO;
        }
    }

    fn update_inertia(&mut self) {
        // A finger held still before release should not fling the view.
        if let Some(last_moved_at) = self.gesture.last_moved_at() {
            if self.sim_time_ms - last_moved_at > self.tuning.stationary_drag_ms {
                self.inertia = DVec2::ZERO;
            }
        }

        if self.gesture.is_user_controlled() {
            return;
        }
        self.inertia *= self.tuning.velocity_fade;
        self.inertia = self.inertia.clamp_length_max(self.tuning.velocity_max);
        if self.inertia.length_squared() < 1e-12 {
            self.inertia = DVec2::ZERO;
            return;
        }
        let strength = self.zoom_limits.touch_pan_strength();
        self.commit_center(self.center + self.inertia * strength, "inertia");
    }

    fn update_pan(&mut self, dt_ms: f64) {
        self.current_pan = self
            .current_pan
            .lerp(self.desired_pan, self.tuning.pan_blend);
        if self.desired_pan == DVec2::ZERO && self.current_pan.length_squared() < 1e-12 {
            self.current_pan = DVec2::ZERO;
            return;
        }
        let offset = self.current_pan * dt_ms / self.zoom_level;
        self.commit_center(self.center + offset, "pan");
    }

    fn update_edge_pan(&mut self, dt_ms: f64) {
        if !self.settings.edge_pan
            || self.desired_center.is_some()
            || self.desired_zoom.is_some()
            || self.gesture.is_user_controlled()
        {
            return;
        }
        let Some(pointer) = self.pointer else {
            return;
        };
        let surface = self.surface;
        if pointer.cmplt(DVec2::ZERO).any() || pointer.cmpgt(surface).any() {
            return;
        }

        let area = surface.min_element() * self.tuning.edge_pan_fraction;
        let mut direction = DVec2::ZERO;
        if pointer.x < area {
            direction.x -= 1.0;
        }
        if pointer.x > surface.x - area {
            direction.x += 1.0;
        }
        if pointer.y < area {
            direction.y -= 1.0;
        }
        if pointer.y > surface.y - area {
            direction.y += 1.0;
        }
        if direction == DVec2::ZERO {
            return;
        }
        let speed = self.tuning.edge_pan_speed * dt_ms / self.zoom_level
            * self.settings.movement_speed;
        self.commit_center(self.center + direction * speed, "edge pan");
    }

    fn update_zoom(&mut self) {
        if self.gesture.is_pinching() {
            return;
        }
        let Some(desired) = self.desired_zoom else {
            return;
        };
        let gap = self.zoom_level - desired;
        if gap.abs() > self.tuning.zoom_epsilon {
            let fade = self.tuning.zoom_fade(self.zoom_level, desired);
            self.commit_zoom(self.zoom_level * fade + desired * (1.0 - fade), "zoom animation");
        } else {
            self.commit_zoom(desired, "zoom animation");
            self.desired_zoom = None;
        }
    }

    fn update_centering(&mut self, dt_ms: f64) {
        if self.gesture.is_dragging() {
            return;
        }
        let Some(target) = self.desired_center else {
            return;
        };
        let remaining = target - self.center;
        if remaining.length() > self.zoom_level.recip() {
            let movement = remaining * self.tuning.centering_fraction(dt_ms);
            self.commit_center(self.center + movement, "fly-to");
        } else {
            self.desired_center = None;
        }
    }

    fn update_keyboard(&mut self, dt_ms: f64, keys: &impl MovementKeys) {
        if self.gesture.is_dragging() || self.desired_center.is_some() {
            self.keyboard_force = DVec2::ZERO;
            return;
        }
        self.keyboard_force = keys.force();
        if self.keyboard_force == DVec2::ZERO {
            return;
        }
        let amount = self.surface.min_element() / self.tuning.keyboard_reference_size * dt_ms
            / self.zoom_level;
        let speed = self.settings.movement_speed
            * if keys.is_fast() {
                self.tuning.fast_multiplier
            } else {
                1.0
            };
        self.commit_center(
            self.center + self.keyboard_force * amount * speed,
            "keyboard",
        );
    }

    /// Re-apply the zoom limits to the zoom level and any running zoom animation.
    pub fn clamp_zoom(&mut self) {
        self.commit_zoom(self.zoom_level, "clamp");
        self.desired_zoom = self.desired_zoom.map(|zoom| self.zoom_limits.clamp(zoom));
    }

    /// Store `candidate` as the new center if it is finite, keeping it inside the configured
    /// bounds. Returns false when the candidate was rejected.
    fn commit_center(&mut self, candidate: DVec2, source: &str) -> bool {
        if !candidate.is_finite() {
            reject(source, "center", candidate);
            return false;
        }
        self.center = match &self.settings.bounds {
            Some(bounds) => bounds.clamp_point(candidate),
            None => candidate,
        };
        true
    }

    /// Store `candidate`, clamped to the zoom limits, as the new zoom level if it is finite and
    /// positive. Returns false when the candidate was rejected.
    fn commit_zoom(&mut self, candidate: f64, source: &str) -> bool {
        let candidate = self.zoom_limits.clamp(candidate);
        if !candidate.is_finite() || candidate <= 0.0 {
            reject(source, "zoom", candidate);
            return false;
        }
        self.zoom_level = candidate;
        true
    }

    /// Copy the primary window size into every viewport and advance them by the frame time.
    pub fn update_viewports(
        mut cameras: Query<&mut Viewport>,
        windows: Query<&Window, With<PrimaryWindow>>,
        keyboard: Option<Res<ButtonInput<KeyCode>>>,
        bindings: Res<KeyBindings>,
        time: Res<Time>,
    ) {
        let surface = windows
            .iter()
            .next()
            .map(|window| DVec2::new(window.width() as f64, window.height() as f64));
        let dt_ms = time.delta().as_secs_f64() * 1000.0;

        for mut viewport in cameras.iter_mut() {
            if let Some(surface) = surface {
                viewport.set_surface_size(surface);
            }
            match keyboard.as_deref() {
                Some(input) => viewport.update(
                    dt_ms,
                    &BoundKeys {
                        bindings: &bindings,
                        input,
                    },
                ),
                None => viewport.update(dt_ms, &HeldKeys::default()),
            }
        }
    }

    /// Write each viewport's view into its camera's [`Transform`] and orthographic [`Projection`].
    ///
    /// World space is y-down while Bevy is y-up, so y is mirrored. The projection scale is the
    /// inverse of the zoom level, which assumes the default window-size scaling mode.
    pub fn sync_camera_transforms(
        mut cameras: Query<(&Viewport, &mut Transform, Option<&mut Projection>)>,
    ) {
        for (viewport, mut transform, projection) in cameras.iter_mut() {
            let focus = viewport.view().world_rect().center();
            transform.translation.x = focus.x as f32;
            transform.translation.y = -focus.y as f32;

            let Some(mut projection) = projection else {
                continue;
            };
            match &mut *projection {
                Projection::Orthographic(ortho) => {
                    ortho.scale = viewport.zoom_level.recip() as f32;
                }
                _ => {
                    warn_once!("Viewport cameras need an orthographic projection.");
                }
            }
        }
    }
}

fn reject(source: &str, what: &str, value: impl Debug) {
    #[cfg(debug_assertions)]
    error!("Rejected invalid {what} {value:?} from {source}");
    #[cfg(not(debug_assertions))]
    let _ = (source, what, value);
}

impl GestureSink for Viewport {
    fn on_drag_start(&mut self, position: DVec2) {
        if !position.is_finite() {
            warn!("Ignoring drag start at non-finite position {position}");
            return;
        }
        self.inertia = DVec2::ZERO;
        self.desired_center = None;
        self.did_move_since_touch_start = false;
        self.gesture = Gesture::Dragging {
            last_position: position,
            last_moved_at: self.sim_time_ms,
        };
    }

    fn on_drag_move(&mut self, position: DVec2) {
        let Gesture::Dragging {
            last_position,
            last_moved_at,
        } = self.gesture
        else {
            return;
        };
        if !position.is_finite() {
            warn!("Ignoring drag sample at non-finite position {position}");
            return;
        }

        let delta = (last_position - position) / self.zoom_level;
        if !self.commit_center(self.center + delta, "drag") {
            return;
        }
        let moved = delta != DVec2::ZERO;
        self.inertia = self.tuning.smooth_velocity(self.inertia, delta);
        self.did_move_since_touch_start |= moved;
        self.gesture = Gesture::Dragging {
            last_position: position,
            last_moved_at: if moved {
                self.sim_time_ms
            } else {
                last_moved_at
            },
        };
        self.desired_center = None;
        self.interactions.push(UserInteraction::Move);
    }

    fn on_drag_end(&mut self, _position: DVec2) {
        if self.gesture.is_user_controlled() {
            self.gesture = Gesture::Idle;
            self.interactions.push(UserInteraction::Release);
        }
    }

    fn on_pinch_start(&mut self, positions: [DVec2; 2]) {
        if !positions.iter().all(|p| p.is_finite()) {
            warn!("Ignoring pinch start at non-finite positions {positions:?}");
            return;
        }
        self.inertia = DVec2::ZERO;
        self.desired_center = None;
        self.desired_zoom = None;
        self.gesture = Gesture::Pinching {
            last_positions: positions,
            last_moved_at: self.sim_time_ms,
        };
    }

    fn on_pinch_move(&mut self, positions: [DVec2; 2]) {
        let Gesture::Pinching {
            last_positions,
            last_moved_at,
        } = self.gesture
        else {
            return;
        };
        if !positions.iter().all(|p| p.is_finite()) {
            warn!("Ignoring pinch sample at non-finite positions {positions:?}");
            return;
        }

        let last_distance = last_positions[0].distance(last_positions[1]);
        let distance = positions[0].distance(positions[1]);
        let last_midpoint = (last_positions[0] + last_positions[1]) / 2.0;
        let midpoint = (positions[0] + positions[1]) / 2.0;

        let previous_zoom = self.zoom_level;
        let pan = (last_midpoint - midpoint) / previous_zoom;
        let panned = self.center + pan;
        if last_distance >= MIN_PINCH_DISTANCE {
            self.commit_zoom(previous_zoom * distance / last_distance, "pinch");
        }

        // Keep the world point under the midpoint where it is on screen.
        let pivot = midpoint - self.surface / 2.0;
        let correction = pivot * (previous_zoom.recip() - self.zoom_level.recip());
        if self.commit_center(panned + correction, "pinch") {
            self.inertia = self.tuning.smooth_velocity(self.inertia, pan);
        }

        let moved = positions != last_positions;
        self.gesture = Gesture::Pinching {
            last_positions: positions,
            last_moved_at: if moved {
                self.sim_time_ms
            } else {
                last_moved_at
            },
        };
        self.desired_zoom = None;
        self.interactions.push(UserInteraction::Move);
    }

    fn on_pinch_end(&mut self) {
        if self.gesture.is_user_controlled() {
            self.gesture = Gesture::Idle;
            self.interactions.push(UserInteraction::Release);
        }
    }

    fn on_wheel(&mut self, amount: f64, position: Option<DVec2>) {
        if !amount.is_finite() || amount == 0.0 {
            return;
        }
        let step = 1.0 + self.tuning.wheel_zoom_step * self.settings.wheel_sensitivity;
        let factor = step.powf(amount);

        let previous_zoom = self.zoom_level;
        if !self.commit_zoom(previous_zoom * factor, "wheel") {
            return;
        }
        self.desired_zoom = None;
        self.interactions.push(UserInteraction::Move);

        if !self.settings.zoom_to_cursor {
            return;
        }
        let Some(anchor) = position.or(self.pointer).filter(|p| p.is_finite()) else {
            return;
        };
        let pivot = anchor - self.surface / 2.0;
        let correction = pivot * (previous_zoom.recip() - self.zoom_level.recip());
        self.commit_center(self.center + correction, "wheel");
        self.desired_center = None;
    }

    fn on_hover(&mut self, position: DVec2) {
        if position.is_finite() {
            self.pointer = Some(position);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::controller::{
        integrator::MAX_FRAME_MS,
        zoom::{PlatformCapabilities, StaticCapabilities},
    };

    const NO_KEYS: HeldKeys = HeldKeys {
        up: false,
        down: false,
        left: false,
        right: false,
        fast: false,
    };

    fn viewport() -> Viewport {
        Viewport::default().with_surface_size(DVec2::new(800.0, 600.0))
    }

    fn settle(viewport: &mut Viewport, keys: &HeldKeys, frames: usize) {
        for _ in 0..frames {
            viewport.update(16.0, keys);
        }
    }

    fn assert_close(a: f64, b: f64, tolerance: f64) {
        assert!((a - b).abs() <= tolerance, "{a} != {b} (tolerance {tolerance})");
    }

    #[test]
    fn fly_to_progresses_without_overshoot_then_converges() {
        let mut viewport = viewport();
        let target = DVec2::new(100.0, 0.0);
        viewport.set_desired_center(target);

        viewport.update(1000.0, &NO_KEYS);
        let x = viewport.center().x;
        assert!(x > 0.0 && x < 100.0, "center.x = {x}");
        assert!(viewport.desired_center().is_some());

        let mut frames = 0;
        while viewport.desired_center().is_some() {
            viewport.update(MAX_FRAME_MS, &NO_KEYS);
            frames += 1;
            assert!(frames < 1000, "fly-to never finished");
            assert!(viewport.center().x <= 100.0);
        }
        let tolerance = viewport.zoom_level().recip();
        assert!(viewport.center().distance(target) <= tolerance);
        assert_close(viewport.center().x, 100.0, 1.0);
    }

    #[test]
    fn zoom_animation_converges_to_clamped_target() {
        let mut viewport = viewport();
        viewport.request_zoom(50.0);
        let max = StaticCapabilities::default().maximum_zoom();
        assert_eq!(viewport.desired_zoom(), Some(max));

        let mut frames = 0;
        while viewport.desired_zoom().is_some() {
            viewport.update(16.0, &NO_KEYS);
            assert!(viewport.zoom_limits.contains(viewport.zoom_level()));
            frames += 1;
            assert!(frames < 10_000, "zoom animation never finished");
        }
        assert_close(viewport.zoom_level(), max, 1e-4);
    }

    #[test]
    fn zooming_out_is_faster_than_zooming_in() {
        let mut zoom_in = viewport();
        zoom_in.request_zoom(2.0);
        let mut zoom_out = Viewport::new(DVec2::ZERO, 2.0).with_surface_size(DVec2::splat(100.0));
        zoom_out.request_zoom(1.0);

        zoom_in.update(PHYSICS_STEP_MS, &NO_KEYS);
        zoom_out.update(PHYSICS_STEP_MS, &NO_KEYS);
        let progress_in = zoom_in.zoom_level() - 1.0;
        let progress_out = 2.0 - zoom_out.zoom_level();
        assert_close(progress_in, 0.06, 1e-9);
        assert_close(progress_out, 0.1, 1e-9);
    }

    #[test]
    fn zoom_stays_in_bounds_under_any_update() {
        let mut viewport = viewport();
        for (i, dt) in [0.0, 3.0, 16.0, 33.0, 1000.0, 4.2].into_iter().cycle().take(60).enumerate() {
            if i % 7 == 0 {
                viewport.request_zoom(if i % 2 == 0 { 1e6 } else { 1e-6 });
            }
            viewport.on_wheel(if i % 3 == 0 { 1.0 } else { -1.0 }, None);
            viewport.update(dt, &NO_KEYS);
            assert!(viewport.zoom_limits.contains(viewport.zoom_level()));
            assert!(viewport.time_bucket() < PHYSICS_STEP_MS);
        }
    }

    #[test]
    fn drag_start_cancels_fly_to() {
        let mut viewport = viewport();
        viewport.set_desired_center(DVec2::new(500.0, 500.0));
        viewport.update(16.0, &NO_KEYS);
        viewport.on_drag_start(DVec2::new(10.0, 10.0));
        assert_eq!(viewport.desired_center(), None);
        assert!(viewport.is_dragging());
    }

    #[test]
    fn fly_to_cancels_drag() {
        let mut viewport = viewport();
        viewport.on_drag_start(DVec2::new(10.0, 10.0));
        viewport.set_desired_center(DVec2::new(50.0, 0.0));
        assert!(!viewport.is_dragging());
        let center = viewport.center();
        viewport.on_drag_move(DVec2::new(300.0, 300.0));
        assert_eq!(viewport.center(), center);
    }

    #[test]
    fn drag_moves_center_against_pointer() {
        let mut viewport = Viewport::new(DVec2::ZERO, 2.0).with_surface_size(DVec2::splat(100.0));
        viewport.on_drag_start(DVec2::new(50.0, 50.0));
        viewport.on_drag_move(DVec2::new(70.0, 40.0));
        assert_eq!(viewport.center(), DVec2::new(-10.0, 5.0));
        assert!(viewport.did_move_since_touch_start());
        assert_eq!(
            viewport.drain_interactions().collect::<Vec<_>>(),
            vec![UserInteraction::Move]
        );
    }

    #[test]
    fn drag_release_carries_inertia() {
        let mut viewport = viewport();
        viewport.on_drag_start(DVec2::new(400.0, 300.0));
        viewport.on_drag_move(DVec2::new(380.0, 300.0));
        viewport.on_drag_move(DVec2::new(360.0, 300.0));
        assert_eq!(viewport.inertia(), DVec2::new(15.0, 0.0));
        viewport.on_drag_end(DVec2::new(360.0, 300.0));

        let released_at = viewport.center();
        viewport.update(16.0, &NO_KEYS);
        assert!(viewport.center().x > released_at.x);
        assert!(viewport.inertia().length() < 15.0);

        settle(&mut viewport, &NO_KEYS, 2000);
        assert_eq!(viewport.inertia(), DVec2::ZERO);
    }

    #[test]
    fn inertia_is_capped() {
        let mut viewport = viewport().with_zoom_limits(ZoomLimits::new(StaticCapabilities {
            min_zoom: 0.01,
            max_zoom: 10.0,
            touch_pan_strength: 1.0,
        }));
        viewport.set_zoom_level(0.01);
        viewport.on_drag_start(DVec2::ZERO);
        viewport.on_drag_move(DVec2::new(-400.0, 0.0));
        viewport.on_drag_end(DVec2::new(-400.0, 0.0));

        let before = viewport.center();
        viewport.update(PHYSICS_STEP_MS, &NO_KEYS);
        assert_close(viewport.center().x - before.x, 20.0, 1e-9);
    }

    #[test]
    fn holding_still_drops_inertia() {
        let mut viewport = viewport();
        viewport.on_drag_start(DVec2::new(400.0, 300.0));
        viewport.on_drag_move(DVec2::new(300.0, 300.0));
        viewport.update(MAX_FRAME_MS, &NO_KEYS);
        viewport.update(MAX_FRAME_MS, &NO_KEYS);
        viewport.update(MAX_FRAME_MS, &NO_KEYS);
        assert_eq!(viewport.inertia(), DVec2::ZERO);
        viewport.on_drag_end(DVec2::new(300.0, 300.0));
        let center = viewport.center();
        viewport.update(16.0, &NO_KEYS);
        assert_eq!(viewport.center(), center);
    }

    #[test]
    fn pinch_halves_zoom_around_midpoint() {
        let mut viewport = viewport();
        let midpoint = DVec2::new(200.0, 300.0);
        let world_before = viewport.screen_to_world(midpoint);

        viewport.on_pinch_start([DVec2::new(100.0, 300.0), DVec2::new(300.0, 300.0)]);
        viewport.on_pinch_move([DVec2::new(150.0, 300.0), DVec2::new(250.0, 300.0)]);

        assert_close(viewport.zoom_level(), 0.5, 1e-12);
        let screen_after = viewport.world_to_screen(world_before);
        assert!((screen_after - midpoint).length() < 1e-9);
    }

    #[test]
    fn zero_distance_pinch_stays_finite() {
        let mut viewport = viewport();
        let p = DVec2::new(320.0, 200.0);
        viewport.on_pinch_start([p, p]);
        viewport.on_pinch_move([p, DVec2::new(330.0, 200.0)]);
        assert!(viewport.zoom_level().is_finite());
        assert!(viewport.center().is_finite());
        viewport.on_pinch_move([p, p]);
        viewport.on_pinch_move([p, p]);
        assert!(viewport.zoom_level().is_finite());
        assert!(viewport.zoom_limits.contains(viewport.zoom_level()));
        assert!(viewport.center().is_finite());
    }

    #[test]
    fn zero_distance_pinch_without_limits_is_rejected() {
        let mut limits = ZoomLimits::default();
        limits.disabled = true;
        let mut viewport = viewport().with_zoom_limits(limits);
        viewport.on_pinch_start([DVec2::new(0.0, 0.0), DVec2::new(10.0, 0.0)]);
        viewport.on_pinch_move([DVec2::new(5.0, 0.0), DVec2::new(5.0, 0.0)]);
        assert_eq!(viewport.zoom_level(), 1.0);
        assert!(viewport.center().is_finite());
    }

    #[test]
    fn pinch_cancels_zoom_animation() {
        let mut viewport = viewport();
        viewport.request_zoom(3.0);
        viewport.on_pinch_start([DVec2::new(0.0, 0.0), DVec2::new(100.0, 0.0)]);
        assert_eq!(viewport.desired_zoom(), None);
    }

    #[test]
    fn keyboard_moves_only_when_free() {
        let right = HeldKeys {
            right: true,
            ..Default::default()
        };
        let mut viewport = viewport();
        viewport.update(PHYSICS_STEP_MS, &right);
        assert_eq!(viewport.keyboard_force(), DVec2::X);
        let expected = 600.0 / 2048.0 * PHYSICS_STEP_MS;
        assert_close(viewport.center().x, expected, 1e-9);

        let fast = HeldKeys { fast: true, ..right };
        let before = viewport.center().x;
        viewport.update(PHYSICS_STEP_MS, &fast);
        assert_close(viewport.center().x - before, expected * 4.0, 1e-9);

        viewport.on_drag_start(DVec2::ZERO);
        let before = viewport.center();
        viewport.update(PHYSICS_STEP_MS, &right);
        assert_eq!(viewport.center(), before);
        assert_eq!(viewport.keyboard_force(), DVec2::ZERO);
    }

    #[test]
    fn keyboard_is_ignored_during_fly_to() {
        let up = HeldKeys {
            up: true,
            ..Default::default()
        };
        let mut viewport = viewport();
        viewport.set_desired_center(DVec2::new(100.0, 0.0));
        viewport.update(16.0, &up);
        assert_eq!(viewport.center().y, 0.0);
    }

    #[test]
    fn pan_blends_towards_desired_velocity() {
        let mut viewport = viewport();
        viewport.set_pan(DVec2::new(1.0, 0.0));
        viewport.update(PHYSICS_STEP_MS, &NO_KEYS);
        assert_close(viewport.current_pan().x, 0.06, 1e-12);
        assert_close(viewport.center().x, 0.06 * PHYSICS_STEP_MS, 1e-12);

        settle(&mut viewport, &NO_KEYS, 200);
        assert_close(viewport.current_pan().x, 1.0, 1e-3);

        viewport.set_pan(DVec2::ZERO);
        settle(&mut viewport, &NO_KEYS, 400);
        assert_eq!(viewport.current_pan(), DVec2::ZERO);
    }

    #[test]
    fn shake_decays_and_only_offsets_the_view() {
        let mut viewport = viewport();
        let mut rng = StdRng::seed_from_u64(7);
        viewport.add_screen_shake_with(&mut rng, 5.0);
        assert_ne!(viewport.shake(), DVec2::ZERO);
        assert_eq!(viewport.center(), DVec2::ZERO);

        let shaken = viewport.shake().length();
        viewport.update(PHYSICS_STEP_MS, &NO_KEYS);
        assert_close(viewport.shake().length(), shaken * 0.92, 1e-9);

        settle(&mut viewport, &NO_KEYS, 500);
        assert_eq!(viewport.shake(), DVec2::ZERO);
        assert_eq!(viewport.center(), DVec2::ZERO);
    }

    #[test]
    fn wheel_zoom_keeps_cursor_point_fixed() {
        let mut viewport = viewport();
        let cursor = DVec2::new(100.0, 450.0);
        let world = viewport.screen_to_world(cursor);
        viewport.on_wheel(1.0, Some(cursor));
        assert_close(viewport.zoom_level(), 1.15, 1e-12);
        assert!((viewport.world_to_screen(world) - cursor).length() < 1e-9);

        viewport.settings.zoom_to_cursor = false;
        let center = viewport.center();
        viewport.on_wheel(-1.0, Some(cursor));
        assert_close(viewport.zoom_level(), 1.0, 1e-12);
        assert_eq!(viewport.center(), center);
    }

    #[test]
    fn keyboard_zoom_requests_compound() {
        let mut viewport = viewport();
        viewport.zoom_in();
        viewport.zoom_in();
        assert_close(viewport.desired_zoom().unwrap(), 1.44, 1e-12);
        viewport.zoom_out();
        assert_close(viewport.desired_zoom().unwrap(), 1.2, 1e-12);
    }

    #[test]
    fn edge_pan_moves_towards_pointer_edge() {
        let mut viewport = viewport();
        viewport.on_hover(DVec2::new(799.0, 300.0));
        viewport.update(16.0, &NO_KEYS);
        assert_eq!(viewport.center(), DVec2::ZERO);

        viewport.settings.edge_pan = true;
        viewport.update(16.0, &NO_KEYS);
        assert!(viewport.center().x > 0.0);
        assert_eq!(viewport.center().y, 0.0);
    }

    #[test]
    fn bounds_contain_every_motion() {
        let bounds = WorldRect::from_corners(DVec2::splat(-50.0), DVec2::splat(50.0));
        let mut viewport = viewport().with_settings(NavigationSettings {
            bounds: Some(bounds),
            ..Default::default()
        });
        viewport.set_desired_center(DVec2::new(1000.0, 0.0));
        assert_eq!(viewport.desired_center(), Some(DVec2::new(50.0, 0.0)));
        settle(&mut viewport, &NO_KEYS, 500);
        assert!(bounds.contains(viewport.center()));

        viewport.on_drag_start(DVec2::ZERO);
        viewport.on_drag_move(DVec2::new(-5000.0, -5000.0));
        assert_eq!(viewport.center(), DVec2::splat(50.0));
    }

    #[test]
    fn non_finite_requests_are_rejected() {
        let mut viewport = viewport();
        viewport.set_desired_center(DVec2::new(f64::NAN, 0.0));
        viewport.request_zoom(f64::INFINITY);
        viewport.request_zoom(-1.0);
        viewport.set_pan(DVec2::new(0.0, f64::NAN));
        viewport.on_drag_start(DVec2::ZERO);
        viewport.on_drag_move(DVec2::new(f64::NAN, 1.0));
        viewport.on_wheel(f64::NAN, None);
        viewport.update(f64::NAN, &NO_KEYS);

        assert_eq!(viewport.desired_center(), None);
        assert_eq!(viewport.desired_zoom(), None);
        assert_eq!(viewport.desired_pan(), DVec2::ZERO);
        assert_eq!(viewport.center(), DVec2::ZERO);
        assert_eq!(viewport.zoom_level(), 1.0);
    }

    #[test]
    fn snapshot_restores_zoom_and_center_only() {
        let mut viewport = viewport();
        viewport.set_center(DVec2::new(12.0, -3.0));
        viewport.set_zoom_level(2.5);
        let snapshot = viewport.snapshot();

        let mut restored = Viewport::default();
        restored.request_zoom(4.0);
        restored.restore(&snapshot).unwrap();
        assert_eq!(restored.center(), DVec2::new(12.0, -3.0));
        assert_eq!(restored.zoom_level(), 2.5);
        assert_eq!(restored.desired_zoom(), None);

        let broken = ViewportSnapshot::new(f64::NAN, DVec2::ZERO);
        assert!(restored.restore(&broken).is_err());
        assert_eq!(restored.zoom_level(), 2.5);
    }

    #[test]
    fn restore_clamps_out_of_range_zoom() {
        let mut viewport = viewport();
        viewport
            .restore(&ViewportSnapshot::new(500.0, DVec2::ZERO))
            .unwrap();
        assert_eq!(
            viewport.zoom_level(),
            StaticCapabilities::default().maximum_zoom()
        );
    }

    #[test]
    fn pinch_release_carries_inertia() {
        let mut viewport = viewport();
        viewport.on_pinch_start([DVec2::new(100.0, 300.0), DVec2::new(300.0, 300.0)]);
        viewport.on_pinch_move([DVec2::new(80.0, 300.0), DVec2::new(280.0, 300.0)]);
        viewport.on_pinch_move([DVec2::new(60.0, 300.0), DVec2::new(260.0, 300.0)]);
        assert_eq!(viewport.inertia(), DVec2::new(15.0, 0.0));
        assert_close(viewport.zoom_level(), 1.0, 1e-12);
        viewport.on_pinch_end();

        let released_at = viewport.center();
        viewport.update(16.0, &NO_KEYS);
        assert!(viewport.center().x > released_at.x);
        assert_eq!(viewport.center().y, released_at.y);
    }

    #[test]
    fn held_pinch_drops_inertia() {
        let mut viewport = viewport();
        let fingers = [DVec2::new(100.0, 300.0), DVec2::new(300.0, 300.0)];
        viewport.on_pinch_start(fingers);
        viewport.on_pinch_move(fingers.map(|p| p - DVec2::new(40.0, 0.0)));
        for _ in 0..3 {
            viewport.update(MAX_FRAME_MS, &NO_KEYS);
        }
        assert_eq!(viewport.inertia(), DVec2::ZERO);
    }

    #[test]
    fn inertia_holds_while_dragging() {
        let mut viewport = viewport();
        viewport.on_drag_start(DVec2::new(400.0, 300.0));
        viewport.on_drag_move(DVec2::new(380.0, 300.0));
        assert_eq!(viewport.inertia(), DVec2::new(10.0, 0.0));

        viewport.update(16.0, &NO_KEYS);
        assert_eq!(viewport.inertia(), DVec2::new(10.0, 0.0));
    }

    mod systems {
        use bevy_app::prelude::*;
        use bevy_render::camera::OrthographicProjection;
        use bevy_window::WindowResolution;

        use super::*;
        use crate::controller::ViewportControllerPlugin;

        fn app() -> App {
            let mut app = App::new();
            app.add_plugins(ViewportControllerPlugin)
                .init_resource::<Time>();
            app
        }

        fn orthographic() -> Projection {
            Projection::Orthographic(OrthographicProjection::default_2d())
        }

        #[test]
        fn camera_transform_mirrors_y_and_scales_by_zoom() {
            let mut app = app();
            let camera = app
                .world_mut()
                .spawn((
                    Viewport::new(DVec2::new(30.0, 40.0), 2.0)
                        .with_surface_size(DVec2::new(800.0, 600.0)),
                    Transform::default(),
                    orthographic(),
                ))
                .id();
            app.update();

            let world = app.world();
            let transform = world.get::<Transform>(camera).unwrap();
            assert_eq!(transform.translation.x, 30.0);
            assert_eq!(transform.translation.y, -40.0);
            match world.get::<Projection>(camera).unwrap() {
                Projection::Orthographic(ortho) => assert_eq!(ortho.scale, 0.5),
                other => panic!("unexpected projection {other:?}"),
            }
        }

        #[test]
        fn primary_window_size_reaches_viewport() {
            let mut app = app();
            app.world_mut().spawn((
                Window {
                    resolution: WindowResolution::new(640.0, 480.0),
                    ..Default::default()
                },
                PrimaryWindow,
            ));
            let camera = app.world_mut().spawn(Viewport::default()).id();
            app.update();

            let viewport = app.world().get::<Viewport>(camera).unwrap();
            assert_eq!(viewport.surface_size(), DVec2::new(640.0, 480.0));
        }

        #[test]
        fn cameras_without_projection_still_move() {
            let mut app = app();
            let camera = app
                .world_mut()
                .spawn((Viewport::new(DVec2::new(-5.0, 7.0), 1.0), Transform::default()))
                .id();
            app.update();
            let transform = app.world().get::<Transform>(camera).unwrap();
            assert_eq!(transform.translation.truncate(), bevy_math::Vec2::new(-5.0, -7.0));
        }
    }
}
