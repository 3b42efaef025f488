//! A smooth 2D camera for top-down games and map views, built for Bevy.
//!
//! ## Controls
//!
//! - Drag with the mouse or one finger to pan. Releasing a drag lets the view glide to a stop.
//! - Pinch with two fingers to zoom about the pinch midpoint.
//! - Scroll to zoom towards the cursor.
//! - WASD or the arrow keys pan, Shift pans faster, `+` and `-` zoom.
//!
//! ## Usage
//!
//! 1. Add the [`DefaultViewportCamPlugins`] plugin group.
//! 2. Add the [`Viewport`](controller::component::Viewport) component to a 2D camera.
//!
//! Game logic can move the camera with [`ViewportRequest`](extensions::requests::ViewportRequest)
//! events, or by calling methods on the component directly.
//!
//! ## Coordinates
//!
//! World and screen space both have y pointing down, in logical pixels for the screen. The
//! controller mirrors y when writing the Bevy [`Transform`](bevy_transform::components::Transform).
//!
//! ## Motion
//!
//! All motion is advanced at a fixed 240 Hz, independent of the frame rate. Every animation is an
//! exponential blend towards a target, and the user always wins: starting a drag cancels a running
//! fly-to animation, and a pinch cancels a running zoom animation.

use bevy_app::{PluginGroup, PluginGroupBuilder};

pub mod controller;
pub mod extensions;
pub mod input;

/// Common imports.
pub mod prelude {
    pub use crate::{
        controller::{
            component::{NavigationSettings, Viewport},
            keys::{HeldKeys, KeyBindings, MovementKeys},
            momentum::MotionTuning,
            motion::{Gesture, UserInteraction},
            projection::{RenderTransform, WorldRect},
            snapshot::{SnapshotError, ViewportSnapshot},
            zoom::{PlatformCapabilities, StaticCapabilities, ZoomLimits},
        },
        extensions::requests::ViewportRequest,
        input::{Capture, GestureHooks, GestureSink, ViewportInput, ViewportInteraction},
        DefaultViewportCamPlugins,
    };
}

/// Adds input, the controller, and the default extensions.
pub struct DefaultViewportCamPlugins;

impl PluginGroup for DefaultViewportCamPlugins {
    fn build(self) -> PluginGroupBuilder {
        let group = PluginGroupBuilder::start::<Self>()
            .add(input::ViewportInputPlugin)
            .add(controller::ViewportControllerPlugin)
            .add(extensions::requests::RequestsPlugin);

        #[cfg(feature = "extension_target_indicator")]
        let group = group.add(extensions::target_indicator::TargetIndicatorPlugin);

        group
    }
}
