//! The 2D camera controller: the [`Viewport`](component::Viewport) component and the pieces it is
//! built from.

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bevy_transform::TransformSystem;

pub mod component;
pub mod integrator;
pub mod keys;
pub mod momentum;
pub mod motion;
pub mod projection;
pub mod snapshot;
pub mod zoom;

/// Advances every [`Viewport`](component::Viewport) once per frame and writes the result into the
/// camera's transform and projection. Does not read any input on its own; see
/// [`ViewportInputPlugin`](crate::input::ViewportInputPlugin).
pub struct ViewportControllerPlugin;

impl Plugin for ViewportControllerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<keys::KeyBindings>()
            .add_systems(
                PostUpdate,
                (
                    component::Viewport::update_viewports,
                    component::Viewport::sync_camera_transforms,
                )
                    .chain()
                    .before(TransformSystem::TransformPropagate),
            )
            .register_type::<component::NavigationSettings>()
            .register_type::<momentum::MotionTuning>()
            .register_type::<keys::KeyBindings>()
            .register_type::<projection::WorldRect>()
            .register_type::<zoom::StaticCapabilities>();
    }
}
