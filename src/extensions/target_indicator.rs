//! A `bevy_viewport_cam` extension that draws where the camera is flying to while a fly-to
//! animation runs, so users can see why the view is moving on its own.

use bevy_app::prelude::*;
use bevy_color::{Alpha, Color};
use bevy_ecs::prelude::*;
use bevy_gizmos::prelude::*;
use bevy_math::{DVec2, Isometry2d, Vec2};
use bevy_reflect::prelude::*;

use crate::prelude::*;

/// See the [module](self) docs.
pub struct TargetIndicatorPlugin;

impl Plugin for TargetIndicatorPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            PostUpdate,
            draw_target.after(Viewport::sync_camera_transforms),
        )
        .register_type::<TargetIndicator>();
    }
}

/// Optional. Configures whether a [`Viewport`] shows its fly-to target. The indicator is enabled
/// if this component is not present.
#[derive(Debug, Component, Reflect)]
pub struct TargetIndicator {
    /// Should the indicator be visible on this camera?
    pub enabled: bool,
    /// Marker radius in screen pixels.
    pub radius: f32,
}

impl Default for TargetIndicator {
    fn default() -> Self {
        Self {
            enabled: true,
            radius: 12.0,
        }
    }
}

/// World space is y-down, Bevy's is y-up.
fn to_bevy(world: DVec2) -> Vec2 {
    Vec2::new(world.x as f32, -world.y as f32)
}

/// Use gizmos to draw the fly-to target and the path to it in world space.
pub fn draw_target(cameras: Query<(&Viewport, Option<&TargetIndicator>)>, mut gizmos: Gizmos) {
    let default_indicator = TargetIndicator::default();
    for (viewport, indicator) in cameras.iter() {
        let indicator = indicator.unwrap_or(&default_indicator);
        if !indicator.enabled {
            continue;
        }
        let Some(target) = viewport.desired_center() else {
            continue;
        };

        let color = Color::srgba(1.0, 1.0, 1.0, 0.8);
        let pixel = viewport.zoom_level().recip() as f32;
        let target_bevy = to_bevy(target);

        gizmos.circle_2d(
            Isometry2d::from_translation(target_bevy),
            indicator.radius * pixel,
            color,
        );
        // Arrival tolerance: the animation ends once the center is this close.
        gizmos.circle_2d(Isometry2d::from_translation(target_bevy), pixel, color);
        gizmos.line_2d(to_bevy(viewport.center()), target_bevy, color.with_alpha(0.3));
    }
}
