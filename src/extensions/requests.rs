//! A `bevy_viewport_cam` extension that lets game and UI logic move cameras by sending events,
//! without querying for the [`Viewport`] component.

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bevy_log::prelude::*;
use bevy_math::DVec2;
use bevy_window::RequestRedraw;

use crate::prelude::*;

/// See the [module](self) docs.
pub struct RequestsPlugin;

impl Plugin for RequestsPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ViewportRequest>()
            .add_event::<RequestRedraw>()
            .add_systems(
                PostUpdate,
                (
                    ViewportRequest::receive.before(Viewport::update_viewports),
                    ViewportRequest::redraw_while_animating.after(Viewport::update_viewports),
                ),
            );
    }
}

/// What a [`ViewportRequest`] asks the camera to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportAction {
    /// Fly the center to this world point. See [`Viewport::set_desired_center`].
    FlyTo(DVec2),
    /// Animate to this zoom level. See [`Viewport::request_zoom`].
    ZoomTo(f64),
    /// Pan continuously at this velocity, zero to stop. See [`Viewport::set_pan`].
    Pan(DVec2),
    /// See [`Viewport::add_screen_shake`].
    Shake(f64),
    ZoomIn,
    ZoomOut,
    /// Stop every programmatic animation and any glide left over from a drag.
    Stop,
}

/// Send this event to move a camera. Requests are applied in `PostUpdate`, right before the
/// cameras advance, so requests sent anywhere in `Update` take effect the same frame.
#[derive(Debug, Clone, Copy, PartialEq, Event)]
pub struct ViewportRequest {
    /// The camera to move, or `None` for every camera.
    pub camera: Option<Entity>,
    pub action: ViewportAction,
}

impl ViewportRequest {
    /// A request for a single camera.
    pub fn new(camera: Entity, action: ViewportAction) -> Self {
        Self {
            camera: Some(camera),
            action,
        }
    }

    /// A request for every camera.
    pub fn all(action: ViewportAction) -> Self {
        Self {
            camera: None,
            action,
        }
    }

    fn apply(&self, viewport: &mut Viewport) {
        match self.action {
            ViewportAction::FlyTo(target) => viewport.set_desired_center(target),
            ViewportAction::ZoomTo(zoom) => viewport.request_zoom(zoom),
            ViewportAction::Pan(velocity) => viewport.set_pan(velocity),
            ViewportAction::Shake(amount) => viewport.add_screen_shake(amount),
            ViewportAction::ZoomIn => viewport.zoom_in(),
            ViewportAction::ZoomOut => viewport.zoom_out(),
            ViewportAction::Stop => viewport.stop_animations(),
        }
    }

    fn receive(
        mut requests: EventReader<Self>,
        mut cameras: Query<&mut Viewport>,
        mut redraw: EventWriter<RequestRedraw>,
    ) {
        for request in requests.read() {
            match request.camera {
                Some(camera) => {
                    let Ok(mut viewport) = cameras.get_mut(camera) else {
                        warn!("Dropping {request:?}: {camera} has no Viewport");
                        continue;
                    };
                    request.apply(&mut viewport);
                }
                None => cameras
                    .iter_mut()
                    .for_each(|mut viewport| request.apply(&mut viewport)),
            }
            redraw.write(RequestRedraw);
        }
    }

    /// Keep reactive window modes drawing frames until every camera has settled.
    fn redraw_while_animating(cameras: Query<&Viewport>, mut redraw: EventWriter<RequestRedraw>) {
        if cameras.iter().any(Viewport::is_animating) {
            redraw.write(RequestRedraw);
        }
    }
}
