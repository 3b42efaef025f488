//! Turns raw mouse, wheel and touch events into canonical drag and pinch gestures.
//!
//! Each camera owns its own [`ViewportInput`], so several viewports can listen at once and all
//! listener state is dropped with the camera entity.

use std::{fmt, sync::Arc, time::Duration};

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bevy_input::{
    keyboard::KeyCode,
    mouse::{MouseButton, MouseScrollUnit},
    touch::TouchPhase,
    ButtonInput, ButtonState, InputSystem,
};
use bevy_log::prelude::*;
use bevy_math::DVec2;
use bevy_reflect::prelude::*;
use bevy_time::{prelude::*, Real};
use bevy_window::{PrimaryWindow, Window, WindowEvent};

use crate::controller::{component::Viewport, keys::KeyBindings, motion::UserInteraction};

/// Mouse events arriving this soon after a touch event are assumed to be emulated by the browser
/// or OS from that touch, and are dropped.
pub const DEFAULT_MOUSE_GUARD: Duration = Duration::from_millis(1000);

/// Pixel scroll deltas are divided by this to get wheel notches.
const PIXELS_PER_WHEEL_NOTCH: f64 = 100.0;

/// Adds per-camera gesture recognition. See the [module](self) docs.
pub struct ViewportInputPlugin;

impl Plugin for ViewportInputPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ViewportInteraction>()
            .add_event::<WindowEvent>()
            .init_resource::<KeyBindings>()
            .add_systems(PreUpdate, ViewportInput::receive.after(InputSystem))
            .register_type::<PointerButton>();
    }
}

/// Which pointer button a press came from. Touches always count as [`PointerButton::Primary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum PointerButton {
    /// Left mouse button, or a touch.
    Primary,
    /// Right mouse button.
    Secondary,
    /// Middle mouse button.
    Middle,
    /// Any other button.
    Other,
}

impl From<MouseButton> for PointerButton {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => Self::Primary,
            MouseButton::Right => Self::Secondary,
            MouseButton::Middle => Self::Middle,
            _ => Self::Other,
        }
    }
}

/// A device event in screen space, logical pixels, y pointing down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawInput {
    MouseDown { position: DVec2, button: PointerButton },
    MouseUp { position: DVec2, button: PointerButton },
    MouseMove { position: DVec2 },
    /// Positive amounts zoom in. One notch is `1.0`.
    Wheel {
        amount: f64,
        position: Option<DVec2>,
    },
    TouchStart { id: u64, position: DVec2 },
    TouchMove { id: u64, position: DVec2 },
    TouchEnd { id: u64, position: DVec2 },
    TouchCancel { id: u64 },
}

/// Returned by a pre-handler hook to let an event through or take it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Capture {
    /// Let the camera handle the event.
    #[default]
    Pass,
    /// Take the event away from the camera.
    Stop,
}

/// Receives canonical gestures from a [`ViewportInput`].
///
/// A drag that started always ends with exactly one [`GestureSink::on_drag_end`] or, if a second
/// finger turned it into a pinch, one [`GestureSink::on_pinch_end`].
pub trait GestureSink {
    /// A primary press or first finger started dragging at `position`.
    fn on_drag_start(&mut self, position: DVec2);
    /// The dragging pointer moved to `position`.
    fn on_drag_move(&mut self, position: DVec2);
    /// The drag was released or cancelled at `position`.
    fn on_drag_end(&mut self, position: DVec2);
    /// A second finger came down, turning the touch into a pinch.
    fn on_pinch_start(&mut self, positions: [DVec2; 2]);
    /// Either pinching finger moved.
    fn on_pinch_move(&mut self, positions: [DVec2; 2]);
    /// A pinching finger was lifted.
    fn on_pinch_end(&mut self);

    /// Wheel scrolled by `amount` notches at `position`.
    fn on_wheel(&mut self, _amount: f64, _position: Option<DVec2>) {}

    /// The mouse moved, pressed or not.
    fn on_hover(&mut self, _position: DVec2) {}
}

type DownHook = Arc<dyn Fn(DVec2, PointerButton) -> Capture + Send + Sync>;
type MoveHook = Arc<dyn Fn(DVec2) -> Capture + Send + Sync>;
type UpHook = Arc<dyn Fn(DVec2) + Send + Sync>;

/// Callbacks that let other UI see pointer events before the camera does.
///
/// Returning [`Capture::Stop`] from the down hook claims the whole gesture: the camera sees no
/// start, move or end for it, while the up hook still fires when it is released. This is how a
/// click on a building is told apart from a drag of the map.
#[derive(Clone, Default)]
pub struct GestureHooks {
    down_pre: Option<DownHook>,
    move_pre: Option<MoveHook>,
    up_post: Option<UpHook>,
}

impl fmt::Debug for GestureHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GestureHooks")
            .field("down_pre", &self.down_pre.is_some())
            .field("move_pre", &self.move_pre.is_some())
            .field("up_post", &self.up_post.is_some())
            .finish()
    }
}

impl GestureHooks {
    /// Called on every press before the camera sees it.
    pub fn with_down_pre(
        mut self,
        hook: impl Fn(DVec2, PointerButton) -> Capture + Send + Sync + 'static,
    ) -> Self {
        self.down_pre = Some(Arc::new(hook));
        self
    }

    /// Called on every pointer move before the camera sees it.
    pub fn with_move_pre(mut self, hook: impl Fn(DVec2) -> Capture + Send + Sync + 'static) -> Self {
        self.move_pre = Some(Arc::new(hook));
        self
    }

    /// Called after a gesture is released, claimed or not.
    pub fn with_up_post(mut self, hook: impl Fn(DVec2) + Send + Sync + 'static) -> Self {
        self.up_post = Some(Arc::new(hook));
        self
    }

    fn down(&self, position: DVec2, button: PointerButton) -> Capture {
        self.down_pre
            .as_ref()
            .map_or(Capture::Pass, |hook| hook(position, button))
    }

    fn moved(&self, position: DVec2) -> Capture {
        self.move_pre
            .as_ref()
            .map_or(Capture::Pass, |hook| hook(position))
    }

    fn up(&self, position: DVec2) {
        if let Some(hook) = &self.up_post {
            hook(position);
        }
    }
}

/// The gesture a [`ViewportInput`] is currently forwarding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActiveGesture {
    #[default]
    Idle,
    MouseDrag,
    TouchDrag {
        id: u64,
    },
    Pinch {
        ids: [u64; 2],
    },
    /// A down hook took the gesture. Nothing is forwarded until it is released.
    Claimed,
    /// A pinch lost a finger. Remaining fingers are ignored until all are lifted.
    Draining,
}

/// Sent whenever the user moves a viewport or releases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Event)]
pub struct ViewportInteraction {
    /// The camera entity holding the [`Viewport`].
    pub camera: Entity,
    /// What the user did.
    pub kind: UserInteraction,
}

/// Per-camera gesture recognizer. Added automatically alongside a
/// [`Viewport`](crate::controller::component::Viewport).
#[derive(Debug, Clone, Component)]
pub struct ViewportInput {
    /// When false, this camera ignores all input.
    pub enabled: bool,
    /// How long mouse events are dropped after a touch event.
    pub mouse_guard: Duration,
    /// See [`GestureHooks`].
    pub hooks: GestureHooks,
    touches: Vec<(u64, DVec2)>,
    active: ActiveGesture,
    last_touch_at: Option<Duration>,
    last_position: DVec2,
}

impl Default for ViewportInput {
    fn default() -> Self {
        Self {
            enabled: true,
            mouse_guard: DEFAULT_MOUSE_GUARD,
            hooks: GestureHooks::default(),
            touches: Vec::new(),
            active: ActiveGesture::Idle,
            last_touch_at: None,
            last_position: DVec2::ZERO,
        }
    }
}

impl ViewportInput {
    /// Replace the pre and post handler hooks.
    pub fn with_hooks(mut self, hooks: GestureHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// The gesture currently being forwarded.
    pub fn active(&self) -> ActiveGesture {
        self.active
    }

    /// Number of fingers currently down.
    pub fn touch_count(&self) -> usize {
        self.touches.len()
    }

    fn is_guarded(&self, now: Duration) -> bool {
        self.last_touch_at
            .is_some_and(|touched| now.saturating_sub(touched) < self.mouse_guard)
    }

    /// Mouse events right after a touch are dropped, except the release that ends a real mouse
    /// drag.
    fn is_emulated_mouse(&self, input: &RawInput, now: Duration) -> bool {
        match input {
            RawInput::MouseUp { .. } if self.active == ActiveGesture::MouseDrag => false,
            RawInput::MouseDown { .. } | RawInput::MouseUp { .. } | RawInput::MouseMove { .. } => {
                self.is_guarded(now)
            }
            _ => false,
        }
    }

    fn touch_position(&self, id: u64) -> Option<DVec2> {
        self.touches
            .iter()
            .find(|(touch, _)| *touch == id)
            .map(|(_, position)| *position)
    }

    fn pinch_positions(&self, ids: [u64; 2]) -> Option<[DVec2; 2]> {
        Some([self.touch_position(ids[0])?, self.touch_position(ids[1])?])
    }

    /// Feed one device event observed at monotonic time `now`.
    pub fn handle(&mut self, input: RawInput, now: Duration, sink: &mut impl GestureSink) {
        match input {
            _ if self.is_emulated_mouse(&input, now) => {
                debug!("Dropping mouse event emulated from touch: {input:?}");
            }
            RawInput::MouseDown { position, button } => self.mouse_down(position, button, sink),
            RawInput::MouseUp { position, button } => self.mouse_up(position, button, sink),
            RawInput::MouseMove { position } => {
                if self.hooks.moved(position) == Capture::Stop {
                    return;
                }
                sink.on_hover(position);
                if self.active == ActiveGesture::MouseDrag {
                    self.last_position = position;
                    sink.on_drag_move(position);
                }
            }
            RawInput::Wheel { amount, position } => sink.on_wheel(amount, position),
            RawInput::TouchStart { id, position } => {
                self.last_touch_at = Some(now);
                self.touch_start(id, position, sink);
            }
            RawInput::TouchMove { id, position } => {
                self.last_touch_at = Some(now);
                self.touch_move(id, position, sink);
            }
            RawInput::TouchEnd { id, position } => {
                self.last_touch_at = Some(now);
                self.touch_end(id, Some(position), sink);
            }
            RawInput::TouchCancel { id } => {
                self.last_touch_at = Some(now);
                self.touch_end(id, None, sink);
            }
        }
    }

    /// End any gesture in flight and forget all fingers. Used when the window loses focus, since
    /// the matching release events may never arrive.
    pub fn release(&mut self, sink: &mut impl GestureSink) {
        match self.active {
            ActiveGesture::MouseDrag | ActiveGesture::TouchDrag { .. } => {
                sink.on_drag_end(self.last_position);
                self.hooks.up(self.last_position);
            }
            ActiveGesture::Pinch { .. } => {
                sink.on_pinch_end();
                self.hooks.up(self.last_position);
            }
            ActiveGesture::Claimed => self.hooks.up(self.last_position),
            ActiveGesture::Idle | ActiveGesture::Draining => {}
        }
        self.active = ActiveGesture::Idle;
        self.touches.clear();
    }

    fn mouse_down(&mut self, position: DVec2, button: PointerButton, sink: &mut impl GestureSink) {
        let capture = self.hooks.down(position, button);
        if button != PointerButton::Primary || self.active != ActiveGesture::Idle {
            return;
        }
        self.last_position = position;
        if capture == Capture::Stop {
            self.active = ActiveGesture::Claimed;
            return;
        }
        self.active = ActiveGesture::MouseDrag;
        sink.on_drag_start(position);
    }

    fn mouse_up(&mut self, position: DVec2, button: PointerButton, sink: &mut impl GestureSink) {
        if button != PointerButton::Primary {
            return;
        }
        match self.active {
            ActiveGesture::MouseDrag => {
                self.active = ActiveGesture::Idle;
                sink.on_drag_end(position);
                self.hooks.up(position);
            }
            ActiveGesture::Claimed if self.touches.is_empty() => {
                self.active = ActiveGesture::Idle;
                self.hooks.up(position);
            }
            _ => debug!("Ignoring mouse release without a matching press"),
        }
    }

    fn touch_start(&mut self, id: u64, position: DVec2, sink: &mut impl GestureSink) {
        if self.touch_position(id).is_some() {
            warn!("Touch {id} started twice, ignoring");
            return;
        }
        self.touches.push((id, position));
        self.last_position = position;

        match self.active {
            ActiveGesture::Idle if self.touches.len() == 1 => {
                if self.hooks.down(position, PointerButton::Primary) == Capture::Stop {
                    self.active = ActiveGesture::Claimed;
                    return;
                }
                self.active = ActiveGesture::TouchDrag { id };
                sink.on_drag_start(position);
            }
            ActiveGesture::TouchDrag { id: first } => {
                let ids = [first, id];
                if let Some(positions) = self.pinch_positions(ids) {
                    self.active = ActiveGesture::Pinch { ids };
                    sink.on_pinch_start(positions);
                }
            }
            _ => {}
        }
    }

    fn touch_move(&mut self, id: u64, position: DVec2, sink: &mut impl GestureSink) {
        let Some(touch) = self.touches.iter_mut().find(|(touch, _)| *touch == id) else {
            debug!("Ignoring move of unknown touch {id}");
            return;
        };
        touch.1 = position;

        if self.hooks.moved(position) == Capture::Stop {
            return;
        }
        match self.active {
            ActiveGesture::TouchDrag { id: dragging } if dragging == id => {
                self.last_position = position;
                sink.on_drag_move(position);
            }
            ActiveGesture::Pinch { ids } if ids.contains(&id) => {
                if let Some(positions) = self.pinch_positions(ids) {
                    self.last_position = (positions[0] + positions[1]) / 2.0;
                    sink.on_pinch_move(positions);
                }
            }
            _ => {}
        }
    }

    fn touch_end(&mut self, id: u64, position: Option<DVec2>, sink: &mut impl GestureSink) {
        let Some(index) = self.touches.iter().position(|(touch, _)| *touch == id) else {
            warn!("Ignoring end of unknown touch {id}");
            return;
        };
        let (_, last_known) = self.touches.remove(index);
        let position = position.unwrap_or(last_known);

        match self.active {
            ActiveGesture::TouchDrag { id: dragging } if dragging == id => {
                self.active = ActiveGesture::Idle;
                sink.on_drag_end(position);
                self.hooks.up(position);
            }
            ActiveGesture::Pinch { ids } if ids.contains(&id) => {
                self.active = if self.touches.is_empty() {
                    ActiveGesture::Idle
                } else {
                    ActiveGesture::Draining
                };
                sink.on_pinch_end();
                self.hooks.up(position);
            }
            ActiveGesture::Claimed if self.touches.is_empty() => {
                self.active = ActiveGesture::Idle;
                self.hooks.up(position);
            }
            ActiveGesture::Draining if self.touches.is_empty() => {
                self.active = ActiveGesture::Idle;
            }
            _ => {}
        }
    }

    /// Read this frame's window events in arrival order, feed them to every enabled camera, and
    /// publish the resulting interactions.
    #[allow(clippy::too_many_arguments)]
    pub fn receive(
        mut cameras: Query<(Entity, &mut Viewport, &mut ViewportInput)>,
        windows: Query<&Window, With<PrimaryWindow>>,
        mut window_events: EventReader<WindowEvent>,
        mut last_cursor: Local<Option<DVec2>>,
        keyboard: Option<Res<ButtonInput<KeyCode>>>,
        bindings: Res<KeyBindings>,
        time: Res<Time<Real>>,
        mut interactions: EventWriter<ViewportInteraction>,
    ) {
        let events: Vec<WindowEvent> = window_events.read().cloned().collect();
        let cursor = (*last_cursor).or_else(|| {
            windows
                .iter()
                .next()
                .and_then(Window::cursor_position)
                .map(|position| position.as_dvec2())
        });

        let (zoom_in, zoom_out) = keyboard.as_deref().map_or((false, false), |input| {
            (
                input.any_just_pressed(bindings.zoom_in.iter().copied()),
                input.any_just_pressed(bindings.zoom_out.iter().copied()),
            )
        });

        let now = time.elapsed();
        for (camera, mut viewport, mut input) in cameras.iter_mut() {
            if !input.enabled {
                continue;
            }
            for event in frame_inputs(&events, cursor, input.last_position) {
                match event {
                    FrameInput::Raw(raw) => input.handle(raw, now, &mut *viewport),
                    FrameInput::FocusLost => input.release(&mut *viewport),
                }
            }
            if zoom_in {
                viewport.zoom_in();
            }
            if zoom_out {
                viewport.zoom_out();
            }
            interactions.write_batch(
                viewport
                    .drain_interactions()
                    .map(|kind| ViewportInteraction { camera, kind }),
            );
        }

        // The last known position survives the cursor leaving the window, so releases outside it
        // still land somewhere.
        if let Some(moved) = events.iter().rev().find_map(|event| match event {
            WindowEvent::CursorMoved(moved) => Some(moved.position.as_dvec2()),
            _ => None,
        }) {
            *last_cursor = Some(moved);
        } else if last_cursor.is_none() {
            *last_cursor = cursor;
        }
    }
}

/// A window event as one camera sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FrameInput {
    Raw(RawInput),
    FocusLost,
}

/// Convert one frame of window events to camera inputs, keeping their order. `cursor` is the
/// cursor position before the first event; button releases with no known cursor use `fallback`.
fn frame_inputs(
    events: &[WindowEvent],
    mut cursor: Option<DVec2>,
    fallback: DVec2,
) -> Vec<FrameInput> {
    let mut inputs = Vec::with_capacity(events.len());
    for event in events {
        let raw = match event {
            WindowEvent::CursorMoved(moved) => {
                let position = moved.position.as_dvec2();
                cursor = Some(position);
                RawInput::MouseMove { position }
            }
            WindowEvent::MouseButtonInput(press) => {
                let button = press.button.into();
                match (press.state, cursor) {
                    (ButtonState::Pressed, Some(position)) => RawInput::MouseDown { position, button },
                    (ButtonState::Pressed, None) => {
                        debug!("Ignoring mouse press with no known cursor position");
                        continue;
                    }
                    (ButtonState::Released, position) => RawInput::MouseUp {
                        position: position.unwrap_or(fallback),
                        button,
                    },
                }
            }
            WindowEvent::MouseWheel(wheel) => {
                let amount = match wheel.unit {
                    MouseScrollUnit::Line => wheel.y as f64,
                    MouseScrollUnit::Pixel => wheel.y as f64 / PIXELS_PER_WHEEL_NOTCH,
                };
                RawInput::Wheel {
                    amount,
                    position: cursor,
                }
            }
            WindowEvent::TouchInput(touch) => {
                let (id, position) = (touch.id, touch.position.as_dvec2());
                match touch.phase {
                    TouchPhase::Started => RawInput::TouchStart { id, position },
                    TouchPhase::Moved => RawInput::TouchMove { id, position },
                    TouchPhase::Ended => RawInput::TouchEnd { id, position },
                    TouchPhase::Canceled => RawInput::TouchCancel { id },
                }
            }
            WindowEvent::WindowFocused(focus) if !focus.focused => {
                inputs.push(FrameInput::FocusLost);
                continue;
            }
            _ => continue,
        };
        inputs.push(FrameInput::Raw(raw));
    }
    inputs
}
