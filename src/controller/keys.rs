//! Keyboard navigation: the held-key query used by the controller every step, and the default
//! bindings used by the Bevy integration.

use bevy_ecs::prelude::*;
use bevy_input::{keyboard::KeyCode, ButtonInput};
use bevy_math::DVec2;
use bevy_reflect::prelude::*;

/// One of the four keyboard movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum MoveDirection {
    Up,
    Down,
    Left,
    Right,
}

impl MoveDirection {
    pub const ALL: [MoveDirection; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Direction in screen space, y pointing down.
    pub fn vector(self) -> DVec2 {
        match self {
            Self::Up => DVec2::NEG_Y,
            Self::Down => DVec2::Y,
            Self::Left => DVec2::NEG_X,
            Self::Right => DVec2::X,
        }
    }
}

/// Answers "is this movement binding currently held?". Queried once per simulation step.
pub trait MovementKeys {
    fn is_held(&self, direction: MoveDirection) -> bool;

    /// Is the "move faster" modifier held?
    fn is_fast(&self) -> bool {
        false
    }

    /// The unit vector of all held directions, or zero when nothing is held or held directions
    /// cancel out.
    fn force(&self) -> DVec2 {
        MoveDirection::ALL
            .into_iter()
            .filter(|direction| self.is_held(*direction))
            .map(MoveDirection::vector)
            .sum::<DVec2>()
            .normalize_or_zero()
    }
}

/// A plain snapshot of held movement keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub struct HeldKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub fast: bool,
}

impl MovementKeys for HeldKeys {
    fn is_held(&self, direction: MoveDirection) -> bool {
        match direction {
            MoveDirection::Up => self.up,
            MoveDirection::Down => self.down,
            MoveDirection::Left => self.left,
            MoveDirection::Right => self.right,
        }
    }

    fn is_fast(&self) -> bool {
        self.fast
    }
}

/// Keys bound to camera navigation. Any key in a list triggers its action.
#[derive(Debug, Clone, Resource, Reflect)]
pub struct KeyBindings {
    pub up: Vec<KeyCode>,
    pub down: Vec<KeyCode>,
    pub left: Vec<KeyCode>,
    pub right: Vec<KeyCode>,
    /// Multiplies keyboard movement while held.
    pub faster: Vec<KeyCode>,
    /// Starts a zoom animation towards a closer zoom.
    pub zoom_in: Vec<KeyCode>,
    /// Starts a zoom animation towards a farther zoom.
    pub zoom_out: Vec<KeyCode>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            up: vec![KeyCode::KeyW, KeyCode::ArrowUp],
            down: vec![KeyCode::KeyS, KeyCode::ArrowDown],
            left: vec![KeyCode::KeyA, KeyCode::ArrowLeft],
            right: vec![KeyCode::KeyD, KeyCode::ArrowRight],
            faster: vec![KeyCode::ShiftLeft, KeyCode::ShiftRight],
            zoom_in: vec![KeyCode::Equal, KeyCode::NumpadAdd],
            zoom_out: vec![KeyCode::Minus, KeyCode::NumpadSubtract],
        }
    }
}

impl KeyBindings {
    fn keys(&self, direction: MoveDirection) -> &[KeyCode] {
        match direction {
            MoveDirection::Up => &self.up,
            MoveDirection::Down => &self.down,
            MoveDirection::Left => &self.left,
            MoveDirection::Right => &self.right,
        }
    }
}

/// [`KeyBindings`] resolved against Bevy's keyboard state.
#[derive(Debug, Clone, Copy)]
pub struct BoundKeys<'a> {
    pub bindings: &'a KeyBindings,
    pub input: &'a ButtonInput<KeyCode>,
}

impl MovementKeys for BoundKeys<'_> {
    fn is_held(&self, direction: MoveDirection) -> bool {
        self.input
            .any_pressed(self.bindings.keys(direction).iter().copied())
    }

    fn is_fast(&self) -> bool {
        self.input.any_pressed(self.bindings.faster.iter().copied())
    }
}
